//! Scene description: sources, array, analysis settings.
//!
//! A scene file is TOML. Every section is optional and falls back to the
//! reference scenario: one white-noise source 1 m above a 3x3 array,
//! one second at 22050 Hz, analysed with 128-sample Hanning blocks and a
//! functional beamformer in the 1/20-octave band around 5 kHz on a ±0.2 m
//! plane at z = 0.3 m.
//!
//! ```toml
//! geometry = "3x3"
//! sample_rate = 22050.0
//! num_samples = 22050
//!
//! [grid]
//! increment = 0.02
//!
//! [[sources]]
//! kind = "white_noise"
//! seed = 1
//! rms = 0.5
//! location = [0.0, 0.0, 1.0]
//! ```

use crate::geometry::resolve_geometry;
use crate::validation::{ValidationResult, validate_scene};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use sonomap_analysis::{
    BeamformerConfig, BeamformerKind, DEFAULT_GAMMA, SpectraConfig, SteeringFormulation, Window,
};
use sonomap_core::{
    AcousticConstants, ArrayGeometry, Error as CoreError, MultichannelTimeSeries, Point3, ScanGrid,
};
use sonomap_synth::{
    Interpolation, PointSource, PropagationConfig, PropagationModel, SignalGenerator,
    SineGenerator, WaveformGenerator, WhiteNoiseGenerator, render, resample,
};
use std::path::{Path, PathBuf};

fn default_seed() -> u32 {
    1
}

fn default_rms() -> f64 {
    0.5
}

fn default_amplitude() -> f64 {
    1.0
}

/// Signal emitted by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalConfig {
    /// Seeded Gaussian white noise.
    WhiteNoise {
        /// Generator seed.
        #[serde(default = "default_seed")]
        seed: u32,
        /// Target RMS.
        #[serde(default = "default_rms")]
        rms: f64,
    },
    /// Pure tone.
    Sine {
        /// Tone frequency in Hz.
        frequency: f64,
        /// Peak amplitude.
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        /// Initial phase in radians.
        #[serde(default)]
        phase: f64,
    },
    /// Waveform read from a WAV file, mixed down to mono.
    Wav {
        /// File path, relative to the scene file.
        path: PathBuf,
    },
}

/// A positioned source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Position `[x, y, z]` in metres.
    pub location: [f64; 3],
    /// Emitted signal.
    #[serde(flatten)]
    pub signal: SignalConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            location: [0.0, 0.0, 1.0],
            signal: SignalConfig::WhiteNoise {
                seed: default_seed(),
                rms: default_rms(),
            },
        }
    }
}

/// `[propagation]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationSection {
    /// Fractional-delay handling: `nearest` or `linear`.
    pub interpolation: Interpolation,
}

impl Default for PropagationSection {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::default(),
        }
    }
}

/// `[spectra]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectraSection {
    /// FFT block length.
    pub block_size: usize,
    /// Window function.
    pub window: Window,
    /// Block overlap fraction in `[0, 1)`.
    pub overlap: f64,
    /// First bin to estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_low: Option<usize>,
    /// One past the last bin to estimate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_high: Option<usize>,
}

impl Default for SpectraSection {
    fn default() -> Self {
        Self {
            block_size: 128,
            window: Window::Hann,
            overlap: 0.0,
            bin_low: None,
            bin_high: None,
        }
    }
}

/// `[grid]` section. `z_min`/`z_max` together select a volumetric grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Lower x bound in metres.
    pub x_min: f64,
    /// Upper x bound in metres.
    pub x_max: f64,
    /// Lower y bound in metres.
    pub y_min: f64,
    /// Upper y bound in metres.
    pub y_max: f64,
    /// Plane height for planar grids.
    pub z: f64,
    /// Lower z bound for volumetric grids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_min: Option<f64>,
    /// Upper z bound for volumetric grids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_max: Option<f64>,
    /// Step along every axis.
    pub increment: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x_min: -0.2,
            x_max: 0.2,
            y_min: -0.2,
            y_max: 0.2,
            z: 0.3,
            z_min: None,
            z_max: None,
            increment: 0.01,
        }
    }
}

/// Estimator named by `[beamformer] kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeamformerMethod {
    /// Functional beamforming with exponent `gamma`.
    #[default]
    Functional,
    /// Delay-and-sum, optionally without the CSM diagonal.
    #[serde(alias = "base")]
    Conventional,
}

/// `[beamformer]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamformerSection {
    /// Estimator.
    pub kind: BeamformerMethod,
    /// Functional exponent, at least 1.
    pub gamma: f64,
    /// Steering formulation.
    pub steering: SteeringFormulation,
    /// Drop the CSM diagonal (conventional only).
    pub remove_diagonal: bool,
    /// Steering reference point; the array centroid when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<[f64; 3]>,
}

impl Default for BeamformerSection {
    fn default() -> Self {
        Self {
            kind: BeamformerMethod::default(),
            gamma: DEFAULT_GAMMA,
            steering: SteeringFormulation::default(),
            remove_diagonal: false,
            reference: None,
        }
    }
}

/// `[band]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandSection {
    /// Centre frequency in Hz.
    pub frequency: f64,
    /// Band width as `1/fraction` octave; 0 selects the single nearest bin.
    pub fraction: u32,
    /// Several centre frequencies; overrides `frequency` when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frequencies: Vec<f64>,
}

impl Default for BandSection {
    fn default() -> Self {
        Self {
            frequency: 5000.0,
            fraction: 20,
            frequencies: Vec::new(),
        }
    }
}

/// A complete scene: what to synthesize and how to map it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Built-in geometry name or path to a geometry file.
    pub geometry: String,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Samples per channel.
    pub num_samples: usize,
    /// Speed of sound and level reference.
    pub constants: AcousticConstants,
    /// Propagation settings.
    pub propagation: PropagationSection,
    /// Cross-spectral estimation settings.
    pub spectra: SpectraSection,
    /// Scan grid.
    pub grid: GridConfig,
    /// Beamformer settings.
    pub beamformer: BeamformerSection,
    /// Analysis band.
    pub band: BandSection,
    /// Sources, mixed into one recording.
    pub sources: Vec<SourceConfig>,
    /// Directory that relative paths are resolved against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            geometry: "3x3".to_string(),
            sample_rate: 22050.0,
            num_samples: 22050,
            constants: AcousticConstants::AIR,
            propagation: PropagationSection::default(),
            spectra: SpectraSection::default(),
            grid: GridConfig::default(),
            beamformer: BeamformerSection::default(),
            band: BandSection::default(),
            sources: vec![SourceConfig::default()],
            base_dir: None,
        }
    }
}

impl SceneConfig {
    /// Load a scene from a TOML file.
    ///
    /// Relative geometry and waveform paths resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let mut scene = Self::from_toml(&contents)?;
        scene.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!(path = %path.display(), sources = scene.sources.len(), "loaded scene");
        Ok(scene)
    }

    /// Parse a scene from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Resolve relative paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Directory relative paths resolve against, if any.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Check every value without touching the filesystem.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_scene(self)
    }

    /// Validated acoustic constants.
    pub fn acoustic_constants(&self) -> Result<AcousticConstants, ConfigError> {
        self.constants.validate()?;
        Ok(self.constants)
    }

    /// The microphone array.
    pub fn array_geometry(&self) -> Result<ArrayGeometry, ConfigError> {
        resolve_geometry(&self.geometry, self.base_dir())
    }

    /// Free-field propagation model.
    pub fn propagation_model(&self) -> Result<PropagationModel, ConfigError> {
        let config =
            PropagationConfig::default().with_interpolation(self.propagation.interpolation);
        Ok(PropagationModel::new(self.acoustic_constants()?, config))
    }

    /// Validated spectral estimation settings.
    pub fn spectra_config(&self) -> Result<SpectraConfig, ConfigError> {
        let mut config = SpectraConfig::new(self.spectra.block_size, self.spectra.window)
            .with_overlap(self.spectra.overlap);
        if self.spectra.bin_low.is_some() || self.spectra.bin_high.is_some() {
            let low = self.spectra.bin_low.unwrap_or(0);
            let high = self
                .spectra
                .bin_high
                .unwrap_or(self.spectra.block_size / 2 + 1);
            config = config.with_bin_range(low..high);
        }
        config.validate()?;
        Ok(config)
    }

    /// The scan grid, planar unless both `z_min` and `z_max` are set.
    pub fn scan_grid(&self) -> Result<ScanGrid, ConfigError> {
        let g = &self.grid;
        let grid = match (g.z_min, g.z_max) {
            (Some(z_min), Some(z_max)) => {
                ScanGrid::rect3d(g.x_min, g.x_max, g.y_min, g.y_max, z_min, z_max, g.increment)?
            }
            (None, None) => ScanGrid::rect(g.x_min, g.x_max, g.y_min, g.y_max, g.z, g.increment)?,
            _ => {
                return Err(CoreError::InvalidGrid(
                    "z_min and z_max must be given together".to_string(),
                )
                .into());
            }
        };
        Ok(grid)
    }

    /// Beamformer settings; the microphone count is checked later.
    pub fn beamformer_config(&self) -> Result<BeamformerConfig, ConfigError> {
        let section = &self.beamformer;
        let kind = match section.kind {
            BeamformerMethod::Functional => BeamformerKind::Functional {
                gamma: section.gamma,
            },
            BeamformerMethod::Conventional => BeamformerKind::Conventional {
                remove_diagonal: section.remove_diagonal,
            },
        };
        let mut config = BeamformerConfig::new(kind).with_formulation(section.steering);
        if let Some(reference) = section.reference {
            config = config.with_reference(Point3::from(reference));
        }
        Ok(config)
    }

    /// Centre frequencies to map, in order.
    pub fn center_frequencies(&self) -> Vec<f64> {
        if self.band.frequencies.is_empty() {
            vec![self.band.frequency]
        } else {
            self.band.frequencies.clone()
        }
    }

    /// Generate every source signal and bind it to its location.
    ///
    /// WAV sources are resampled to the scene rate and must then hold at
    /// least `num_samples` samples.
    pub fn build_sources(&self) -> Result<Vec<PointSource>, ConfigError> {
        self.sources.iter().map(|s| self.build_source(s)).collect()
    }

    fn build_source(&self, source: &SourceConfig) -> Result<PointSource, ConfigError> {
        let signal = match &source.signal {
            SignalConfig::WhiteNoise { seed, rms } => {
                WhiteNoiseGenerator::new(self.sample_rate, self.num_samples, *seed, *rms)
                    .generate()?
            }
            SignalConfig::Sine {
                frequency,
                amplitude,
                phase,
            } => SineGenerator {
                phase: *phase,
                ..SineGenerator::new(self.sample_rate, self.num_samples, *frequency, *amplitude)
            }
            .generate()?,
            SignalConfig::Wav { path } => {
                let path = self.resolve_path(path);
                let waveform = sonomap_io::read_waveform(&path).map_err(|source| {
                    ConfigError::Waveform {
                        path: path.clone(),
                        source,
                    }
                })?;
                if waveform.sample_rate() != self.sample_rate {
                    tracing::info!(
                        path = %path.display(),
                        from = waveform.sample_rate(),
                        to = self.sample_rate,
                        "resampling waveform to scene rate"
                    );
                }
                let waveform = resample::to_rate(&waveform, self.sample_rate)?;
                WaveformGenerator::new(waveform)
                    .with_num_samples(self.num_samples)
                    .generate()?
            }
        };
        Ok(PointSource::new(signal, source.location))
    }

    /// Synthesize the recording the array captures from every source.
    pub fn render_recording(&self) -> Result<MultichannelTimeSeries, ConfigError> {
        let geometry = self.array_geometry()?;
        let model = self.propagation_model()?;
        let sources = self.build_sources()?;
        let recording = render(&sources, &geometry, &model)?;
        tracing::info!(
            sources = sources.len(),
            mics = geometry.len(),
            samples = recording.num_samples(),
            sample_rate = recording.sample_rate(),
            "rendered scene"
        );
        Ok(recording)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match self.base_dir() {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonomap_io::{WavSpec, write_wav};
    use tempfile::tempdir;

    #[test]
    fn empty_file_is_reference_scene() {
        let scene = SceneConfig::from_toml("").unwrap();
        assert_eq!(scene, SceneConfig::default());
        assert_eq!(scene.sources.len(), 1);
        assert_eq!(scene.center_frequencies(), vec![5000.0]);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let scene = SceneConfig::from_toml(
            r#"
[grid]
increment = 0.05

[beamformer]
kind = "conventional"
remove_diagonal = true
"#,
        )
        .unwrap();
        assert_eq!(scene.grid.increment, 0.05);
        assert_eq!(scene.grid.z, 0.3);
        assert_eq!(
            scene.beamformer_config().unwrap().kind,
            BeamformerKind::Conventional {
                remove_diagonal: true
            }
        );
        assert_eq!(scene.scan_grid().unwrap().shape(), (9, 9, 1));
    }

    #[test]
    fn parse_tagged_sources() {
        let scene = SceneConfig::from_toml(
            r#"
[[sources]]
kind = "sine"
frequency = 1000.0
location = [0.1, 0.0, 0.5]

[[sources]]
kind = "white_noise"
location = [0.0, 0.0, 1.0]
"#,
        )
        .unwrap();
        assert_eq!(scene.sources.len(), 2);
        assert_eq!(
            scene.sources[0].signal,
            SignalConfig::Sine {
                frequency: 1000.0,
                amplitude: 1.0,
                phase: 0.0,
            }
        );
        assert_eq!(
            scene.sources[1].signal,
            SignalConfig::WhiteNoise { seed: 1, rms: 0.5 }
        );
    }

    #[test]
    fn toml_roundtrip() {
        let mut scene = SceneConfig::default();
        scene.band.frequencies = vec![2000.0, 4000.0];
        scene.grid.z_min = Some(0.2);
        scene.grid.z_max = Some(0.4);
        scene.beamformer.reference = Some([0.0, 0.0, 0.0]);
        scene.sources.push(SourceConfig {
            location: [0.1, 0.1, 0.8],
            signal: SignalConfig::Wav {
                path: PathBuf::from("drone.wav"),
            },
        });

        let parsed = SceneConfig::from_toml(&scene.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, scene);
    }

    #[test]
    fn volumetric_grid_needs_both_bounds() {
        let mut scene = SceneConfig::default();
        scene.grid.increment = 0.1;
        scene.grid.z_min = Some(0.2);
        assert!(scene.scan_grid().is_err());
        scene.grid.z_max = Some(0.4);
        assert_eq!(scene.scan_grid().unwrap().shape(), (5, 5, 3));
    }

    #[test]
    fn unknown_names_rejected() {
        for toml_str in [
            "[beamformer]\nkind = \"capon\"\n",
            "[beamformer]\nsteering = \"v\"\n",
            "[spectra]\nwindow = \"kaiser\"\n",
            "[propagation]\ninterpolation = \"cubic\"\n",
        ] {
            assert!(
                matches!(
                    SceneConfig::from_toml(toml_str),
                    Err(ConfigError::TomlParse(_))
                ),
                "{toml_str}"
            );
        }
    }

    #[test]
    fn names_and_aliases_parse() {
        let scene = SceneConfig::from_toml(
            r#"
[propagation]
interpolation = "linear"

[spectra]
window = "hann"

[beamformer]
kind = "base"
steering = "iv"
"#,
        )
        .unwrap();
        assert_eq!(scene.propagation.interpolation, Interpolation::Linear);
        assert_eq!(scene.spectra.window, Window::Hann);
        assert_eq!(scene.beamformer.kind, BeamformerMethod::Conventional);
        assert_eq!(scene.beamformer.steering, SteeringFormulation::TrueLocation);

        let text = SceneConfig::default().to_toml().unwrap();
        assert!(text.contains("window = \"hanning\""), "{text}");
        assert!(text.contains("kind = \"functional\""), "{text}");
        assert!(text.contains("steering = \"true-level\""), "{text}");
        assert!(text.contains("interpolation = \"nearest\""), "{text}");
    }

    #[test]
    fn render_reference_scene() {
        let mut scene = SceneConfig::default();
        scene.num_samples = 2048;
        let recording = scene.render_recording().unwrap();
        assert_eq!(recording.num_channels(), 9);
        assert_eq!(recording.num_samples(), 2048);
    }

    #[test]
    fn wav_source_resolves_against_base_dir() {
        let dir = tempdir().unwrap();
        let samples: Vec<f32> = (0..600).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        write_wav(dir.path().join("drone.wav"), &samples, WavSpec::default()).unwrap();

        let mut scene = SceneConfig::default().with_base_dir(dir.path());
        scene.num_samples = 500;
        scene.sources = vec![SourceConfig {
            location: [0.0, 1.0, 40.0],
            signal: SignalConfig::Wav {
                path: PathBuf::from("drone.wav"),
            },
        }];
        let sources = scene.build_sources().unwrap();
        assert_eq!(sources[0].signal.samples(), &samples[..500]);

        scene.num_samples = 1000;
        assert!(matches!(
            scene.build_sources(),
            Err(ConfigError::Core(CoreError::SourceExhausted {
                requested: 1000,
                available: 600
            }))
        ));
    }

    #[test]
    fn wav_source_resampled_to_scene_rate() {
        let dir = tempdir().unwrap();
        let spec = WavSpec {
            sample_rate: 44100,
            bits_per_sample: 16,
            ..WavSpec::default()
        };
        let tone: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        write_wav(dir.path().join("drone44k.wav"), &tone, spec).unwrap();

        let mut scene = SceneConfig::default().with_base_dir(dir.path());
        scene.num_samples = 11025;
        scene.sources = vec![
            SourceConfig {
                location: [0.0, 1.0, 40.0],
                signal: SignalConfig::Wav {
                    path: PathBuf::from("drone44k.wav"),
                },
            },
            SourceConfig {
                location: [-1.0, -1.0, 1.0],
                signal: SignalConfig::WhiteNoise { seed: 1, rms: 0.5 },
            },
        ];

        let sources = scene.build_sources().unwrap();
        let wav = &sources[0].signal;
        assert_eq!(wav.sample_rate(), 22050.0);
        assert_eq!(wav.len(), 11025);
        // half the rate, same tone: every other input sample survives the lowpass
        for m in 200..wav.len() {
            let expected = tone[2 * m];
            assert!(
                (wav.samples()[m] - expected).abs() < 0.01,
                "sample {m}: {} vs {expected}",
                wav.samples()[m]
            );
        }

        let recording = scene.render_recording().unwrap();
        assert_eq!(recording.sample_rate(), 22050.0);
        assert_eq!(recording.num_samples(), 11025);
        assert_eq!(recording.num_channels(), 9);

        // 22050 input samples become 11025, so asking for more exhausts the waveform
        scene.num_samples = 22051;
        assert!(matches!(
            scene.build_sources(),
            Err(ConfigError::Core(CoreError::SourceExhausted {
                requested: 22051,
                available: 22050
            }))
        ));
    }

    #[test]
    fn missing_wav_source() {
        let mut scene = SceneConfig::default();
        scene.sources[0].signal = SignalConfig::Wav {
            path: PathBuf::from("/nonexistent/drone.wav"),
        };
        assert!(matches!(
            scene.build_sources(),
            Err(ConfigError::Waveform { .. })
        ));
    }

    #[test]
    fn load_sets_base_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenes/a.toml");
        SceneConfig::default().save(&path).unwrap();
        let loaded = SceneConfig::load(&path).unwrap();
        assert_eq!(loaded.base_dir(), Some(dir.path().join("scenes").as_path()));
    }
}
