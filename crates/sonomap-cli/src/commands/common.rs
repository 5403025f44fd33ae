//! Shared CLI helpers used across multiple commands.

use anyhow::Context;
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use sonomap_analysis::export::{export_level_matrix_csv, export_power_map_csv};
use sonomap_analysis::{
    BeamformDiagnostics, Beamformer, PowerMap, SpectralEstimator, SteeringFormulation, Window,
};
use sonomap_config::SceneConfig;
use sonomap_core::{AcousticConstants, MultichannelTimeSeries};
use std::path::{Path, PathBuf};

/// Command-line overrides for the scene's mapping settings.
#[derive(Args, Debug, Clone, Default)]
pub struct MapOverrides {
    /// Centre frequency in Hz; repeat or comma-separate for several bands
    #[arg(short = 'f', long = "frequency", value_delimiter = ',')]
    pub frequencies: Vec<f64>,

    /// Band width as 1/N octave (0 selects the single nearest bin)
    #[arg(long)]
    pub fraction: Option<u32>,

    /// Functional beamformer exponent (>= 1)
    #[arg(long)]
    pub gamma: Option<f64>,

    /// Scan grid increment in metres
    #[arg(long)]
    pub increment: Option<f64>,

    /// Steering formulation (classic, inverse, true-level, true-location)
    #[arg(long)]
    pub steering: Option<SteeringFormulation>,

    /// Spectral window (rectangular, hanning, hamming, blackman, bartlett)
    #[arg(long)]
    pub window: Option<Window>,
}

impl MapOverrides {
    /// Write the given overrides into `scene`.
    pub fn apply(&self, scene: &mut SceneConfig) {
        if !self.frequencies.is_empty() {
            scene.band.frequencies.clone_from(&self.frequencies);
        }
        if let Some(fraction) = self.fraction {
            scene.band.fraction = fraction;
        }
        if let Some(gamma) = self.gamma {
            scene.beamformer.gamma = gamma;
        }
        if let Some(increment) = self.increment {
            scene.grid.increment = increment;
        }
        if let Some(steering) = self.steering {
            scene.beamformer.steering = steering;
        }
        if let Some(window) = self.window {
            scene.spectra.window = window;
        }
    }
}

/// CSV layout for exported maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CsvLayout {
    /// One `x,y,z,power,level_db` row per grid point
    #[default]
    Points,
    /// Level matrix with rows of constant y (planar grids only)
    Matrix,
}

/// Where to write mapping results.
#[derive(Args, Debug, Clone, Default)]
pub struct MapOutputArgs {
    /// Write the map as CSV; several bands get a `_<freq>Hz` suffix
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// CSV layout
    #[arg(long, value_enum, default_value_t = CsvLayout::Points)]
    pub layout: CsvLayout,

    /// Write a JSON summary of every map
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

/// Load a scene file, or the reference scene when none is given, and apply
/// the overrides without validating.
pub fn read_scene(path: Option<&Path>, overrides: &MapOverrides) -> anyhow::Result<SceneConfig> {
    let mut scene = match path {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("failed to load scene {}", path.display()))?,
        None => SceneConfig::default(),
    };
    overrides.apply(&mut scene);
    Ok(scene)
}

/// [`read_scene`] followed by validation.
pub fn load_scene(path: Option<&Path>, overrides: &MapOverrides) -> anyhow::Result<SceneConfig> {
    let scene = read_scene(path, overrides)?;
    scene.validate().context("invalid scene")?;
    Ok(scene)
}

/// Estimate spectra and beamform every configured band.
pub fn map_recording(
    scene: &SceneConfig,
    recording: &MultichannelTimeSeries,
) -> anyhow::Result<Vec<PowerMap>> {
    let geometry = scene.array_geometry()?;
    recording
        .check_channels(&geometry)
        .context("recording does not match the array geometry")?;

    let spectra = SpectralEstimator::new(scene.spectra_config()?)?.estimate(recording)?;
    let grid = scene.scan_grid()?;
    let config = scene.beamformer_config()?;
    let beamformer = Beamformer::new(config, &geometry, &grid, scene.acoustic_constants()?)?;
    tracing::info!(
        beamformer = config.kind.name(),
        steering = config.formulation.name(),
        points = grid.len(),
        "mapping"
    );

    let frequencies = scene.center_frequencies();
    let pb = if frequencies.len() > 1 {
        let pb = ProgressBar::new(frequencies.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} bands ({eta})")?
                .progress_chars("##-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut maps = Vec::with_capacity(frequencies.len());
    for frequency in frequencies {
        let map = beamformer
            .synthetic(&spectra, frequency, scene.band.fraction)
            .with_context(|| format!("beamforming failed at {frequency} Hz"))?;
        maps.push(map);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(maps)
}

/// Print the peak and diagnostics of each map.
pub fn print_summary(maps: &[PowerMap], constants: &AcousticConstants) {
    for map in maps {
        let (low, high) = map.band();
        let (_, peak, power) = map.peak();
        println!(
            "{:>8.1} Hz  ({:.1}-{:.1} Hz)  peak {:>6.1} dB at {}",
            map.center_frequency(),
            low,
            high,
            constants.level_db(power),
            peak
        );
        if let Some(warning) = map.diagnostics().as_warning() {
            println!("            warning: {warning}");
        }
    }
    if maps.len() > 1 {
        let total = total_diagnostics(maps);
        println!(
            "{} bands, {} bins evaluated, {} ill-conditioned",
            maps.len(),
            total.bins_evaluated,
            total.ill_conditioned_bins
        );
    }
}

/// Diagnostics summed over every band.
pub fn total_diagnostics(maps: &[PowerMap]) -> BeamformDiagnostics {
    maps.iter()
        .fold(BeamformDiagnostics::default(), |mut total, map| {
            total.merge(map.diagnostics());
            total
        })
}

/// JSON summary of one map.
pub fn map_summary(map: &PowerMap, constants: &AcousticConstants) -> serde_json::Value {
    let (index, peak, power) = map.peak();
    let (nx, ny, nz) = map.grid().shape();
    let (z_min, z_max) = map.grid().z_range();
    let (low, high) = map.band();
    let diagnostics = map.diagnostics();
    serde_json::json!({
        "center_frequency": map.center_frequency(),
        "band": [low, high],
        "grid": {
            "shape": [nx, ny, nz],
            "increment": map.grid().increment(),
            "extent": map.grid().extent(),
            "z_range": [z_min, z_max],
        },
        "peak": {
            "index": index,
            "x": peak.x,
            "y": peak.y,
            "z": peak.z,
            "power": power,
            "level_db": constants.level_db(power),
        },
        "total_power": map.total_power(),
        "diagnostics": {
            "bins_evaluated": diagnostics.bins_evaluated,
            "ill_conditioned_bins": diagnostics.ill_conditioned_bins,
            "clamped_eigenvalues": diagnostics.clamped_eigenvalues,
        },
    })
}

/// Write CSV and JSON outputs as requested.
pub fn write_outputs(
    maps: &[PowerMap],
    constants: &AcousticConstants,
    outputs: &MapOutputArgs,
) -> anyhow::Result<()> {
    if let Some(base) = &outputs.output {
        let multiple = maps.len() > 1;
        for map in maps {
            let path = band_path(base, map.center_frequency(), multiple);
            match outputs.layout {
                CsvLayout::Points => export_power_map_csv(map, constants, &path),
                CsvLayout::Matrix => export_level_matrix_csv(map, constants, &path),
            }
            .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote map to {}", path.display());
        }
    }

    if let Some(path) = &outputs.json {
        let summary: Vec<_> = maps.iter().map(|m| map_summary(m, constants)).collect();
        std::fs::write(path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote summary to {}", path.display());
    }

    Ok(())
}

/// `base` itself for one band, otherwise `<stem>_<freq>Hz.<ext>` beside it.
fn band_path(base: &Path, frequency: f64, multiple: bool) -> PathBuf {
    if !multiple {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map_or_else(|| "map".to_string(), |s| s.to_string_lossy().into_owned());
    let ext = base
        .extension()
        .map_or_else(|| "csv".to_string(), |e| e.to_string_lossy().into_owned());
    base.with_file_name(format!("{stem}_{frequency:.0}Hz.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_path_single_keeps_name() {
        let base = Path::new("out/map.csv");
        assert_eq!(band_path(base, 5000.0, false), PathBuf::from("out/map.csv"));
    }

    #[test]
    fn band_path_multiple_adds_suffix() {
        let base = Path::new("out/map.csv");
        assert_eq!(
            band_path(base, 2500.0, true),
            PathBuf::from("out/map_2500Hz.csv")
        );
        assert_eq!(
            band_path(Path::new("levels"), 4000.0, true),
            PathBuf::from("levels_4000Hz.csv")
        );
    }

    #[test]
    fn overrides_replace_scene_values() {
        let mut scene = SceneConfig::default();
        MapOverrides {
            frequencies: vec![1000.0, 2000.0],
            fraction: Some(3),
            gamma: Some(8.0),
            increment: None,
            steering: Some(SteeringFormulation::TrueLocation),
            window: None,
        }
        .apply(&mut scene);
        assert_eq!(scene.center_frequencies(), vec![1000.0, 2000.0]);
        assert_eq!(scene.band.fraction, 3);
        assert_eq!(scene.beamformer.gamma, 8.0);
        assert_eq!(scene.grid.increment, 0.01);
        assert_eq!(scene.beamformer.steering, SteeringFormulation::TrueLocation);
        assert_eq!(scene.spectra.window, Window::Hann);
    }

    #[test]
    fn named_overrides_parse_from_args() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            overrides: MapOverrides,
        }

        let parsed =
            Wrapper::try_parse_from(["sonomap", "--steering", "iv", "--window", "blackman"])
                .unwrap();
        assert_eq!(
            parsed.overrides.steering,
            Some(SteeringFormulation::TrueLocation)
        );
        assert_eq!(parsed.overrides.window, Some(Window::Blackman));
        assert!(Wrapper::try_parse_from(["sonomap", "--window", "kaiser"]).is_err());
    }
}
