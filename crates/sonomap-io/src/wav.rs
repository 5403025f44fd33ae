//! WAV waveform reading and writing.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use sonomap_synth::Signal;
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

impl WavFormat {
    /// Short label for summaries.
    pub fn label(&self) -> &'static str {
        match self {
            WavFormat::Pcm => "PCM",
            WavFormat::IeeeFloat => "IEEE float",
        }
    }
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of channels (one per microphone for recordings).
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len()); // total across all channels
    let num_frames = total_samples / u64::from(spec.channels);
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// WAV file specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample: 8, 16 or 24 for PCM, 32 for float.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read every sample as `f32`, interleaved, normalising integer PCM to [-1, 1).
pub(crate) fn read_interleaved(reader: WavReader<std::io::BufReader<std::fs::File>>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = pcm_full_scale(spec.bits_per_sample)?;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(samples)
}

fn pcm_full_scale(bits: u16) -> Result<f32> {
    if (1..=32).contains(&bits) {
        Ok((1i64 << (bits - 1)) as f32)
    } else {
        Err(Error::UnsupportedFormat(format!("{bits}-bit PCM")))
    }
}

/// Read a WAV file and return mono samples as f32 along with the spec.
///
/// Multi-channel files are mixed down to mono by averaging channels.
///
/// # Example
/// ```ignore
/// let (samples, spec) = read_wav("source.wav")?;
/// println!("Loaded {} samples at {} Hz", samples.len(), spec.sample_rate);
/// ```
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = spec.channels as usize;
    let samples = read_interleaved(reader)?;

    // Mix down to mono if multi-channel
    let mono_samples = if channels > 1 {
        samples
            .chunks(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono_samples, spec))
}

/// Read a WAV file as a mono source [`Signal`] at the file's sample rate.
pub fn read_waveform<P: AsRef<Path>>(path: P) -> Result<Signal> {
    let path = path.as_ref();
    let (samples, spec) = read_wav(path)?;
    tracing::debug!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        "loaded waveform"
    );
    Ok(Signal::new(samples, f64::from(spec.sample_rate))?)
}

/// Write interleaved samples to a WAV file.
///
/// 32-bit files are written as IEEE float; other depths as clamped PCM.
///
/// # Example
/// ```ignore
/// let samples = vec![0.0f32; 22050]; // 1 second of silence
/// let spec = WavSpec { sample_rate: 22050, ..Default::default() };
/// write_wav("output.wav", &samples, spec)?;
/// ```
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], spec: WavSpec) -> Result<()> {
    let hound_spec = hound::WavSpec::from(spec);
    if spec.bits_per_sample == 32 {
        let mut writer = WavWriter::create(path, hound_spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    } else {
        if !matches!(spec.bits_per_sample, 8 | 16 | 24) {
            return Err(Error::UnsupportedFormat(format!(
                "{}-bit PCM",
                spec.bits_per_sample
            )));
        }
        let max_val = pcm_full_scale(spec.bits_per_sample)?;
        let mut writer = WavWriter::create(path, hound_spec)?;
        for &sample in samples {
            let int_sample = (sample * max_val).clamp(-max_val, max_val - 1.0) as i32;
            writer.write_sample(int_sample)?;
        }
        writer.finalize()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_roundtrip_f32() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 32,
        };

        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec.sample_rate, 22050);
        assert_eq!(loaded, samples);
    }

    #[test]
    fn test_roundtrip_i16() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0).sin() * 0.9).collect();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
        };

        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, spec).unwrap();

        let (loaded, loaded_spec) = read_wav(file.path()).unwrap();
        assert_eq!(loaded_spec.sample_rate, 44100);
        assert_eq!(loaded.len(), samples.len());

        // 16-bit has less precision
        for (a, b) in samples.iter().zip(loaded.iter()) {
            assert!((a - b).abs() < 0.001);
        }
    }

    #[test]
    fn test_stereo_mixdown() {
        let interleaved = vec![1.0, 3.0, 2.0, 4.0, -1.0, 1.0];
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 32,
        };
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &interleaved, spec).unwrap();

        let (mono, spec) = read_wav(file.path()).unwrap();
        assert_eq!(spec.channels, 2);
        assert_eq!(mono, vec![2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_read_waveform() {
        let samples: Vec<f32> = (0..500).map(|i| i as f32 / 1000.0).collect();
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &samples, WavSpec::default()).unwrap();

        let signal = read_waveform(file.path()).unwrap();
        assert_eq!(signal.sample_rate(), 22050.0);
        assert_eq!(signal.samples(), samples.as_slice());
    }

    #[test]
    fn test_empty_waveform_rejected() {
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &[], WavSpec::default()).unwrap();
        assert!(matches!(read_waveform(file.path()), Err(Error::Core(_))));
    }

    #[test]
    fn test_info() {
        let spec = WavSpec {
            channels: 3,
            sample_rate: 1000,
            bits_per_sample: 16,
        };
        let file = NamedTempFile::new().unwrap();
        write_wav(file.path(), &vec![0.0; 3 * 250], spec).unwrap();

        let info = read_wav_info(file.path()).unwrap();
        assert_eq!(info.channels, 3);
        assert_eq!(info.num_frames, 250);
        assert_eq!(info.format, WavFormat::Pcm);
        assert!((info.duration_secs - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_unsupported_depth() {
        let spec = WavSpec {
            bits_per_sample: 12,
            ..WavSpec::default()
        };
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            write_wav(file.path(), &[0.0], spec),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
