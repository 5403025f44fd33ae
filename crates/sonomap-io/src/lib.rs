//! File I/O for the sonomap pipeline.
//!
//! This crate provides:
//!
//! - **Waveform input**: [`read_wav`] / [`read_waveform`] load a mono source
//!   signal from any PCM or float WAV file
//! - **Time-series store**: [`write_time_series`] and [`read_time_series`]
//!   persist a multichannel recording as a 32-bit float WAV file, one channel
//!   per microphone, bit-exact
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sonomap_io::{read_time_series, read_waveform, write_time_series};
//!
//! // Load a source signal
//! let signal = read_waveform("speech.wav")?;
//!
//! // ... render a recording ...
//!
//! write_time_series("recording.wav", &recording)?;
//! let back = read_time_series("recording.wav")?;
//! assert_eq!(back, recording);
//! ```

mod timeseries;
mod wav;

pub use timeseries::{read_time_series, read_time_series_info, write_time_series};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav, read_wav_info, read_waveform, write_wav};

/// Error types for file I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Loaded data violates a pipeline invariant.
    #[error(transparent)]
    Core(#[from] sonomap_core::Error),

    /// WAV headers store whole-hertz sample rates only.
    #[error("Unsupported sample rate: {0} Hz (must be a whole number of hertz)")]
    UnsupportedSampleRate(f64),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for file I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
