//! Multichannel time-series store.
//!
//! A recording is one WAV file of 32-bit IEEE-float samples with one channel
//! per microphone, frames interleaved. Float samples are copied bit for bit,
//! so a write followed by a read reproduces the recording exactly.

use crate::wav::{WavInfo, WavSpec, read_interleaved, read_wav_info, write_wav};
use crate::{Error, Result};
use hound::WavReader;
use sonomap_core::MultichannelTimeSeries;
use std::path::Path;

fn header_rate(sample_rate: f64) -> Result<u32> {
    if sample_rate.fract() == 0.0 && (1.0..=f64::from(u32::MAX)).contains(&sample_rate) {
        Ok(sample_rate as u32)
    } else {
        Err(Error::UnsupportedSampleRate(sample_rate))
    }
}

/// Persist a recording as a multichannel float WAV file.
///
/// Fails with [`Error::UnsupportedSampleRate`] for fractional sample rates.
pub fn write_time_series<P: AsRef<Path>>(path: P, series: &MultichannelTimeSeries) -> Result<()> {
    let path = path.as_ref();
    let sample_rate = header_rate(series.sample_rate())?;
    let channels = u16::try_from(series.num_channels()).map_err(|_| {
        Error::UnsupportedFormat(format!("{} channels", series.num_channels()))
    })?;
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
    };
    write_wav(path, &series.to_interleaved(), spec)?;
    tracing::info!(
        path = %path.display(),
        channels,
        samples = series.num_samples(),
        sample_rate,
        "wrote time series"
    );
    Ok(())
}

/// Load a recording written by [`write_time_series`].
///
/// Integer PCM files are accepted too and normalised to [-1, 1).
pub fn read_time_series<P: AsRef<Path>>(path: P) -> Result<MultichannelTimeSeries> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let data = read_interleaved(reader)?;
    let series = MultichannelTimeSeries::from_interleaved(
        &data,
        usize::from(spec.channels),
        f64::from(spec.sample_rate),
    )?;
    tracing::debug!(
        path = %path.display(),
        channels = series.num_channels(),
        samples = series.num_samples(),
        "read time series"
    );
    Ok(series)
}

/// Channel count, sample rate, and length of a stored recording.
pub fn read_time_series_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    read_wav_info(path)
}
