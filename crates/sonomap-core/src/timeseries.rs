//! Multichannel time-domain recordings.

use crate::error::{Error, Result};
use crate::geometry::ArrayGeometry;

/// Rectangular `channels × samples` buffer of pressure samples.
///
/// Samples are stored as `f32`, the precision of the on-disk store, so a
/// write/read cycle is lossless. All channels have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct MultichannelTimeSeries {
    channels: Vec<Vec<f32>>,
    sample_rate: f64,
}

impl MultichannelTimeSeries {
    /// Build a time series from per-channel sample vectors.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: f64) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        let Some(first) = channels.first() else {
            return Err(Error::InvalidSignal(
                "time series needs at least one channel".to_string(),
            ));
        };
        let len = first.len();
        if len == 0 {
            return Err(Error::InvalidSignal(
                "time series channels must not be empty".to_string(),
            ));
        }
        if let Some((i, ch)) = channels.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(Error::ShapeMismatch(format!(
                "channel {i} has {} samples, channel 0 has {len}",
                ch.len()
            )));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Build a time series from interleaved frames.
    pub fn from_interleaved(data: &[f32], num_channels: usize, sample_rate: f64) -> Result<Self> {
        if num_channels == 0 {
            return Err(Error::InvalidSignal(
                "time series needs at least one channel".to_string(),
            ));
        }
        if data.len() % num_channels != 0 {
            return Err(Error::ShapeMismatch(format!(
                "{} interleaved samples do not divide into {num_channels} channels",
                data.len()
            )));
        }
        let frames = data.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in data.chunks_exact(num_channels) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }
        Self::new(channels, sample_rate)
    }

    /// Interleave channels frame by frame.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let n = self.num_samples();
        let mut out = Vec::with_capacity(n * self.channels.len());
        for i in 0..n {
            out.extend(self.channels.iter().map(|ch| ch[i]));
        }
        out
    }

    /// Number of channels (microphones).
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.channels[0].len()
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate
    }

    /// Samples of one channel.
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// All channels.
    #[inline]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Fail unless there is exactly one channel per microphone.
    pub fn check_channels(&self, geometry: &ArrayGeometry) -> Result<()> {
        if self.num_channels() == geometry.len() {
            Ok(())
        } else {
            Err(Error::ShapeMismatch(format!(
                "time series has {} channels but the array has {} microphones",
                self.num_channels(),
                geometry.len()
            )))
        }
    }
}

/// Reject non-positive or non-finite sample rates.
pub fn check_sample_rate(sample_rate: f64) -> Result<()> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidSignal(format!(
            "sample rate must be positive, got {sample_rate}"
        )))
    }
}
