//! Free-field propagation from a point source to each microphone.
//!
//! Each microphone receives the source signal delayed by `r / c` and scaled by
//! `1 / r`, where `r` is the source-to-microphone distance. Samples before the
//! wavefront arrives are zero; the output has the source's length.

use serde::{Deserialize, Serialize};
use sonomap_core::{AcousticConstants, ArrayGeometry, Point3, Result};

use crate::signal::Signal;

/// Fractional-delay handling for propagation delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Round the delay to the nearest whole sample.
    ///
    /// Leaves a timing error of up to half a sample period.
    #[default]
    #[serde(alias = "none")]
    Nearest,
    /// Two-tap linear interpolation between neighbouring samples.
    Linear,
}

impl Interpolation {
    /// Lowercase name, as written in scene files.
    pub fn name(&self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Linear => "linear",
        }
    }
}

/// Propagation settings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PropagationConfig {
    /// Fractional-delay method.
    pub interpolation: Interpolation,
}

impl PropagationConfig {
    /// Set the fractional-delay method.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// A source signal at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSource {
    /// Emitted signal, as it would be measured at 1 m.
    pub signal: Signal,
    /// Source position in metres.
    pub location: Point3,
}

impl PointSource {
    /// Bind a signal to a location.
    pub fn new(signal: Signal, location: impl Into<Point3>) -> Self {
        Self {
            signal,
            location: location.into(),
        }
    }
}

/// Maps a point source onto per-microphone signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationModel {
    constants: AcousticConstants,
    config: PropagationConfig,
}

impl PropagationModel {
    /// Create a model with explicit constants and settings.
    pub fn new(constants: AcousticConstants, config: PropagationConfig) -> Self {
        Self { constants, config }
    }

    /// Constants used by this model.
    pub fn constants(&self) -> &AcousticConstants {
        &self.constants
    }

    /// Settings used by this model.
    pub fn config(&self) -> &PropagationConfig {
        &self.config
    }

    /// Delay (in samples) and gain for every microphone.
    ///
    /// Fails with [`sonomap_core::Error::DegenerateGeometry`] if the source sits on a
    /// microphone.
    pub fn delays_and_gains(
        &self,
        location: &Point3,
        geometry: &ArrayGeometry,
        sample_rate: f64,
    ) -> Result<Vec<(f64, f64)>> {
        let distances = geometry.distances_from(location)?;
        Ok(distances
            .into_iter()
            .map(|r| (self.constants.travel_time(r) * sample_rate, 1.0 / r))
            .collect())
    }

    /// The source's contribution at each microphone, in channel order.
    pub fn propagate(&self, source: &PointSource, geometry: &ArrayGeometry) -> Result<Vec<Signal>> {
        let sample_rate = source.signal.sample_rate();
        let input = source.signal.samples();
        let taps = self.delays_and_gains(&source.location, geometry, sample_rate)?;

        tracing::debug!(
            location = %source.location,
            samples = input.len(),
            interpolation = self.config.interpolation.name(),
            "propagating point source to {} microphones",
            geometry.len()
        );

        taps.into_iter()
            .map(|(delay, gain)| {
                let samples = match self.config.interpolation {
                    Interpolation::Nearest => delay_nearest(input, delay, gain),
                    Interpolation::Linear => delay_linear(input, delay, gain),
                };
                Signal::new(samples, sample_rate)
            })
            .collect()
    }
}

fn delay_nearest(input: &[f32], delay: f64, gain: f64) -> Vec<f32> {
    let shift = delay.round() as usize;
    let mut out = vec![0.0; input.len()];
    if shift < input.len() {
        for (o, &x) in out[shift..].iter_mut().zip(input) {
            *o = (f64::from(x) * gain) as f32;
        }
    }
    out
}

fn delay_linear(input: &[f32], delay: f64, gain: f64) -> Vec<f32> {
    // Samples outside the input are zero
    let at = |i: i64| -> f64 {
        if i >= 0 && (i as usize) < input.len() {
            f64::from(input[i as usize])
        } else {
            0.0
        }
    };
    (0..input.len())
        .map(|n| {
            let t = n as f64 - delay;
            let i = t.floor();
            let frac = t - i;
            let i = i as i64;
            ((at(i) * (1.0 - frac) + at(i + 1) * frac) * gain) as f32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonomap_core::Error;

    fn impulse(len: usize, sample_rate: f64) -> Signal {
        let mut s = vec![0.0; len];
        s[0] = 1.0;
        Signal::new(s, sample_rate).unwrap()
    }

    fn single_mic_at(x: f64) -> ArrayGeometry {
        ArrayGeometry::new(vec![Point3::new(x, 0.0, 0.0)]).unwrap()
    }

    #[test]
    fn impulse_arrives_after_travel_time() {
        // 343.2 m/s and 1 kHz: 3.432 m is exactly 10 samples
        let geom = single_mic_at(3.432);
        let model = PropagationModel::new(AcousticConstants::AIR, PropagationConfig::default());
        let source = PointSource::new(impulse(32, 1000.0), Point3::ORIGIN);
        let out = model.propagate(&source, &geom).unwrap();
        assert_eq!(out.len(), 1);
        let s = out[0].samples();
        assert_eq!(s.len(), 32);
        for (i, &v) in s.iter().enumerate() {
            if i == 10 {
                assert!((f64::from(v) - 1.0 / 3.432).abs() < 1e-6);
            } else {
                assert_eq!(v, 0.0, "sample {i}");
            }
        }
    }

    #[test]
    fn linear_interpolation_splits_half_sample() {
        // 10.5 samples of delay
        let geom = single_mic_at(3.6036);
        let config = PropagationConfig::default().with_interpolation(Interpolation::Linear);
        let model = PropagationModel::new(AcousticConstants::AIR, config);
        let source = PointSource::new(impulse(32, 1000.0), Point3::ORIGIN);
        let s = model.propagate(&source, &geom).unwrap()[0].samples().to_vec();
        let gain = 1.0 / 3.6036;
        assert!((f64::from(s[10]) - 0.5 * gain).abs() < 1e-5);
        assert!((f64::from(s[11]) - 0.5 * gain).abs() < 1e-5);
        assert_eq!(s[9], 0.0);
        assert_eq!(s[12], 0.0);
    }

    #[test]
    fn inverse_distance_attenuation() {
        let geom = ArrayGeometry::new(vec![Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)])
            .unwrap();
        let model = PropagationModel::new(AcousticConstants::AIR, PropagationConfig::default());
        let taps = model
            .delays_and_gains(&Point3::ORIGIN, &geom, 48000.0)
            .unwrap();
        assert!((taps[0].1 - 1.0).abs() < 1e-12);
        assert!((taps[1].1 - 0.5).abs() < 1e-12);
        assert!((taps[1].0 - 2.0 * taps[0].0).abs() < 1e-9);
    }

    #[test]
    fn delay_longer_than_signal_is_silent() {
        let geom = single_mic_at(100.0);
        let model = PropagationModel::new(AcousticConstants::AIR, PropagationConfig::default());
        let source = PointSource::new(impulse(16, 1000.0), Point3::ORIGIN);
        let out = model.propagate(&source, &geom).unwrap();
        assert!(out[0].samples().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn source_on_microphone_is_degenerate() {
        let geom = ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).unwrap();
        let model = PropagationModel::new(AcousticConstants::AIR, PropagationConfig::default());
        let on_mic = geom.position(4).unwrap();
        let source = PointSource::new(impulse(16, 1000.0), on_mic);
        let err = model.propagate(&source, &geom).unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry(_)), "got {err:?}");
    }
}
