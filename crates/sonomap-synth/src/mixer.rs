//! Summing per-microphone contributions into one recording.
//!
//! Inputs are truncated to the shortest contribution. Sums are accumulated in
//! `f64` and rounded once, so the result does not depend on source order.

use sonomap_core::{ArrayGeometry, Error, MultichannelTimeSeries, Result};

use crate::propagation::{PointSource, PropagationModel};
use crate::signal::Signal;

/// Sum per-microphone signal sets (one set per source) channel by channel.
///
/// All sets must have the same channel count and sample rate. The output
/// length is the shortest input length.
pub fn mix(contributions: &[Vec<Signal>]) -> Result<MultichannelTimeSeries> {
    let Some(first) = contributions.first() else {
        return Err(Error::InsufficientData {
            available: 0,
            required: 1,
        });
    };
    let num_channels = first.len();
    let Some(reference) = first.first() else {
        return Err(Error::ShapeMismatch(
            "source contribution has no channels".to_string(),
        ));
    };
    let sample_rate = reference.sample_rate();

    let mut len = usize::MAX;
    for (s, set) in contributions.iter().enumerate() {
        if set.len() != num_channels {
            return Err(Error::ShapeMismatch(format!(
                "source {s} has {} channels, source 0 has {num_channels}",
                set.len()
            )));
        }
        for signal in set {
            if signal.sample_rate() != sample_rate {
                return Err(Error::ShapeMismatch(format!(
                    "source {s} is sampled at {} Hz, source 0 at {sample_rate} Hz",
                    signal.sample_rate()
                )));
            }
            len = len.min(signal.len());
        }
    }

    let channels = (0..num_channels)
        .map(|ch| {
            let mut acc = vec![0.0_f64; len];
            for set in contributions {
                for (a, &x) in acc.iter_mut().zip(set[ch].samples()) {
                    *a += f64::from(x);
                }
            }
            acc.into_iter().map(|v| v as f32).collect()
        })
        .collect();

    MultichannelTimeSeries::new(channels, sample_rate)
}

/// Propagate every source to the array and mix the result.
pub fn render(
    sources: &[PointSource],
    geometry: &ArrayGeometry,
    model: &PropagationModel,
) -> Result<MultichannelTimeSeries> {
    let contributions = sources
        .iter()
        .map(|source| model.propagate(source, geometry))
        .collect::<Result<Vec<_>>>()?;
    let series = mix(&contributions)?;
    tracing::info!(
        sources = sources.len(),
        channels = series.num_channels(),
        samples = series.num_samples(),
        "rendered scene"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::PropagationConfig;
    use crate::signal::{SignalGenerator, WhiteNoiseGenerator};
    use sonomap_core::{AcousticConstants, Point3};

    fn set(values: &[&[f32]], sample_rate: f64) -> Vec<Signal> {
        values
            .iter()
            .map(|v| Signal::new(v.to_vec(), sample_rate).unwrap())
            .collect()
    }

    #[test]
    fn sums_per_channel() {
        let a = set(&[&[1.0, 2.0, 3.0], &[0.0, 0.0, 1.0]], 8.0);
        let b = set(&[&[0.5, 0.5, 0.5], &[1.0, 1.0, 1.0]], 8.0);
        let ts = mix(&[a, b]).unwrap();
        assert_eq!(ts.channel(0), &[1.5, 2.5, 3.5]);
        assert_eq!(ts.channel(1), &[1.0, 1.0, 2.0]);
        assert_eq!(ts.sample_rate(), 8.0);
    }

    #[test]
    fn truncates_to_shortest() {
        let a = set(&[&[1.0, 1.0, 1.0, 1.0]], 8.0);
        let b = set(&[&[1.0, 1.0]], 8.0);
        let ts = mix(&[a, b]).unwrap();
        assert_eq!(ts.num_samples(), 2);
    }

    #[test]
    fn order_independent() {
        let a = set(&[&[0.1, 0.2, 0.3], &[1e-3, 1e3, -7.0]], 8.0);
        let b = set(&[&[0.7, -0.2, 0.9], &[5e-4, -1e3, 7.5]], 8.0);
        let ab = mix(&[a.clone(), b.clone()]).unwrap();
        let ba = mix(&[b, a]).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn mismatches_rejected() {
        let a = set(&[&[1.0], &[1.0]], 8.0);
        let b = set(&[&[1.0]], 8.0);
        assert!(matches!(mix(&[a.clone(), b]), Err(Error::ShapeMismatch(_))));

        let c = set(&[&[1.0], &[1.0]], 16.0);
        assert!(matches!(mix(&[a, c]), Err(Error::ShapeMismatch(_))));

        assert!(matches!(mix(&[]), Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn render_two_sources() {
        let geom = ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).unwrap();
        let model = PropagationModel::new(AcousticConstants::AIR, PropagationConfig::default());
        let s1 = WhiteNoiseGenerator::new(22050.0, 2048, 1, 0.5).generate().unwrap();
        let s2 = WhiteNoiseGenerator::new(22050.0, 1024, 2, 0.5).generate().unwrap();
        let sources = vec![
            PointSource::new(s1, Point3::new(-1.0, -1.0, 1.0)),
            PointSource::new(s2, Point3::new(0.0, 1.0, 40.0)),
        ];
        let ts = render(&sources, &geom, &model).unwrap();
        assert_eq!(ts.num_channels(), 9);
        assert_eq!(ts.num_samples(), 1024);
        assert!(ts.check_channels(&geom).is_ok());
    }
}
