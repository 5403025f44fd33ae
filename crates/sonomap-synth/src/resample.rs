//! Rational sample-rate conversion for external waveforms.
//!
//! Waveforms loaded from disk are brought to the scene rate with a polyphase
//! windowed-sinc resampler: the rate ratio is reduced to `P/Q`, a single
//! Blackman-windowed lowpass prototype is designed at the upsampled rate,
//! and each output sample is computed from one of its `P` polyphase branches.
//!
//! ```rust
//! use sonomap_synth::{Signal, resample};
//!
//! let tone: Vec<f32> = (0..4410).map(|i| (i as f32 * 0.05).sin()).collect();
//! let wave = Signal::new(tone, 44100.0).unwrap();
//! let half = resample::to_rate(&wave, 22050.0).unwrap();
//! assert_eq!(half.len(), 2205);
//! assert_eq!(half.sample_rate(), 22050.0);
//! ```

use crate::signal::Signal;
use sonomap_core::{Error, Result, check_sample_rate};
use std::f64::consts::PI;

/// Taps per unit of `max(P, Q)` in the default prototype length.
const TAPS_PER_FACTOR: usize = 40;

/// Fraction of the lower Nyquist kept by the prototype lowpass.
const PASSBAND: f64 = 0.9;

/// Windowed-sinc lowpass FIR with a Blackman window and unity DC gain.
///
/// `cutoff` is normalized to the Nyquist frequency and must lie in `(0, 1]`.
pub fn design_lowpass(num_taps: usize, cutoff: f64) -> Vec<f64> {
    if num_taps == 0 {
        return Vec::new();
    }

    let m = num_taps - 1;
    let mut coeffs: Vec<f64> = (0..num_taps)
        .map(|n| {
            let x = n as f64 - m as f64 / 2.0;
            let sinc = if x.abs() < 1e-12 {
                cutoff
            } else {
                (PI * cutoff * x).sin() / (PI * x)
            };
            let window = if m == 0 {
                1.0
            } else {
                let phase = 2.0 * PI * n as f64 / m as f64;
                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
            };
            sinc * window
        })
        .collect();

    let sum: f64 = coeffs.iter().sum();
    if sum.abs() > 1e-12 {
        coeffs.iter_mut().for_each(|c| *c /= sum);
    }
    coeffs
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Reduce `to / from` to lowest terms `(P, Q)`.
///
/// Both rates must be whole numbers of Hz.
pub fn rational_factors(from: f64, to: f64) -> Result<(usize, usize)> {
    check_sample_rate(from)?;
    check_sample_rate(to)?;
    for (name, rate) in [("source rate", from), ("target rate", to)] {
        if rate.fract() != 0.0 || rate > u32::MAX as f64 {
            return Err(Error::invalid_parameter(
                name,
                format!("resampling needs a whole number of Hz, got {rate}"),
            ));
        }
    }
    let (from, to) = (from as u64, to as u64);
    let g = gcd(from, to);
    Ok(((to / g) as usize, (from / g) as usize))
}

/// Resample `samples` by the rational factor `p / q`.
///
/// The output holds `ceil(len · P / Q)` samples. The prototype group delay is
/// compensated, so output sample `m` is aligned with input time `m · Q / P`.
/// `num_taps == 0` selects `40 · max(P, Q) + 1` taps.
pub fn resample(samples: &[f32], p: usize, q: usize, num_taps: usize) -> Result<Vec<f32>> {
    if p == 0 || q == 0 {
        return Err(Error::invalid_parameter(
            "resample factor",
            format!("P and Q must be at least 1, got {p}/{q}"),
        ));
    }
    let g = gcd(p as u64, q as u64) as usize;
    let (p, q) = (p / g, q / g);
    if p == 1 && q == 1 {
        return Ok(samples.to_vec());
    }

    let num_taps = if num_taps == 0 {
        TAPS_PER_FACTOR * p.max(q) + 1
    } else {
        num_taps
    };
    let prototype = design_lowpass(num_taps, PASSBAND / p.max(q) as f64);

    // branch k holds prototype taps k, k + P, k + 2P, ...
    let taps_per_phase = num_taps.div_ceil(p);
    let mut polyphase = vec![vec![0.0f64; taps_per_phase]; p];
    for (tap, &coeff) in prototype.iter().enumerate() {
        polyphase[tap % p][tap / p] = coeff * p as f64;
    }

    let delay = (num_taps - 1) / 2;
    let out_len = (samples.len() * p).div_ceil(q);
    let output = (0..out_len)
        .map(|m| {
            let t = m * q + delay;
            let (n, k) = (t / p, t % p);
            polyphase[k]
                .iter()
                .enumerate()
                .take(n + 1)
                .filter_map(|(i, &c)| samples.get(n - i).map(|&x| c * f64::from(x)))
                .sum::<f64>() as f32
        })
        .collect();
    Ok(output)
}

/// Resample a signal to `target_rate`, returning it unchanged when the rates agree.
pub fn to_rate(signal: &Signal, target_rate: f64) -> Result<Signal> {
    if signal.sample_rate() == target_rate {
        return Ok(signal.clone());
    }
    let (p, q) = rational_factors(signal.sample_rate(), target_rate)?;
    tracing::debug!(
        from = signal.sample_rate(),
        to = target_rate,
        p,
        q,
        "resampling waveform"
    );
    Signal::new(resample(signal.samples(), p, q, 0)?, target_rate)
}
