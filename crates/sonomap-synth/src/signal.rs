//! Source signals and the generators that produce them.
//!
//! Every generator is a pure function of its parameters: calling
//! [`SignalGenerator::generate`] twice yields the same samples.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use sonomap_core::{Error, Result, check_sample_rate};
use std::f64::consts::PI;

/// A finite mono sample sequence with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: f64,
}

impl Signal {
    /// Wrap samples, requiring at least one sample and a positive rate.
    pub fn new(samples: Vec<f32>, sample_rate: f64) -> Result<Self> {
        check_sample_rate(sample_rate)?;
        if samples.is_empty() {
            return Err(Error::InvalidSignal(
                "signal must contain at least one sample".to_string(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Sample values.
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed signal.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Root-mean-square amplitude.
    pub fn rms(&self) -> f64 {
        let sum: f64 = self.samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        (sum / self.samples.len() as f64).sqrt()
    }

    /// Consume the signal, returning its samples.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Produces the sample sequence of one source.
pub trait SignalGenerator {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> f64;

    /// Number of samples produced by [`generate`](Self::generate).
    fn num_samples(&self) -> usize;

    /// Produce the full sequence.
    fn generate(&self) -> Result<Signal>;
}

/// Creates a PCG32 generator from a 32-bit seed.
///
/// The seed is duplicated into both halves of the 64-bit state seed.
pub fn create_rng(seed: u32) -> Pcg32 {
    let seed64 = (seed as u64) | ((seed as u64) << 32);
    Pcg32::seed_from_u64(seed64)
}

/// Gaussian white noise with a fixed seed and RMS amplitude.
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteNoiseGenerator {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Number of samples to produce.
    pub num_samples: usize,
    /// RNG seed; equal seeds give equal sequences.
    pub seed: u32,
    /// Target RMS (standard deviation) of the sequence.
    pub rms: f64,
}

impl WhiteNoiseGenerator {
    /// Create a white-noise generator.
    pub fn new(sample_rate: f64, num_samples: usize, seed: u32, rms: f64) -> Self {
        Self {
            sample_rate,
            num_samples,
            seed,
            rms,
        }
    }
}

impl SignalGenerator for WhiteNoiseGenerator {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn generate(&self) -> Result<Signal> {
        if !(self.rms.is_finite() && self.rms >= 0.0) {
            return Err(Error::invalid_parameter(
                "rms",
                format!("must be non-negative, got {}", self.rms),
            ));
        }
        let mut rng = create_rng(self.seed);
        let mut samples = Vec::with_capacity(self.num_samples);

        // Box-Muller, both outputs of each pair are used
        while samples.len() < self.num_samples {
            let u1: f64 = 1.0 - rng.gen_range(0.0..1.0);
            let u2: f64 = rng.gen_range(0.0..1.0);
            let radius = (-2.0 * u1.ln()).sqrt() * self.rms;
            let angle = 2.0 * PI * u2;
            samples.push((radius * angle.cos()) as f32);
            if samples.len() < self.num_samples {
                samples.push((radius * angle.sin()) as f32);
            }
        }

        Signal::new(samples, self.sample_rate)
    }
}

/// Pure tone `amplitude · sin(2πft + phase)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SineGenerator {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Number of samples to produce.
    pub num_samples: usize,
    /// Tone frequency in Hz.
    pub frequency: f64,
    /// Peak amplitude.
    pub amplitude: f64,
    /// Initial phase in radians.
    pub phase: f64,
}

impl SineGenerator {
    /// Create a sine generator with zero initial phase.
    pub fn new(sample_rate: f64, num_samples: usize, frequency: f64, amplitude: f64) -> Self {
        Self {
            sample_rate,
            num_samples,
            frequency,
            amplitude,
            phase: 0.0,
        }
    }
}

impl SignalGenerator for SineGenerator {
    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn generate(&self) -> Result<Signal> {
        check_sample_rate(self.sample_rate)?;
        let w = 2.0 * PI * self.frequency / self.sample_rate;
        let samples = (0..self.num_samples)
            .map(|i| (self.amplitude * (w * i as f64 + self.phase).sin()) as f32)
            .collect();
        Signal::new(samples, self.sample_rate)
    }
}

/// Serves a pre-loaded external waveform.
///
/// Requesting more samples than the waveform holds fails with
/// [`Error::SourceExhausted`].
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformGenerator {
    waveform: Signal,
    num_samples: usize,
}

impl WaveformGenerator {
    /// Serve the whole waveform.
    pub fn new(waveform: Signal) -> Self {
        let num_samples = waveform.len();
        Self {
            waveform,
            num_samples,
        }
    }

    /// Serve the first `num_samples` samples of the waveform.
    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    /// Number of samples held by the wrapped waveform.
    pub fn available(&self) -> usize {
        self.waveform.len()
    }
}

impl SignalGenerator for WaveformGenerator {
    fn sample_rate(&self) -> f64 {
        self.waveform.sample_rate()
    }

    fn num_samples(&self) -> usize {
        self.num_samples
    }

    fn generate(&self) -> Result<Signal> {
        if self.num_samples > self.waveform.len() {
            return Err(Error::SourceExhausted {
                requested: self.num_samples,
                available: self.waveform.len(),
            });
        }
        Signal::new(
            self.waveform.samples()[..self.num_samples].to_vec(),
            self.waveform.sample_rate(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_noise_is_reproducible() {
        let a = WhiteNoiseGenerator::new(22050.0, 1000, 1, 0.5).generate().unwrap();
        let b = WhiteNoiseGenerator::new(22050.0, 1000, 1, 0.5).generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn white_noise_seeds_differ() {
        let a = WhiteNoiseGenerator::new(22050.0, 1000, 1, 0.5).generate().unwrap();
        let b = WhiteNoiseGenerator::new(22050.0, 1000, 2, 0.5).generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn white_noise_rms_matches_target() {
        let s = WhiteNoiseGenerator::new(22050.0, 22050, 1, 0.5).generate().unwrap();
        assert_eq!(s.len(), 22050);
        assert!((s.rms() - 0.5).abs() < 0.02, "rms = {}", s.rms());

        let mean: f64 = s.samples().iter().map(|&x| f64::from(x)).sum::<f64>() / s.len() as f64;
        assert!(mean.abs() < 0.02, "mean = {mean}");
    }

    #[test]
    fn white_noise_odd_length() {
        let s = WhiteNoiseGenerator::new(8000.0, 7, 3, 1.0).generate().unwrap();
        assert_eq!(s.len(), 7);
    }

    #[test]
    fn white_noise_zero_samples_is_invalid() {
        let err = WhiteNoiseGenerator::new(8000.0, 0, 3, 1.0).generate().unwrap_err();
        assert!(matches!(err, Error::InvalidSignal(_)));
    }

    #[test]
    fn sine_rms() {
        let s = SineGenerator::new(48000.0, 48000, 1000.0, 1.0).generate().unwrap();
        assert!((s.rms() - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn waveform_exhaustion() {
        let wave = Signal::new(vec![0.1; 100], 22050.0).unwrap();
        let generator = WaveformGenerator::new(wave).with_num_samples(150);
        assert_eq!(
            generator.generate().unwrap_err(),
            Error::SourceExhausted {
                requested: 150,
                available: 100
            }
        );
    }

    #[test]
    fn waveform_prefix() {
        let wave = Signal::new((0..10).map(|i| i as f32).collect(), 8.0).unwrap();
        let generator = WaveformGenerator::new(wave.clone());
        assert_eq!(generator.generate().unwrap(), wave);

        let s = generator.with_num_samples(4).generate().unwrap();
        assert_eq!(s.samples(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(s.sample_rate(), 8.0);
    }

    #[test]
    fn signal_rejects_bad_rate() {
        assert!(Signal::new(vec![0.0], 0.0).is_err());
        assert!(Signal::new(vec![0.0], f64::INFINITY).is_err());
    }
}
