//! Block-averaged cross-spectral matrices (Welch's method across channels).
//!
//! The time series is cut into windowed blocks of `block_size` samples. For
//! every one-sided frequency bin the outer products `X Xᴴ` of the per-channel
//! spectra are averaged over blocks with a running mean.
//!
//! # Scaling
//!
//! Each matrix is scaled by `2 / (B · Σw²)` (`1 / (B · Σw²)` at DC and
//! Nyquist), so a diagonal entry is the mean-square pressure in that bin and
//! the diagonal summed over all bins equals the channel's mean square.
//!
//! # Parallelism
//!
//! Blocks are transformed in parallel, in chunks of [`BLOCK_CHUNK`], and the
//! running mean then folds each chunk in ascending block order. The result is
//! identical for every thread count.

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use sonomap_core::{Error, MultichannelTimeSeries, Result};
use std::ops::Range;

use crate::fft::{Fft, Window, fftfreq};

/// Number of blocks transformed per parallel batch.
pub const BLOCK_CHUNK: usize = 64;

/// Hermitian `n × n` matrix for one frequency bin, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSpectralMatrix {
    size: usize,
    data: Vec<Complex<f64>>,
}

impl CrossSpectralMatrix {
    /// All-zero matrix.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            data: vec![Complex::new(0.0, 0.0); size * size],
        }
    }

    /// Build from row-major data. The caller guarantees Hermitian symmetry.
    pub fn from_row_major(size: usize, data: Vec<Complex<f64>>) -> Result<Self> {
        if data.len() != size * size {
            return Err(Error::ShapeMismatch(format!(
                "{} entries cannot form a {size}x{size} matrix",
                data.len()
            )));
        }
        Ok(Self { size, data })
    }

    /// Rank-one matrix `a aᴴ` scaled by `power`.
    pub fn outer(a: &[Complex<f64>], power: f64) -> Self {
        let n = a.len();
        let mut data = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                data.push(a[i] * a[j].conj() * power);
            }
        }
        Self { size: n, data }
    }

    /// Matrix dimension (number of microphones).
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Entry `(i, j)`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Complex<f64> {
        self.data[i * self.size + j]
    }

    /// Row-major entries.
    #[inline]
    pub fn as_slice(&self) -> &[Complex<f64>] {
        &self.data
    }

    /// Auto-spectra on the diagonal.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.size).map(|i| self.get(i, i).re).collect()
    }

    /// Sum of the auto-spectra.
    pub fn trace(&self) -> f64 {
        self.diagonal().iter().sum()
    }

    /// True if every entry is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|c| c.re == 0.0 && c.im == 0.0)
    }

    /// True if `M[i][j] == conj(M[j][i])` within `tolerance`.
    pub fn is_hermitian(&self, tolerance: f64) -> bool {
        for i in 0..self.size {
            for j in i..self.size {
                if (self.get(i, j) - self.get(j, i).conj()).norm() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    /// Quadratic form `hᴴ M h` (real for a Hermitian matrix).
    pub fn quadratic_form(&self, h: &[Complex<f64>]) -> f64 {
        let n = self.size;
        let mut acc = Complex::new(0.0, 0.0);
        for i in 0..n {
            let mut row = Complex::new(0.0, 0.0);
            for j in 0..n {
                row += self.data[i * n + j] * h[j];
            }
            acc += h[i].conj() * row;
        }
        acc.re
    }

    fn fold_block(&mut self, spectra: &[Vec<Complex<f64>>], bin: usize, count: usize) {
        // Running mean over the upper triangle, mirrored in `finish`
        let n = self.size;
        let inv = 1.0 / count as f64;
        for i in 0..n {
            let xi = spectra[i][bin];
            for j in i..n {
                let x = xi * spectra[j][bin].conj();
                let m = &mut self.data[i * n + j];
                *m += (x - *m) * inv;
            }
        }
    }

    fn finish(&mut self, scale: f64) {
        let n = self.size;
        for i in 0..n {
            let d = &mut self.data[i * n + i];
            *d = Complex::new(d.re * scale, 0.0);
            for j in i + 1..n {
                let upper = self.data[i * n + j] * scale;
                self.data[i * n + j] = upper;
                self.data[j * n + i] = upper.conj();
            }
        }
    }
}

/// Spectral estimation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectraConfig {
    /// Samples per FFT block; even and at least 2.
    pub block_size: usize,
    /// Window applied to each block.
    pub window: Window,
    /// Fraction of each block shared with the next, in `[0, 1)`.
    pub overlap: f64,
    /// Restrict estimation to these bin indices; others stay zero.
    pub bin_range: Option<Range<usize>>,
}

impl Default for SpectraConfig {
    fn default() -> Self {
        Self {
            block_size: 128,
            window: Window::Hann,
            overlap: 0.0,
            bin_range: None,
        }
    }
}

impl SpectraConfig {
    /// Settings with the given block size and window, no overlap.
    pub fn new(block_size: usize, window: Window) -> Self {
        Self {
            block_size,
            window,
            ..Self::default()
        }
    }

    /// Set the block overlap fraction.
    pub fn with_overlap(mut self, overlap: f64) -> Self {
        self.overlap = overlap;
        self
    }

    /// Only estimate bins in `range`.
    pub fn with_bin_range(mut self, range: Range<usize>) -> Self {
        self.bin_range = Some(range);
        self
    }

    /// Validate block size and overlap.
    pub fn validate(&self) -> Result<()> {
        if self.block_size < 2 || self.block_size % 2 != 0 {
            return Err(Error::invalid_parameter(
                "block_size",
                format!("must be even and at least 2, got {}", self.block_size),
            ));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(Error::invalid_parameter(
                "overlap",
                format!("must be in [0, 1), got {}", self.overlap),
            ));
        }
        if let Some(range) = &self.bin_range
            && (range.start >= range.end || range.end > self.block_size / 2 + 1)
        {
            return Err(Error::invalid_parameter(
                "bin_range",
                format!(
                    "{}..{} is not a non-empty range within 0..{}",
                    range.start,
                    range.end,
                    self.block_size / 2 + 1
                ),
            ));
        }
        Ok(())
    }

    /// Hop between block starts in samples.
    pub fn hop(&self) -> usize {
        ((self.block_size as f64 * (1.0 - self.overlap)).round() as usize).max(1)
    }

    /// Number of complete blocks in `num_samples` samples.
    pub fn num_blocks(&self, num_samples: usize) -> usize {
        if num_samples < self.block_size {
            0
        } else {
            (num_samples - self.block_size) / self.hop() + 1
        }
    }
}

/// Cross-spectral matrices for every one-sided frequency bin.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSpectra {
    matrices: Vec<CrossSpectralMatrix>,
    frequencies: Vec<f64>,
    bin_range: Range<usize>,
    sample_rate: f64,
    block_size: usize,
    num_blocks: usize,
}

impl CrossSpectra {
    /// Assemble spectra from precomputed matrices, one per bin `0..=B/2`.
    pub fn from_matrices(
        matrices: Vec<CrossSpectralMatrix>,
        block_size: usize,
        sample_rate: f64,
    ) -> Result<Self> {
        let frequencies = fftfreq(block_size, sample_rate);
        if matrices.len() != frequencies.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} matrices for {} frequency bins",
                matrices.len(),
                frequencies.len()
            )));
        }
        let n = matrices[0].size();
        if matrices.iter().any(|m| m.size() != n) {
            return Err(Error::ShapeMismatch(
                "cross-spectral matrices differ in size".to_string(),
            ));
        }
        Ok(Self {
            bin_range: 0..matrices.len(),
            matrices,
            frequencies,
            sample_rate,
            block_size,
            num_blocks: 0,
        })
    }

    /// Number of frequency bins (`block_size / 2 + 1`).
    #[inline]
    pub fn num_bins(&self) -> usize {
        self.matrices.len()
    }

    /// Number of channels (matrix dimension).
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.matrices[0].size()
    }

    /// Matrix of bin `k`.
    #[inline]
    pub fn matrix(&self, k: usize) -> &CrossSpectralMatrix {
        &self.matrices[k]
    }

    /// All matrices in bin order.
    #[inline]
    pub fn matrices(&self) -> &[CrossSpectralMatrix] {
        &self.matrices
    }

    /// Bin centre frequencies in Hz.
    #[inline]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Bin spacing in Hz.
    #[inline]
    pub fn bin_width(&self) -> f64 {
        self.sample_rate / self.block_size as f64
    }

    /// Bins that were estimated.
    #[inline]
    pub fn bin_range(&self) -> Range<usize> {
        self.bin_range.clone()
    }

    /// Sample rate of the analysed data.
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// FFT block size.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of averaged blocks.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Bins making up a synthesis band around `frequency`.
    ///
    /// `fraction == 0` selects the single bin nearest `frequency`;
    /// `fraction == n` selects the `1/n`-octave band
    /// `[f·2^(−1/2n), f·2^(1/2n))`. Only estimated bins count. Fails with
    /// [`Error::EmptyBand`] when no bin qualifies.
    pub fn band_bins(&self, frequency: f64, fraction: u32) -> Result<Range<usize>> {
        let df = self.bin_width();
        let (low, high) = band_edges(frequency, fraction);
        let range = if fraction == 0 {
            let nyquist = self.frequencies[self.frequencies.len() - 1];
            if !(frequency >= 0.0 && frequency <= nyquist + 0.5 * df) {
                0..0
            } else {
                let k = (frequency / df).round() as usize;
                k..k + 1
            }
        } else {
            let start = self.frequencies.partition_point(|&f| f < low);
            let end = self.frequencies.partition_point(|&f| f < high);
            start..end
        };

        let start = range.start.max(self.bin_range.start);
        let end = range.end.min(self.bin_range.end);
        if start >= end {
            return Err(Error::EmptyBand {
                low_hz: low,
                high_hz: high,
            });
        }
        Ok(start..end)
    }
}

/// Band edges used by [`CrossSpectra::band_bins`].
pub fn band_edges(frequency: f64, fraction: u32) -> (f64, f64) {
    if fraction == 0 {
        (frequency, frequency)
    } else {
        let half = 0.5 / fraction as f64;
        (frequency * 2.0_f64.powf(-half), frequency * 2.0_f64.powf(half))
    }
}

/// Estimates [`CrossSpectra`] from multichannel recordings.
#[derive(Debug, Clone)]
pub struct SpectralEstimator {
    config: SpectraConfig,
    fft: Fft,
    window: Vec<f64>,
}

impl SpectralEstimator {
    /// Create an estimator, validating the settings.
    pub fn new(config: SpectraConfig) -> Result<Self> {
        config.validate()?;
        let fft = Fft::new(config.block_size);
        let window = config.window.coefficients(config.block_size);
        Ok(Self {
            config,
            fft,
            window,
        })
    }

    /// Settings in use.
    pub fn config(&self) -> &SpectraConfig {
        &self.config
    }

    /// Per-bin scale factors turning averaged `X Xᴴ` into mean-square power.
    fn bin_scales(&self) -> Vec<f64> {
        let b = self.config.block_size;
        let sum_w2: f64 = self.window.iter().map(|w| w * w).sum();
        let base = 1.0 / (b as f64 * sum_w2);
        (0..=b / 2)
            .map(|k| if k == 0 || k == b / 2 { base } else { 2.0 * base })
            .collect()
    }

    fn block_spectra(&self, series: &MultichannelTimeSeries, start: usize) -> Vec<Vec<Complex<f64>>> {
        let b = self.config.block_size;
        series
            .channels()
            .iter()
            .map(|ch| {
                let block: Vec<f64> = ch[start..start + b]
                    .iter()
                    .zip(&self.window)
                    .map(|(&x, &w)| f64::from(x) * w)
                    .collect();
                self.fft.forward(&block)
            })
            .collect()
    }

    /// Estimate one cross-spectral matrix per bin.
    ///
    /// Fails with [`Error::InsufficientData`] when the series is shorter than
    /// one block.
    pub fn estimate(&self, series: &MultichannelTimeSeries) -> Result<CrossSpectra> {
        let b = self.config.block_size;
        let num_samples = series.num_samples();
        let num_blocks = self.config.num_blocks(num_samples);
        if num_blocks == 0 {
            return Err(Error::InsufficientData {
                available: num_samples,
                required: b,
            });
        }

        let num_channels = series.num_channels();
        let num_bins = b / 2 + 1;
        let bin_range = self.config.bin_range.clone().unwrap_or(0..num_bins);
        let hop = self.config.hop();

        tracing::debug!(
            channels = num_channels,
            blocks = num_blocks,
            bins = num_bins,
            block_size = b,
            hop,
            window = self.config.window.name(),
            "estimating cross-spectral matrices"
        );

        let mut matrices = vec![CrossSpectralMatrix::zeros(num_channels); num_bins];
        let mut folded = 0;
        while folded < num_blocks {
            let chunk_end = (folded + BLOCK_CHUNK).min(num_blocks);
            let spectra: Vec<Vec<Vec<Complex<f64>>>> = (folded..chunk_end)
                .into_par_iter()
                .map(|block| self.block_spectra(series, block * hop))
                .collect();

            matrices[bin_range.clone()]
                .par_iter_mut()
                .zip(bin_range.clone())
                .for_each(|(matrix, bin)| {
                    for (offset, block) in spectra.iter().enumerate() {
                        matrix.fold_block(block, bin, folded + offset + 1);
                    }
                });
            folded = chunk_end;
        }

        let scales = self.bin_scales();
        for (matrix, scale) in matrices.iter_mut().zip(scales) {
            matrix.finish(scale);
        }

        Ok(CrossSpectra {
            matrices,
            frequencies: fftfreq(b, series.sample_rate()),
            bin_range,
            sample_rate: series.sample_rate(),
            block_size: b,
            num_blocks,
        })
    }
}
