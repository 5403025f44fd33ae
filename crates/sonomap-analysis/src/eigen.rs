//! Hermitian eigen-decomposition and fractional matrix powers.
//!
//! Uses the cyclic Jacobi method directly on complex entries. Each rotation
//! first removes the phase of the pivot `a_pq`, then applies the real Jacobi
//! rotation that zeroes it. That is adequate for the tens of microphones of a
//! typical array.
//!
//! ```rust
//! use rustfft::num_complex::Complex;
//! use sonomap_analysis::eigen::HermitianEigen;
//!
//! let m = vec![
//!     Complex::new(2.0, 0.0), Complex::new(0.0, 1.0),
//!     Complex::new(0.0, -1.0), Complex::new(2.0, 0.0),
//! ];
//! let eig = HermitianEigen::decompose(&m, 2);
//! let mut values = eig.values().to_vec();
//! values.sort_by(f64::total_cmp);
//! assert!((values[0] - 1.0).abs() < 1e-12);
//! assert!((values[1] - 3.0).abs() < 1e-12);
//! ```

use rustfft::num_complex::Complex;

use crate::spectra::CrossSpectralMatrix;

/// Maximum number of full Jacobi sweeps.
pub const MAX_SWEEPS: usize = 100;

/// Sweeps stop once the off-diagonal norm falls below this fraction of the
/// matrix norm.
pub const CONVERGENCE_TOLERANCE: f64 = 1e-14;

/// Eigenvalues relative to the largest below which clamping applies.
pub const RELATIVE_EIGENVALUE_FLOOR: f64 = 1e-12;

/// Eigenvalues and eigenvectors of a Hermitian matrix.
#[derive(Debug, Clone)]
pub struct HermitianEigen {
    size: usize,
    values: Vec<f64>,
    // Row-major; column k is the eigenvector of values[k]
    vectors: Vec<Complex<f64>>,
    sweeps: usize,
}

impl HermitianEigen {
    /// Decompose a Hermitian `size × size` matrix given in row-major order.
    ///
    /// Only Hermitian input is meaningful; the strictly lower triangle is
    /// assumed to mirror the upper one.
    pub fn decompose(matrix: &[Complex<f64>], size: usize) -> Self {
        let n = size;
        let mut a = matrix.to_vec();
        let mut v = vec![Complex::new(0.0, 0.0); n * n];
        for i in 0..n {
            v[i * n + i] = Complex::new(1.0, 0.0);
            a[i * n + i] = Complex::new(a[i * n + i].re, 0.0);
        }

        let total: f64 = a.iter().map(|c| c.norm_sqr()).sum::<f64>().sqrt();
        let mut sweeps = 0;
        while sweeps < MAX_SWEEPS {
            let off = off_diagonal_norm(&a, n);
            if off <= CONVERGENCE_TOLERANCE * total || off == 0.0 {
                break;
            }
            sweeps += 1;
            for p in 0..n {
                for q in p + 1..n {
                    rotate(&mut a, &mut v, n, p, q);
                }
            }
        }

        let values = (0..n).map(|i| a[i * n + i].re).collect();
        Self {
            size: n,
            values,
            vectors: v,
            sweeps,
        }
    }

    /// Decompose a cross-spectral matrix.
    pub fn of_matrix(matrix: &CrossSpectralMatrix) -> Self {
        Self::decompose(matrix.as_slice(), matrix.size())
    }

    /// Eigenvalues, unsorted, in the order of the eigenvector columns.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Component `i` of eigenvector `k`.
    #[inline]
    pub fn vector_component(&self, i: usize, k: usize) -> Complex<f64> {
        self.vectors[i * self.size + k]
    }

    /// Jacobi sweeps performed.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Largest eigenvalue.
    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Rebuild `V · diag(f(λ)) · Vᴴ` in row-major order.
    pub fn reconstruct_with(&self, f: impl Fn(f64) -> f64) -> Vec<Complex<f64>> {
        let n = self.size;
        let mapped: Vec<f64> = self.values.iter().map(|&l| f(l)).collect();
        let mut out = vec![Complex::new(0.0, 0.0); n * n];
        for i in 0..n {
            for j in i..n {
                let mut acc = Complex::new(0.0, 0.0);
                for k in 0..n {
                    acc += self.vector_component(i, k) * self.vector_component(j, k).conj() * mapped[k];
                }
                out[i * n + j] = acc;
                out[j * n + i] = acc.conj();
            }
            out[i * n + i].im = 0.0;
        }
        out
    }
}

/// Result of [`fractional_power`].
#[derive(Debug, Clone)]
pub struct FractionalPower {
    /// `C^exponent`, Hermitian.
    pub matrix: CrossSpectralMatrix,
    /// Eigenvalues raised to the floor before exponentiation.
    pub clamped: usize,
}

/// Raise a Hermitian positive semi-definite matrix to a real power.
///
/// Eigenvalues below `max(λ_max · 1e-12, f64::MIN_POSITIVE)` (including small
/// negative values from rounding) are clamped to that floor before raising, so
/// the result is always finite and Hermitian. An all-zero matrix yields an
/// all-zero result without clamping.
pub fn fractional_power(matrix: &CrossSpectralMatrix, exponent: f64) -> FractionalPower {
    let n = matrix.size();
    if matrix.is_zero() {
        return FractionalPower {
            matrix: CrossSpectralMatrix::zeros(n),
            clamped: 0,
        };
    }
    let eig = HermitianEigen::of_matrix(matrix);
    let max = eig.max_value();
    if max.is_nan() || max <= 0.0 {
        return FractionalPower {
            matrix: CrossSpectralMatrix::zeros(n),
            clamped: 0,
        };
    }
    let floor = (max * RELATIVE_EIGENVALUE_FLOOR).max(f64::MIN_POSITIVE);
    let clamped = eig.values().iter().filter(|&&l| l < floor).count();
    let data = eig.reconstruct_with(|l| l.max(floor).powf(exponent));
    FractionalPower {
        matrix: CrossSpectralMatrix::from_row_major(n, data)
            .unwrap_or_else(|_| CrossSpectralMatrix::zeros(n)),
        clamped,
    }
}

fn off_diagonal_norm(a: &[Complex<f64>], n: usize) -> f64 {
    let mut sum = 0.0;
    for i in 0..n {
        for j in i + 1..n {
            sum += 2.0 * a[i * n + j].norm_sqr();
        }
    }
    sum.sqrt()
}

/// Zero `a[p][q]` with the unitary `G = diag(1, e^{-iφ}) · R(θ)` on (p, q).
fn rotate(a: &mut [Complex<f64>], v: &mut [Complex<f64>], n: usize, p: usize, q: usize) {
    let apq = a[p * n + q];
    let magnitude = apq.norm();
    if magnitude == 0.0 {
        return;
    }
    let phase = apq / magnitude;
    let app = a[p * n + p].re;
    let aqq = a[q * n + q].re;

    let theta = (aqq - app) / (2.0 * magnitude);
    let t = if theta.abs() > 1e150 {
        0.5 / theta
    } else {
        theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
    };
    // signum(0.0) is 1.0 in Rust, so t = 1 for equal diagonals
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    // Entries of G on the (p, q) block
    let g_pp = Complex::new(c, 0.0);
    let g_pq = Complex::new(s, 0.0);
    let g_qp = -phase.conj() * s;
    let g_qq = phase.conj() * c;

    // A ← A G (columns p and q)
    for k in 0..n {
        let akp = a[k * n + p];
        let akq = a[k * n + q];
        a[k * n + p] = akp * g_pp + akq * g_qp;
        a[k * n + q] = akp * g_pq + akq * g_qq;
    }
    // A ← Gᴴ A (rows p and q)
    for k in 0..n {
        let apk = a[p * n + k];
        let aqk = a[q * n + k];
        a[p * n + k] = g_pp.conj() * apk + g_qp.conj() * aqk;
        a[q * n + k] = g_pq.conj() * apk + g_qq.conj() * aqk;
    }
    a[p * n + q] = Complex::new(0.0, 0.0);
    a[q * n + p] = Complex::new(0.0, 0.0);
    a[p * n + p].im = 0.0;
    a[q * n + q].im = 0.0;

    // V ← V G
    for k in 0..n {
        let vkp = v[k * n + p];
        let vkq = v[k * n + q];
        v[k * n + p] = vkp * g_pp + vkq * g_qp;
        v[k * n + q] = vkp * g_pq + vkq * g_qq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    /// Deterministic Hermitian PSD matrix `B Bᴴ`.
    fn random_psd(n: usize, seed: u64) -> Vec<Complex<f64>> {
        let mut state = seed.max(1);
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64 / u64::MAX as f64) * 2.0 - 1.0
        };
        let b: Vec<Complex<f64>> = (0..n * n).map(|_| c(next(), next())).collect();
        let mut m = vec![c(0.0, 0.0); n * n];
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    m[i * n + j] += b[i * n + k] * b[j * n + k].conj();
                }
            }
        }
        m
    }

    fn max_diff(a: &[Complex<f64>], b: &[Complex<f64>]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn reconstructs_input() {
        for n in [1, 2, 5, 9, 16] {
            let m = random_psd(n, 42 + n as u64);
            let eig = HermitianEigen::decompose(&m, n);
            let back = eig.reconstruct_with(|l| l);
            let scale = m.iter().map(|x| x.norm()).fold(0.0, f64::max);
            assert!(
                max_diff(&m, &back) < 1e-10 * scale.max(1.0),
                "n = {n}: diff {}",
                max_diff(&m, &back)
            );
            assert!(eig.values().iter().all(|&l| l > -1e-9 * scale));
        }
    }

    #[test]
    fn eigenvectors_are_orthonormal() {
        let n = 6;
        let eig = HermitianEigen::decompose(&random_psd(n, 7), n);
        for a in 0..n {
            for b in 0..n {
                let mut dot = c(0.0, 0.0);
                for i in 0..n {
                    dot += eig.vector_component(i, a).conj() * eig.vector_component(i, b);
                }
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - c(expected, 0.0)).norm() < 1e-10);
            }
        }
    }

    #[test]
    fn square_root_squares_back() {
        let n = 4;
        let m = CrossSpectralMatrix::from_row_major(n, random_psd(n, 3)).unwrap();
        let root = fractional_power(&m, 0.5).matrix;
        let r = root.as_slice();
        let mut sq = vec![c(0.0, 0.0); n * n];
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    sq[i * n + j] += r[i * n + k] * r[k * n + j];
                }
            }
        }
        assert!(max_diff(m.as_slice(), &sq) < 1e-9);
        assert!(root.is_hermitian(1e-12));
    }

    #[test]
    fn rank_one_matrix_clamps_null_space() {
        let a = vec![c(1.0, 0.0), c(0.0, 1.0), c(-1.0, 0.0), c(0.5, -0.5)];
        let m = CrossSpectralMatrix::outer(&a, 2.0);
        let result = fractional_power(&m, 1.0 / 50.0);
        assert_eq!(result.clamped, 3);
        assert!(result.matrix.as_slice().iter().all(|x| x.re.is_finite() && x.im.is_finite()));
    }

    #[test]
    fn zero_matrix_is_zero() {
        let result = fractional_power(&CrossSpectralMatrix::zeros(3), 0.02);
        assert_eq!(result.clamped, 0);
        assert!(result.matrix.is_zero());
    }

    #[test]
    fn diagonal_matrix_converges_immediately() {
        let m = vec![c(3.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(1.0, 0.0)];
        let eig = HermitianEigen::decompose(&m, 2);
        assert_eq!(eig.sweeps(), 0);
        assert_eq!(eig.values(), &[3.0, 1.0]);
    }
}
