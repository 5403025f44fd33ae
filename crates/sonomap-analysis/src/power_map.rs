//! Beamforming output on a scan grid.

use sonomap_core::{AcousticConstants, Error, Point3, ScanGrid};

/// Eigenvalue clamping statistics collected while beamforming.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeamformDiagnostics {
    /// Frequency bins evaluated.
    pub bins_evaluated: usize,
    /// Bins whose matrix needed at least one eigenvalue clamp.
    pub ill_conditioned_bins: usize,
    /// Total eigenvalues clamped across all bins.
    pub clamped_eigenvalues: usize,
}

impl BeamformDiagnostics {
    /// Record one bin with `clamped` clamped eigenvalues.
    pub fn record_bin(&mut self, clamped: usize) {
        self.bins_evaluated += 1;
        if clamped > 0 {
            self.ill_conditioned_bins += 1;
            self.clamped_eigenvalues += clamped;
        }
    }

    /// Combine the counts of two runs.
    pub fn merge(&mut self, other: &BeamformDiagnostics) {
        self.bins_evaluated += other.bins_evaluated;
        self.ill_conditioned_bins += other.ill_conditioned_bins;
        self.clamped_eigenvalues += other.clamped_eigenvalues;
    }

    /// The clamping condition as an [`Error::IllConditionedMatrix`] value, if any.
    pub fn as_warning(&self) -> Option<Error> {
        (self.ill_conditioned_bins > 0).then_some(Error::IllConditionedMatrix {
            bins: self.ill_conditioned_bins,
            clamped: self.clamped_eigenvalues,
        })
    }
}

/// Band-integrated power for every point of a [`ScanGrid`].
///
/// Values are mean-square pressures in Pa², stored in the grid's flat-index
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerMap {
    grid: ScanGrid,
    values: Vec<f64>,
    center_frequency: f64,
    band: (f64, f64),
    diagnostics: BeamformDiagnostics,
}

impl PowerMap {
    pub(crate) fn new(
        grid: ScanGrid,
        values: Vec<f64>,
        center_frequency: f64,
        band: (f64, f64),
        diagnostics: BeamformDiagnostics,
    ) -> Self {
        debug_assert_eq!(grid.len(), values.len());
        Self {
            grid,
            values,
            center_frequency,
            band,
            diagnostics,
        }
    }

    /// The grid the map was computed on.
    pub fn grid(&self) -> &ScanGrid {
        &self.grid
    }

    /// Power per grid point in flat-index order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Requested centre frequency in Hz.
    pub fn center_frequency(&self) -> f64 {
        self.center_frequency
    }

    /// Frequencies `(low, high)` of the first and last bin summed.
    pub fn band(&self) -> (f64, f64) {
        self.band
    }

    /// Eigenvalue clamping statistics.
    pub fn diagnostics(&self) -> &BeamformDiagnostics {
        &self.diagnostics
    }

    /// Power at cell `(ix, iy, iz)`.
    pub fn get(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        self.values[self.grid.flat_index(ix, iy, iz)]
    }

    /// Flat index, position and power of the strongest grid point.
    ///
    /// Ties resolve to the lowest index.
    pub fn peak(&self) -> (usize, Point3, f64) {
        let (index, power) = self
            .values
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
                if v > best.1 { (i, v) } else { best }
            });
        (index, self.grid.point(index), power)
    }

    /// Sum of all values.
    pub fn total_power(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Sound-pressure levels in dB, same layout as [`values`](Self::values).
    pub fn to_level_db(&self, constants: &AcousticConstants) -> Vec<f64> {
        self.values.iter().map(|&p| constants.level_db(p)).collect()
    }

    /// Planar view as rows of constant y, columns of increasing x.
    ///
    /// For a 3D grid the first z plane is returned.
    pub fn as_2d(&self) -> Vec<Vec<f64>> {
        let (nx, ny, _) = self.grid.shape();
        (0..ny)
            .map(|iy| (0..nx).map(|ix| self.get(ix, iy, 0)).collect())
            .collect()
    }
}
