//! Steering vectors for a microphone array and a scan grid.
//!
//! For a grid point `g`, microphone distances `r_m = |g − x_m|` and reference
//! distance `r_0 = |g − ref|`, the steering vector is
//!
//! ```text
//! h_m = w_m · exp(−j k (r_m − r_0)),   k = 2πf / c
//! ```
//!
//! where the amplitude weights `w_m` depend on the [`SteeringFormulation`].
//! The phase term matches the `r/c` delay applied by propagation together with
//! the FFT sign convention, so a source on a grid point adds coherently.

use rustfft::num_complex::Complex;
use sonomap_core::{AcousticConstants, ArrayGeometry, Error, Point3, Result, ScanGrid};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Amplitude weighting of the steering vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SteeringFormulation {
    /// Phase only, `w_m = 1/N`.
    #[serde(alias = "i")]
    Classic,
    /// Inverse-distance compensation, `w_m = (r_m/r_0)/N`.
    #[serde(alias = "ii")]
    Inverse,
    /// `w_m = (r_0/r_m) / Σ(r_0/r_m)²`; reports the level at the reference point.
    #[default]
    #[serde(alias = "true_level", alias = "iii")]
    TrueLevel,
    /// `w_m = (r_0/r_m) / √(N·Σ(r_0/r_m)²)`; sharpest source location.
    #[serde(alias = "true_location", alias = "iv")]
    TrueLocation,
}

impl SteeringFormulation {
    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            SteeringFormulation::Classic => "classic",
            SteeringFormulation::Inverse => "inverse",
            SteeringFormulation::TrueLevel => "true-level",
            SteeringFormulation::TrueLocation => "true-location",
        }
    }

    fn needs_reference_distance(self) -> bool {
        !matches!(self, SteeringFormulation::Classic)
    }
}

impl FromStr for SteeringFormulation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "classic" | "i" => Ok(SteeringFormulation::Classic),
            "inverse" | "ii" => Ok(SteeringFormulation::Inverse),
            "true-level" | "true level" | "iii" => Ok(SteeringFormulation::TrueLevel),
            "true-location" | "true location" | "iv" => Ok(SteeringFormulation::TrueLocation),
            other => Err(Error::invalid_parameter(
                "steering",
                format!("unknown formulation '{other}'"),
            )),
        }
    }
}

/// Write the steering vector for precomputed distances into `out`.
pub fn steering_from_distances(
    formulation: SteeringFormulation,
    mic_distances: &[f64],
    reference_distance: f64,
    wavenumber: f64,
    out: &mut [Complex<f64>],
) {
    let n = mic_distances.len() as f64;
    let r0 = reference_distance;
    let norm = match formulation {
        SteeringFormulation::Classic | SteeringFormulation::Inverse => n,
        SteeringFormulation::TrueLevel => mic_distances.iter().map(|rm| (r0 / rm).powi(2)).sum(),
        SteeringFormulation::TrueLocation => {
            (n * mic_distances.iter().map(|rm| (r0 / rm).powi(2)).sum::<f64>()).sqrt()
        }
    };
    for (h, &rm) in out.iter_mut().zip(mic_distances) {
        let amplitude = match formulation {
            SteeringFormulation::Classic => 1.0,
            SteeringFormulation::Inverse => rm / r0,
            SteeringFormulation::TrueLevel | SteeringFormulation::TrueLocation => r0 / rm,
        } / norm;
        *h = Complex::from_polar(amplitude, -wavenumber * (rm - r0));
    }
}

/// Steering vectors for one array, computed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringVectorField {
    geometry: ArrayGeometry,
    constants: AcousticConstants,
    formulation: SteeringFormulation,
    reference: Point3,
}

impl SteeringVectorField {
    /// Field referenced to the array centroid.
    pub fn new(
        geometry: ArrayGeometry,
        constants: AcousticConstants,
        formulation: SteeringFormulation,
    ) -> Self {
        let reference = geometry.centroid();
        Self {
            geometry,
            constants,
            formulation,
            reference,
        }
    }

    /// Use an explicit reference point instead of the centroid.
    pub fn with_reference(mut self, reference: Point3) -> Self {
        self.reference = reference;
        self
    }

    /// Array geometry.
    pub fn geometry(&self) -> &ArrayGeometry {
        &self.geometry
    }

    /// Formulation in use.
    pub fn formulation(&self) -> SteeringFormulation {
        self.formulation
    }

    /// Reference point for `r_0`.
    pub fn reference(&self) -> Point3 {
        self.reference
    }

    /// Constants in use.
    pub fn constants(&self) -> &AcousticConstants {
        &self.constants
    }

    fn reference_distance(&self, point: &Point3) -> Result<f64> {
        let r0 = point.distance(&self.reference);
        if self.formulation.needs_reference_distance() && r0 < sonomap_core::COINCIDENT_TOLERANCE {
            return Err(Error::DegenerateGeometry(format!(
                "grid point {point} coincides with the reference point"
            )));
        }
        Ok(r0)
    }

    /// Steering vector for a single point and frequency.
    ///
    /// Fails with [`Error::DegenerateGeometry`] if the point sits on a
    /// microphone, or on the reference point for distance-weighted
    /// formulations.
    pub fn steering_vector(&self, point: &Point3, frequency_hz: f64) -> Result<Vec<Complex<f64>>> {
        let rm = self.geometry.distances_from(point)?;
        let r0 = self.reference_distance(point)?;
        let mut out = vec![Complex::new(0.0, 0.0); rm.len()];
        steering_from_distances(
            self.formulation,
            &rm,
            r0,
            self.constants.wavenumber(frequency_hz),
            &mut out,
        );
        Ok(out)
    }

    /// Precompute distances for every point of `grid`.
    pub fn for_grid(&self, grid: &ScanGrid) -> Result<GridSteering> {
        let num_mics = self.geometry.len();
        let mut mic_distances = Vec::with_capacity(grid.len() * num_mics);
        let mut reference_distances = Vec::with_capacity(grid.len());
        for point in grid.points() {
            mic_distances.extend(self.geometry.distances_from(&point)?);
            reference_distances.push(self.reference_distance(&point)?);
        }
        Ok(GridSteering {
            formulation: self.formulation,
            constants: self.constants,
            num_mics,
            mic_distances,
            reference_distances,
        })
    }
}

/// Distances from every grid point to every microphone, ready for steering.
#[derive(Debug, Clone)]
pub struct GridSteering {
    formulation: SteeringFormulation,
    constants: AcousticConstants,
    num_mics: usize,
    mic_distances: Vec<f64>,
    reference_distances: Vec<f64>,
}

impl GridSteering {
    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.reference_distances.len()
    }

    /// True for a grid without points.
    pub fn is_empty(&self) -> bool {
        self.reference_distances.is_empty()
    }

    /// Number of microphones.
    pub fn num_mics(&self) -> usize {
        self.num_mics
    }

    /// Write the steering vector of grid point `index` at `frequency_hz`.
    pub fn fill(&self, index: usize, frequency_hz: f64, out: &mut [Complex<f64>]) {
        let rm = &self.mic_distances[index * self.num_mics..(index + 1) * self.num_mics];
        steering_from_distances(
            self.formulation,
            rm,
            self.reference_distances[index],
            self.constants.wavenumber(frequency_hz),
            out,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(formulation: SteeringFormulation) -> SteeringVectorField {
        let geom = ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).unwrap();
        SteeringVectorField::new(geom, AcousticConstants::AIR, formulation)
    }

    /// Propagation vector `e^{-jk r_m} / r_m` for a unit source at `p`.
    fn propagation(f: &SteeringVectorField, p: &Point3, freq: f64) -> Vec<Complex<f64>> {
        let k = f.constants().wavenumber(freq);
        f.geometry()
            .distances_from(p)
            .unwrap()
            .into_iter()
            .map(|r| Complex::from_polar(1.0 / r, -k * r))
            .collect()
    }

    fn inner(h: &[Complex<f64>], a: &[Complex<f64>]) -> Complex<f64> {
        h.iter().zip(a).map(|(h, a)| h.conj() * a).sum()
    }

    #[test]
    fn classic_is_phase_only() {
        let f = field(SteeringFormulation::Classic);
        let h = f.steering_vector(&Point3::new(0.1, 0.0, 0.5), 2000.0).unwrap();
        assert_eq!(h.len(), 9);
        for c in &h {
            assert!((c.norm() - 1.0 / 9.0).abs() < 1e-12);
        }
    }

    #[test]
    fn true_level_is_calibrated_at_reference() {
        // hᴴa = e^{-jk r0} / r0 for a matching source, so |hᴴa|² = 1 / r0²
        let f = field(SteeringFormulation::TrueLevel);
        let p = Point3::new(0.05, -0.1, 0.3);
        let h = f.steering_vector(&p, 3000.0).unwrap();
        let a = propagation(&f, &p, 3000.0);
        let r0 = p.distance(&f.reference());
        let response = inner(&h, &a).norm_sqr();
        assert!((response * r0 * r0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mismatched_point_responds_less() {
        let f = field(SteeringFormulation::TrueLevel);
        let src = Point3::new(0.0, 0.0, 0.3);
        let a = propagation(&f, &src, 5000.0);
        let on = inner(&f.steering_vector(&src, 5000.0).unwrap(), &a).norm();
        let off = inner(&f.steering_vector(&Point3::new(0.2, 0.2, 0.3), 5000.0).unwrap(), &a)
            .norm();
        assert!(off < on);
    }

    #[test]
    fn true_location_has_unit_norm() {
        let f = field(SteeringFormulation::TrueLocation);
        let h = f.steering_vector(&Point3::new(0.1, 0.1, 0.4), 1000.0).unwrap();
        let norm2: f64 = h.iter().map(|c| c.norm_sqr()).sum();
        // Σ w² = Σ(r0/rm)² / (N Σ(r0/rm)²) = 1/N
        assert!((norm2 - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn grid_matches_pointwise() {
        let f = field(SteeringFormulation::Inverse);
        let grid = ScanGrid::rect(-0.1, 0.1, -0.1, 0.1, 0.3, 0.05).unwrap();
        let gs = f.for_grid(&grid).unwrap();
        assert_eq!(gs.len(), grid.len());
        let mut buf = vec![Complex::new(0.0, 0.0); 9];
        for i in [0, 7, grid.len() - 1] {
            gs.fill(i, 1500.0, &mut buf);
            let direct = f.steering_vector(&grid.point(i), 1500.0).unwrap();
            for (a, b) in buf.iter().zip(&direct) {
                assert!((a - b).norm() < 1e-15);
            }
        }
    }

    #[test]
    fn degenerate_points() {
        let f = field(SteeringFormulation::TrueLevel);
        // Centre microphone is also the centroid
        assert!(matches!(
            f.steering_vector(&Point3::ORIGIN, 1000.0),
            Err(Error::DegenerateGeometry(_))
        ));
        let grid = ScanGrid::rect(-0.1, 0.1, -0.1, 0.1, 0.0, 0.1).unwrap();
        assert!(f.for_grid(&grid).is_err());
    }

    #[test]
    fn formulation_names() {
        for f in [
            SteeringFormulation::Classic,
            SteeringFormulation::Inverse,
            SteeringFormulation::TrueLevel,
            SteeringFormulation::TrueLocation,
        ] {
            assert_eq!(f.name().parse::<SteeringFormulation>().unwrap(), f);
        }
        assert_eq!(
            "true_level".parse::<SteeringFormulation>().unwrap(),
            SteeringFormulation::TrueLevel
        );
        assert!("mvdr".parse::<SteeringFormulation>().is_err());
    }
}
