//! Microphone array geometry.
//!
//! [`ArrayGeometry`] is loaded once and never mutated afterwards; every stage
//! borrows it read-only.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::error::{Error, Result};

/// Positions closer than this (in metres) are treated as coincident.
pub const COINCIDENT_TOLERANCE: f64 = 1e-9;

/// A point in 3D space, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// The coordinate origin.
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Create a point.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// True if all three coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(p: [f64; 3]) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<(f64, f64, f64)> for Point3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4}, {:.4})", self.x, self.y, self.z)
    }
}

/// Ordered microphone positions, one per recorded channel.
///
/// Guaranteed to hold at least one microphone, all positions finite and
/// pairwise distinct.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayGeometry {
    positions: Vec<Point3>,
}

impl ArrayGeometry {
    /// Build a geometry from microphone positions.
    ///
    /// Fails with [`Error::InvalidGeometry`] for an empty list or non-finite
    /// coordinates, and with [`Error::DegenerateGeometry`] if two microphones
    /// coincide.
    pub fn new(positions: Vec<Point3>) -> Result<Self> {
        if positions.is_empty() {
            return Err(Error::InvalidGeometry(
                "array must contain at least one microphone".to_string(),
            ));
        }
        if let Some((i, p)) = positions.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(Error::InvalidGeometry(format!(
                "microphone {i} has non-finite position {p}"
            )));
        }
        for i in 0..positions.len() {
            for j in i + 1..positions.len() {
                if positions[i].distance(&positions[j]) < COINCIDENT_TOLERANCE {
                    return Err(Error::DegenerateGeometry(format!(
                        "microphones {i} and {j} share position {}",
                        positions[i]
                    )));
                }
            }
        }
        Ok(Self { positions })
    }

    /// Planar rectangular array of `nx × ny` microphones centred on the z axis.
    ///
    /// Microphones are ordered row by row (y outer, x inner).
    pub fn planar_grid(nx: usize, ny: usize, spacing: f64, z: f64) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(Error::InvalidGeometry(
                "planar grid needs at least one row and column".to_string(),
            ));
        }
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "grid spacing must be positive, got {spacing}"
            )));
        }
        let x0 = -0.5 * (nx - 1) as f64 * spacing;
        let y0 = -0.5 * (ny - 1) as f64 * spacing;
        let positions = (0..ny)
            .flat_map(|iy| {
                (0..nx).map(move |ix| {
                    Point3::new(x0 + ix as f64 * spacing, y0 + iy as f64 * spacing, z)
                })
            })
            .collect();
        Self::new(positions)
    }

    /// `count` microphones evenly spaced on a circle in the plane `z`.
    pub fn ring(count: usize, radius: f64, z: f64) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "ring radius must be positive, got {radius}"
            )));
        }
        let positions = (0..count)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / count as f64;
                Point3::new(radius * angle.cos(), radius * angle.sin(), z)
            })
            .collect();
        Self::new(positions)
    }

    /// Number of microphones.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// All microphone positions in channel order.
    #[inline]
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    /// Position of microphone `index`.
    #[inline]
    pub fn position(&self, index: usize) -> Option<Point3> {
        self.positions.get(index).copied()
    }

    /// Mean microphone position, the default reference point.
    pub fn centroid(&self) -> Point3 {
        let n = self.positions.len() as f64;
        let (sx, sy, sz) = self
            .positions
            .iter()
            .fold((0.0, 0.0, 0.0), |(x, y, z), p| (x + p.x, y + p.y, z + p.z));
        Point3::new(sx / n, sy / n, sz / n)
    }

    /// Largest distance between any two microphones.
    pub fn aperture(&self) -> f64 {
        let mut max = 0.0_f64;
        for (i, a) in self.positions.iter().enumerate() {
            for b in &self.positions[i + 1..] {
                max = max.max(a.distance(b));
            }
        }
        max
    }

    /// Distances from `point` to every microphone, failing if any is zero.
    pub fn distances_from(&self, point: &Point3) -> Result<Vec<f64>> {
        self.positions
            .iter()
            .enumerate()
            .map(|(i, mic)| {
                let r = mic.distance(point);
                if r < COINCIDENT_TOLERANCE {
                    Err(Error::DegenerateGeometry(format!(
                        "point {point} coincides with microphone {i}"
                    )))
                } else {
                    Ok(r)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_grid_3x3() {
        let g = ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).unwrap();
        assert_eq!(g.len(), 9);
        let c = g.centroid();
        assert!(c.distance(&Point3::ORIGIN) < 1e-12);
        assert_eq!(g.position(0).unwrap(), Point3::new(-0.1, -0.1, 0.0));
        assert_eq!(g.position(8).unwrap(), Point3::new(0.1, 0.1, 0.0));
        // Diagonal of a 0.2 m square
        assert!((g.aperture() - 0.2 * 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_geometry_rejected() {
        assert!(matches!(
            ArrayGeometry::new(vec![]),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn duplicate_positions_rejected() {
        let p = Point3::new(0.1, 0.2, 0.0);
        let err = ArrayGeometry::new(vec![p, Point3::ORIGIN, p]).unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry(_)), "got {err:?}");
    }

    #[test]
    fn non_finite_rejected() {
        let err = ArrayGeometry::new(vec![Point3::new(f64::NAN, 0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry(_)));
    }

    #[test]
    fn single_microphone_is_valid() {
        let g = ArrayGeometry::new(vec![Point3::new(1.0, 2.0, 3.0)]).unwrap();
        assert_eq!(g.len(), 1);
        assert_eq!(g.aperture(), 0.0);
        assert_eq!(g.centroid(), Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn ring_radius() {
        let g = ArrayGeometry::ring(8, 0.1, 0.0).unwrap();
        assert_eq!(g.len(), 8);
        for p in g.positions() {
            assert!((p.distance(&Point3::ORIGIN) - 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn distance_to_microphone_must_be_nonzero() {
        let g = ArrayGeometry::planar_grid(2, 1, 0.2, 0.0).unwrap();
        let on_mic = g.position(1).unwrap();
        assert!(matches!(
            g.distances_from(&on_mic),
            Err(Error::DegenerateGeometry(_))
        ));
        let d = g.distances_from(&Point3::new(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(d.len(), 2);
        assert!((d[0] - (0.01_f64 + 1.0).sqrt()).abs() < 1e-12);
    }
}
