//! Rectangular scan grids.
//!
//! A 2D grid is a 3D grid whose z axis holds a single value. Points are laid
//! out x-major: `index = (ix * ny + iy) * nz + iz`.

use crate::error::{Error, Result};
use crate::geometry::Point3;

/// One axis of a scan grid.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    min: f64,
    max: f64,
    steps: usize,
}

impl Axis {
    fn new(name: &str, min: f64, max: f64, increment: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) {
            return Err(Error::InvalidGrid(format!("{name} bounds must be finite")));
        }
        if max <= min {
            return Err(Error::InvalidGrid(format!(
                "{name}_max ({max}) must be greater than {name}_min ({min})"
            )));
        }
        let steps = ((max - min) / increment).round() as usize + 1;
        Ok(Self { min, max, steps })
    }

    fn single(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidGrid("z must be finite".to_string()));
        }
        Ok(Self {
            min: value,
            max: value,
            steps: 1,
        })
    }

    #[inline]
    fn coord(&self, i: usize) -> f64 {
        if self.steps == 1 {
            self.min
        } else {
            self.min + (self.max - self.min) * i as f64 / (self.steps - 1) as f64
        }
    }

    fn nearest(&self, value: f64) -> usize {
        if self.steps == 1 {
            return 0;
        }
        let step = (self.max - self.min) / (self.steps - 1) as f64;
        let i = ((value - self.min) / step).round();
        i.clamp(0.0, (self.steps - 1) as f64) as usize
    }
}

/// Uniform rectangular lattice of candidate source positions.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGrid {
    x: Axis,
    y: Axis,
    z: Axis,
    increment: f64,
}

impl ScanGrid {
    /// Planar grid at height `z`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sonomap_core::ScanGrid;
    ///
    /// let grid = ScanGrid::rect(-0.2, 0.2, -0.2, 0.2, 0.3, 0.01).unwrap();
    /// assert_eq!(grid.shape(), (41, 41, 1));
    /// ```
    pub fn rect(
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        z: f64,
        increment: f64,
    ) -> Result<Self> {
        check_increment(increment)?;
        Ok(Self {
            x: Axis::new("x", x_min, x_max, increment)?,
            y: Axis::new("y", y_min, y_max, increment)?,
            z: Axis::single(z)?,
            increment,
        })
    }

    /// Volumetric grid spanning `z_min..=z_max`.
    #[allow(clippy::too_many_arguments)]
    pub fn rect3d(
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        z_min: f64,
        z_max: f64,
        increment: f64,
    ) -> Result<Self> {
        check_increment(increment)?;
        Ok(Self {
            x: Axis::new("x", x_min, x_max, increment)?,
            y: Axis::new("y", y_min, y_max, increment)?,
            z: Axis::new("z", z_min, z_max, increment)?,
            increment,
        })
    }

    /// Number of steps along (x, y, z).
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.x.steps, self.y.steps, self.z.steps)
    }

    /// Total number of grid points.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.steps * self.y.steps * self.z.steps
    }

    /// Always false: a valid grid has at least one point per axis.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the grid has a single z plane.
    #[inline]
    pub fn is_planar(&self) -> bool {
        self.z.steps == 1
    }

    /// Nominal spacing between grid points.
    #[inline]
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Bounds `(x_min, x_max, y_min, y_max)` for image rendering.
    pub fn extent(&self) -> [f64; 4] {
        [self.x.min, self.x.max, self.y.min, self.y.max]
    }

    /// Z bounds `(z_min, z_max)`; equal for planar grids.
    pub fn z_range(&self) -> (f64, f64) {
        (self.z.min, self.z.max)
    }

    /// Flat index of cell `(ix, iy, iz)`.
    #[inline]
    pub fn flat_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (ix * self.y.steps + iy) * self.z.steps + iz
    }

    /// Cell coordinates `(ix, iy, iz)` of a flat index.
    #[inline]
    pub fn cell(&self, index: usize) -> (usize, usize, usize) {
        let iz = index % self.z.steps;
        let rest = index / self.z.steps;
        (rest / self.y.steps, rest % self.y.steps, iz)
    }

    /// Position of the point at flat index `index`.
    pub fn point(&self, index: usize) -> Point3 {
        let (ix, iy, iz) = self.cell(index);
        Point3::new(self.x.coord(ix), self.y.coord(iy), self.z.coord(iz))
    }

    /// All grid points in flat-index order.
    pub fn points(&self) -> Vec<Point3> {
        (0..self.len()).map(|i| self.point(i)).collect()
    }

    /// X coordinates of the grid columns.
    pub fn x_coords(&self) -> Vec<f64> {
        (0..self.x.steps).map(|i| self.x.coord(i)).collect()
    }

    /// Y coordinates of the grid rows.
    pub fn y_coords(&self) -> Vec<f64> {
        (0..self.y.steps).map(|i| self.y.coord(i)).collect()
    }

    /// Flat index of the grid point nearest to `p` (clamped to the grid).
    pub fn index_of(&self, p: &Point3) -> usize {
        self.flat_index(self.x.nearest(p.x), self.y.nearest(p.y), self.z.nearest(p.z))
    }
}

fn check_increment(increment: f64) -> Result<()> {
    if increment.is_finite() && increment > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidGrid(format!(
            "increment must be positive, got {increment}"
        )))
    }
}
