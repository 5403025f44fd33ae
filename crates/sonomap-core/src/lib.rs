//! Sonomap Core - data model for acoustic source mapping
//!
//! This crate holds the immutable inputs shared by every stage of the
//! synthesis and beamforming pipeline:
//!
//! - [`AcousticConstants`] - speed of sound and level reference, passed explicitly
//! - [`Point3`] / [`ArrayGeometry`] - microphone positions
//! - [`ScanGrid`] - rectangular lattice of candidate source positions
//! - [`MultichannelTimeSeries`] - one recorded channel per microphone
//! - [`Error`] / [`Result`] - error kinds shared by synthesis and analysis
//!
//! ## Example
//!
//! ```rust
//! use sonomap_core::{AcousticConstants, ArrayGeometry, ScanGrid};
//!
//! let constants = AcousticConstants::AIR;
//! let mics = ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).unwrap();
//! let grid = ScanGrid::rect(-0.2, 0.2, -0.2, 0.2, 0.3, 0.01).unwrap();
//!
//! assert_eq!(mics.len(), 9);
//! assert_eq!(grid.len(), 41 * 41);
//! assert!((constants.level_db(4e-10)).abs() < 1e-9);
//! ```

pub mod constants;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod timeseries;

pub use constants::{AcousticConstants, MIN_POWER_RATIO};
pub use error::{Error, Result};
pub use geometry::{ArrayGeometry, COINCIDENT_TOLERANCE, Point3};
pub use grid::ScanGrid;
pub use timeseries::{MultichannelTimeSeries, check_sample_rate};
