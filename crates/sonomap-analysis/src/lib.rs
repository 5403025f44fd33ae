//! Sonomap Analysis - cross-spectral estimation and functional beamforming
//!
//! This crate turns a multichannel recording into a map of source power on a
//! scan grid:
//!
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`spectra`] - block-averaged cross-spectral matrices (Welch's method)
//! - [`eigen`] - Hermitian eigen-decomposition and fractional matrix powers
//! - [`steering`] - steering vectors for array and grid
//! - [`beamformer`] - conventional and functional beamformers, band synthesis
//! - [`power_map`] - beamforming output and clamp diagnostics
//! - [`export`] - CSV export of power and level maps
//!
//! ## Example Workflow
//!
//! ```rust
//! use sonomap_analysis::{
//!     Beamformer, BeamformerConfig, BeamformerKind, SpectraConfig, SpectralEstimator,
//! };
//! use sonomap_core::{AcousticConstants, ArrayGeometry, Point3, ScanGrid};
//! use sonomap_synth::{
//!     PointSource, PropagationConfig, PropagationModel, SignalGenerator, WhiteNoiseGenerator,
//!     render,
//! };
//!
//! let constants = AcousticConstants::AIR;
//! let mics = ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).unwrap();
//!
//! // 1. Simulate a recording
//! let noise = WhiteNoiseGenerator::new(22050.0, 4096, 1, 0.5).generate().unwrap();
//! let source = PointSource::new(noise, Point3::new(0.0, 0.0, 1.0));
//! let model = PropagationModel::new(constants, PropagationConfig::default());
//! let recording = render(&[source], &mics, &model).unwrap();
//!
//! // 2. Estimate cross-spectral matrices
//! let spectra = SpectralEstimator::new(SpectraConfig::default())
//!     .unwrap()
//!     .estimate(&recording)
//!     .unwrap();
//!
//! // 3. Map a 1/3-octave band around 4 kHz
//! let grid = ScanGrid::rect(-0.2, 0.2, -0.2, 0.2, 0.3, 0.05).unwrap();
//! let beamformer = Beamformer::new(
//!     BeamformerConfig::new(BeamformerKind::Functional { gamma: 10.0 }),
//!     &mics,
//!     &grid,
//!     constants,
//! )
//! .unwrap();
//! let map = beamformer.synthetic(&spectra, 4000.0, 3).unwrap();
//! let (_, peak, _) = map.peak();
//! assert!(peak.x.abs() < 0.06 && peak.y.abs() < 0.06);
//! ```

pub mod beamformer;
pub mod eigen;
pub mod export;
pub mod fft;
pub mod power_map;
pub mod spectra;
pub mod steering;

pub use beamformer::{Beamformer, BeamformerConfig, BeamformerKind, BinPower, DEFAULT_GAMMA};
pub use eigen::{FractionalPower, HermitianEigen, fractional_power};
pub use fft::{Fft, Window, fftfreq};
pub use power_map::{BeamformDiagnostics, PowerMap};
pub use spectra::{
    CrossSpectra, CrossSpectralMatrix, SpectraConfig, SpectralEstimator, band_edges,
};
pub use steering::{GridSteering, SteeringFormulation, SteeringVectorField};
