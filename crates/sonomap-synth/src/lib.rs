//! Sonomap Synth - point-source simulation for microphone arrays
//!
//! This crate turns source signals into the multichannel recording an array
//! would capture in a free field.
//!
//! # Signal Generators
//!
//! - [`WhiteNoiseGenerator`] - seeded Gaussian noise with a target RMS
//! - [`SineGenerator`] - pure tone, useful for single-bin checks
//! - [`WaveformGenerator`] - serves an externally loaded waveform
//!
//! # Propagation and Mixing
//!
//! - [`PointSource`] - a signal bound to a position
//! - [`PropagationModel`] - `1/r` attenuation and `r/c` delay per microphone
//! - [`mix`] / [`render`] - sum per-source contributions into one recording
//! - [`resample::to_rate`] - bring a loaded waveform to the scene rate
//!
//! ```rust
//! use sonomap_core::{AcousticConstants, ArrayGeometry, Point3};
//! use sonomap_synth::{
//!     PointSource, PropagationConfig, PropagationModel, SignalGenerator,
//!     WhiteNoiseGenerator, render,
//! };
//!
//! let mics = ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).unwrap();
//! let noise = WhiteNoiseGenerator::new(22050.0, 4096, 1, 0.5).generate().unwrap();
//! let source = PointSource::new(noise, Point3::new(0.0, 0.0, 1.0));
//!
//! let model = PropagationModel::new(AcousticConstants::AIR, PropagationConfig::default());
//! let recording = render(&[source], &mics, &model).unwrap();
//! assert_eq!(recording.num_channels(), 9);
//! ```

pub mod mixer;
pub mod propagation;
pub mod resample;
pub mod signal;

pub use mixer::{mix, render};
pub use propagation::{Interpolation, PointSource, PropagationConfig, PropagationModel};
pub use signal::{
    Signal, SignalGenerator, SineGenerator, WaveformGenerator, WhiteNoiseGenerator, create_rng,
};
