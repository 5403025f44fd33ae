//! CLI command implementations.

pub mod beamform;
pub mod common;
pub mod geometry;
pub mod info;
pub mod run;
pub mod synth;
