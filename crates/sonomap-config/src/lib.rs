//! Scene and microphone-geometry configuration for sonomap.
//!
//! A scene file describes a complete synthesize-and-map run in TOML: the
//! array, the sources, and every analysis setting. Missing sections fall back
//! to the reference scenario, so an empty file is a valid scene.
//!
//! # Features
//!
//! - **Scenes**: [`SceneConfig`] loads, validates, and builds the pipeline pieces
//! - **Geometry files**: `[[mic]]` tables, plus the built-in `3x3` and `ring8` layouts
//! - **Validation**: every problem in a scene reported together
//!
//! # Example
//!
//! ```rust
//! use sonomap_config::SceneConfig;
//!
//! let scene = SceneConfig::from_toml(
//!     r#"
//! num_samples = 4096
//!
//! [band]
//! frequency = 4000.0
//! fraction = 3
//! "#,
//! )
//! .unwrap();
//! scene.validate().unwrap();
//!
//! let recording = scene.render_recording().unwrap();
//! assert_eq!(recording.num_channels(), 9);
//! assert_eq!(scene.scan_grid().unwrap().shape(), (41, 41, 1));
//! ```

mod error;
mod scene;

/// Microphone geometry files and built-in layouts.
pub mod geometry;

/// Scene validation.
pub mod validation;

pub use error::ConfigError;
pub use geometry::{
    BUILTIN_GEOMETRY_NAMES, GeometryFile, MicEntry, builtin_geometry, load_geometry,
    resolve_geometry, save_geometry,
};
pub use scene::{
    BandSection, BeamformerMethod, BeamformerSection, GridConfig, PropagationSection, SceneConfig,
    SignalConfig, SourceConfig, SpectraSection,
};
pub use validation::{ValidationError, ValidationResult, validate_scene};
