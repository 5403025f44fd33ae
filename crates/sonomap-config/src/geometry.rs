//! Microphone geometry files and built-in layouts.
//!
//! A geometry file lists one `[[mic]]` table per microphone:
//!
//! ```toml
//! [[mic]]
//! name = "m1"
//! x = -0.1
//! y = -0.1
//! z = 0.0
//! ```
//!
//! Channel order follows the order of the tables.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use sonomap_core::{ArrayGeometry, Point3};
use std::path::Path;

/// Names accepted by [`builtin_geometry`].
pub const BUILTIN_GEOMETRY_NAMES: &[&str] = &["3x3", "ring8"];

/// One microphone entry in a geometry file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicEntry {
    /// Optional label, kept only for readability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// X coordinate in metres.
    pub x: f64,
    /// Y coordinate in metres.
    pub y: f64,
    /// Z coordinate in metres.
    #[serde(default)]
    pub z: f64,
}

/// Serialized form of an [`ArrayGeometry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryFile {
    /// Microphones in channel order.
    #[serde(rename = "mic", default)]
    pub mics: Vec<MicEntry>,
}

impl GeometryFile {
    /// Parse a geometry from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Entries for an existing geometry, named `m1`, `m2`, ...
    pub fn from_geometry(geometry: &ArrayGeometry) -> Self {
        let mics = geometry
            .positions()
            .iter()
            .enumerate()
            .map(|(i, p)| MicEntry {
                name: Some(format!("m{}", i + 1)),
                x: p.x,
                y: p.y,
                z: p.z,
            })
            .collect();
        Self { mics }
    }

    /// Validate positions and build the geometry.
    pub fn to_geometry(&self) -> Result<ArrayGeometry, ConfigError> {
        let positions = self
            .mics
            .iter()
            .map(|m| Point3::new(m.x, m.y, m.z))
            .collect();
        Ok(ArrayGeometry::new(positions)?)
    }
}

/// Built-in layout by name: `3x3` is a 0.1 m square grid, `ring8` a 0.1 m
/// radius ring, both in the `z = 0` plane.
pub fn builtin_geometry(name: &str) -> Option<ArrayGeometry> {
    match name.to_ascii_lowercase().as_str() {
        "3x3" => ArrayGeometry::planar_grid(3, 3, 0.1, 0.0).ok(),
        "ring8" => ArrayGeometry::ring(8, 0.1, 0.0).ok(),
        _ => None,
    }
}

/// Load a geometry file.
pub fn load_geometry(path: impl AsRef<Path>) -> Result<ArrayGeometry, ConfigError> {
    let path = path.as_ref();
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    let geometry = GeometryFile::from_toml(&contents)?.to_geometry()?;
    tracing::debug!(path = %path.display(), mics = geometry.len(), "loaded geometry");
    Ok(geometry)
}

/// Write a geometry file, creating parent directories as needed.
pub fn save_geometry(geometry: &ArrayGeometry, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
    }
    let contents = GeometryFile::from_geometry(geometry).to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::write_file(path, e))
}

/// Resolve a built-in name, or else load the named file.
///
/// Relative paths are taken relative to `base_dir` when given.
pub fn resolve_geometry(
    name_or_path: &str,
    base_dir: Option<&Path>,
) -> Result<ArrayGeometry, ConfigError> {
    if let Some(geometry) = builtin_geometry(name_or_path) {
        return Ok(geometry);
    }
    let path = match base_dir {
        Some(dir) if Path::new(name_or_path).is_relative() => dir.join(name_or_path),
        _ => Path::new(name_or_path).to_path_buf(),
    };
    if path.is_file() {
        load_geometry(&path)
    } else {
        Err(ConfigError::UnknownGeometry(name_or_path.to_string()))
    }
}
