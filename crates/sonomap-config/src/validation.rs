//! Scene validation.
//!
//! Collects every problem in a scene instead of stopping at the first, so a
//! user fixing a file sees the whole list at once.

use crate::scene::{BeamformerMethod, SceneConfig, SignalConfig};
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric value outside its allowed range.
    #[error("'{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the setting.
        param: String,
        /// The value that was out of range.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value that cannot be interpreted.
    #[error("invalid value for '{param}': {reason}")]
    InvalidValue {
        /// Dotted path of the setting.
        param: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    fn invalid(param: impl Into<String>, reason: impl ToString) -> Self {
        ValidationError::InvalidValue {
            param: param.into(),
            reason: reason.to_string(),
        }
    }

    fn out_of_range(param: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        ValidationError::OutOfRange {
            param: param.into(),
            value,
            min,
            max,
        }
    }

    /// Flatten into a list of single errors.
    pub fn into_vec(self) -> Vec<ValidationError> {
        match self {
            ValidationError::Multiple(errors) => errors,
            other => vec![other],
        }
    }
}

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Check a scene's values.
///
/// Geometry and waveform files are not opened; problems there surface when
/// the scene is built.
pub fn validate_scene(scene: &SceneConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    let nyquist = scene.sample_rate / 2.0;

    if !(scene.sample_rate.is_finite() && scene.sample_rate > 0.0) {
        errors.push(ValidationError::invalid(
            "sample_rate",
            format!("must be positive, got {}", scene.sample_rate),
        ));
    }
    if scene.num_samples == 0 {
        errors.push(ValidationError::invalid("num_samples", "must be at least 1"));
    }
    if scene.geometry.trim().is_empty() {
        errors.push(ValidationError::invalid("geometry", "must name a layout or file"));
    }
    if let Err(e) = scene.constants.validate() {
        errors.push(ValidationError::invalid("constants", e));
    }

    if scene.sources.is_empty() {
        errors.push(ValidationError::invalid("sources", "at least one source is required"));
    }
    for (i, source) in scene.sources.iter().enumerate() {
        if !source.location.iter().all(|c| c.is_finite()) {
            errors.push(ValidationError::invalid(
                format!("sources[{i}].location"),
                "coordinates must be finite",
            ));
        }
        match &source.signal {
            SignalConfig::WhiteNoise { rms, .. } => {
                if !(rms.is_finite() && *rms >= 0.0) {
                    errors.push(ValidationError::out_of_range(
                        format!("sources[{i}].rms"),
                        *rms,
                        0.0,
                        f64::INFINITY,
                    ));
                }
            }
            SignalConfig::Sine {
                frequency,
                amplitude,
                ..
            } => {
                if !(*frequency > 0.0 && *frequency < nyquist) {
                    errors.push(ValidationError::out_of_range(
                        format!("sources[{i}].frequency"),
                        *frequency,
                        0.0,
                        nyquist,
                    ));
                }
                if !amplitude.is_finite() {
                    errors.push(ValidationError::invalid(
                        format!("sources[{i}].amplitude"),
                        "must be finite",
                    ));
                }
            }
            SignalConfig::Wav { path } => {
                if path.as_os_str().is_empty() {
                    errors.push(ValidationError::invalid(
                        format!("sources[{i}].path"),
                        "must not be empty",
                    ));
                }
            }
        }
    }

    if let Err(e) = scene.spectra_config() {
        errors.push(ValidationError::invalid("spectra", e));
    } else if scene.spectra.block_size > scene.num_samples {
        errors.push(ValidationError::invalid(
            "spectra.block_size",
            format!(
                "{} exceeds the {} samples per channel",
                scene.spectra.block_size, scene.num_samples
            ),
        ));
    }
    if let Err(e) = scene.scan_grid() {
        errors.push(ValidationError::invalid("grid", e));
    }
    match scene.beamformer_config() {
        Ok(_) => {
            let gamma = scene.beamformer.gamma;
            if scene.beamformer.kind == BeamformerMethod::Functional
                && !(gamma.is_finite() && gamma >= 1.0)
            {
                errors.push(ValidationError::out_of_range(
                    "beamformer.gamma",
                    gamma,
                    1.0,
                    f64::INFINITY,
                ));
            }
            if let Some(reference) = scene.beamformer.reference
                && !reference.iter().all(|c| c.is_finite())
            {
                errors.push(ValidationError::invalid(
                    "beamformer.reference",
                    "coordinates must be finite",
                ));
            }
        }
        Err(e) => errors.push(ValidationError::invalid("beamformer", e)),
    }

    for frequency in scene.center_frequencies() {
        if !(frequency > 0.0 && frequency <= nyquist) {
            errors.push(ValidationError::out_of_range(
                "band.frequency",
                frequency,
                0.0,
                nyquist,
            ));
        }
    }

    collect(errors)
}
