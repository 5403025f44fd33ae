//! Physical constants passed explicitly to every stage that needs them.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{Error, Result};

/// Smallest power ratio used before taking a logarithm.
pub const MIN_POWER_RATIO: f64 = 1e-35;

/// Propagation and level-reference constants.
///
/// There are no process-wide defaults: a value of this type is built once at
/// startup and handed to the propagation model, the steering vectors, and the
/// level conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcousticConstants {
    /// Speed of sound in m/s.
    pub speed_of_sound: f64,
    /// Reference pressure for sound-pressure levels in Pa.
    pub reference_pressure: f64,
}

impl AcousticConstants {
    /// Air at roughly 20 °C with the usual 20 µPa level reference.
    pub const AIR: Self = Self {
        speed_of_sound: 343.2,
        reference_pressure: 2e-5,
    };

    /// Create a validated set of constants.
    pub fn new(speed_of_sound: f64, reference_pressure: f64) -> Result<Self> {
        let constants = Self {
            speed_of_sound,
            reference_pressure,
        };
        constants.validate()?;
        Ok(constants)
    }

    /// Check that both constants are positive and finite.
    pub fn validate(&self) -> Result<()> {
        if !(self.speed_of_sound.is_finite() && self.speed_of_sound > 0.0) {
            return Err(Error::invalid_parameter(
                "speed_of_sound",
                format!("must be positive, got {}", self.speed_of_sound),
            ));
        }
        if !(self.reference_pressure.is_finite() && self.reference_pressure > 0.0) {
            return Err(Error::invalid_parameter(
                "reference_pressure",
                format!("must be positive, got {}", self.reference_pressure),
            ));
        }
        Ok(())
    }

    /// Wavenumber `2πf/c` in rad/m.
    #[inline]
    pub fn wavenumber(&self, frequency_hz: f64) -> f64 {
        2.0 * PI * frequency_hz / self.speed_of_sound
    }

    /// Travel time over `distance` metres, in seconds.
    #[inline]
    pub fn travel_time(&self, distance: f64) -> f64 {
        distance / self.speed_of_sound
    }

    /// Squared reference pressure in Pa².
    #[inline]
    pub fn reference_power(&self) -> f64 {
        self.reference_pressure * self.reference_pressure
    }

    /// Convert a mean-square pressure (Pa²) to a sound-pressure level in dB.
    ///
    /// Zero power maps to a finite floor of `10·log10(1e-35)` dB.
    #[inline]
    pub fn level_db(&self, power: f64) -> f64 {
        10.0 * (power / self.reference_power()).max(MIN_POWER_RATIO).log10()
    }

    /// Inverse of [`level_db`](Self::level_db).
    #[inline]
    pub fn power_from_level(&self, level_db: f64) -> f64 {
        self.reference_power() * 10.0_f64.powf(level_db / 10.0)
    }
}

impl Default for AcousticConstants {
    fn default() -> Self {
        Self::AIR
    }
}
