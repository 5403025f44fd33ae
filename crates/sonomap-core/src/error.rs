//! Error types shared by the synthesis and analysis stages.

use thiserror::Error;

/// Errors raised by the signal-synthesis and beamforming pipeline.
///
/// Geometry and configuration errors are fatal: every operation returns them
/// immediately. [`Error::IllConditionedMatrix`] is never returned by an
/// operation; it exists so beamforming diagnostics can be rendered the same
/// way as the other kinds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Two positions coincide (microphone/microphone or source/microphone).
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// More samples were requested than a waveform holds.
    #[error("source exhausted: requested {requested} samples, only {available} available")]
    SourceExhausted {
        /// Number of samples requested.
        requested: usize,
        /// Number of samples the source holds.
        available: usize,
    },

    /// Not enough samples for one spectral block.
    #[error("insufficient data: {available} samples available, at least {required} required")]
    InsufficientData {
        /// Samples (or sources) available.
        available: usize,
        /// Minimum needed.
        required: usize,
    },

    /// A synthesis band contains no frequency bins.
    #[error("empty band: no frequency bins in [{low_hz:.1} Hz, {high_hz:.1} Hz)")]
    EmptyBand {
        /// Lower band edge in Hz.
        low_hz: f64,
        /// Upper band edge in Hz.
        high_hz: f64,
    },

    /// Cross-spectral matrices needed eigenvalue clamping.
    #[error("ill-conditioned cross-spectral matrix: {clamped} eigenvalues clamped across {bins} bins")]
    IllConditionedMatrix {
        /// Number of bins with at least one clamped eigenvalue.
        bins: usize,
        /// Total number of clamped eigenvalues.
        clamped: usize,
    },

    /// Geometry is empty or has non-finite coordinates.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Scan grid bounds or increment are invalid.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// Signal has no samples or a non-positive sample rate.
    #[error("invalid signal: {0}")]
    InvalidSignal(String),

    /// Channel counts, lengths, or sample rates disagree.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A numeric parameter is out of its valid range.
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
