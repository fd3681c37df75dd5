//! Error types for the analysis engine.
//!
//! The numerical path never fails: silence, out-of-range candidates and
//! degenerate interpolation all degrade to "no pitch". Errors are only
//! raised when a caller hands the engine input it must refuse.

use thiserror::Error;

/// Errors returned by caller-facing engine entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A reference pitch outside the accepted concert-pitch window.
    #[error("reference pitch {0} Hz is outside the accepted range of 415-465 Hz")]
    InvalidReferencePitch(f32),

    /// A session that cannot be analyzed with the given parameters.
    #[error("cannot start a session at {sample_rate} Hz with {frame_size}-sample frames")]
    InvalidSession { sample_rate: u32, frame_size: usize },

    /// Engine configuration values that cannot drive a session.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}
