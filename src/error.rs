//! Error types shared by the scoring and recommendation pipeline

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a generation request stopped before producing text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutCause {
    /// The overall deadline elapsed
    Deadline(Duration),
    /// The caller's cancellation token fired
    Cancelled,
}

impl fmt::Display for TimeoutCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutCause::Deadline(d) => write!(f, "deadline of {}ms elapsed", d.as_millis()),
            TimeoutCause::Cancelled => write!(f, "request was cancelled"),
        }
    }
}

/// Errors surfaced by the core entry points
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Insufficient landmarks: {0}")]
    InsufficientLandmarks(String),

    #[error("Malformed AI response: {0}")]
    MalformedResponse(String),

    #[error("Upstream generation failed after {attempts} attempt(s): {message}")]
    RetryableUpstream { attempts: u32, message: String },

    #[error("Generation timed out: {0}")]
    TimedOut(TimeoutCause),

    #[error("Upstream generation failed: {0}")]
    Upstream(String),

    #[error("AI-backed generation is not configured")]
    GeneratorUnavailable,
}

/// Fieldless discriminant of [`PulseError`] for transport-level mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    InsufficientLandmarks,
    MalformedResponse,
    RetryableUpstream,
    TimedOut,
    Upstream,
    GeneratorUnavailable,
}

impl PulseError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        PulseError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PulseError::InvalidInput { .. } => ErrorKind::InvalidInput,
            PulseError::InsufficientLandmarks(_) => ErrorKind::InsufficientLandmarks,
            PulseError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            PulseError::RetryableUpstream { .. } => ErrorKind::RetryableUpstream,
            PulseError::TimedOut(_) => ErrorKind::TimedOut,
            PulseError::Upstream(_) => ErrorKind::Upstream,
            PulseError::GeneratorUnavailable => ErrorKind::GeneratorUnavailable,
        }
    }
}
