//! Unified error handling for the route-tracker library.
//!
//! Nothing in the tracking core is fatal: position failures degrade accuracy,
//! configuration problems are clamped, and recorder misuse is rejected without
//! touching the active route. This module gives those outcomes one type.

use thiserror::Error;

/// Unified error type for route-tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// The device denied or lacks location capability
    #[error("Position unavailable: {message}")]
    PositionUnavailable { message: String },
    /// A single-shot fix request exceeded its bound
    #[error("Position request timed out after {timeout_ms}ms")]
    PositionTimeout { timeout_ms: u64 },
    /// Configuration could not be parsed or contained non-finite values
    #[error("Configuration error: {message}")]
    InvalidConfiguration { message: String },
    /// `start` was called while a route is already being recorded
    #[error("Route '{route_id}' is already recording; finalize or discard it first")]
    RecordingConflict { route_id: String },
    /// `finalize`/`discard` was called with no active route
    #[error("No route is being recorded")]
    NotRecording,
    /// A raw fix had non-finite or out-of-range coordinates
    #[error("Invalid fix: {message}")]
    InvalidFix { message: String },
    /// Routing service error
    #[error("{}", match status_code {
        Some(code) => format!("Routing error ({}): {}", code, message),
        None => format!("Routing error: {}", message),
    })]
    Routing {
        message: String,
        status_code: Option<u16>,
    },
    /// JSON encoding/decoding failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for route-tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for converting Option to TrackerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a position-unavailable error.
    fn ok_or_unavailable(self, message: &str) -> Result<T>;

    /// Convert Option to Result with a not-recording error.
    fn ok_or_not_recording(self) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unavailable(self, message: &str) -> Result<T> {
        self.ok_or_else(|| TrackerError::PositionUnavailable {
            message: message.to_string(),
        })
    }

    fn ok_or_not_recording(self) -> Result<T> {
        self.ok_or(TrackerError::NotRecording)
    }
}
