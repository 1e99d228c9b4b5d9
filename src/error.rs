//! Central error types for the SnapIt overlay.
//!
//! Errors cross surface boundaries as plain strings, so `SnapItError`
//! serializes to its display message.

use serde::Serialize;
use thiserror::Error;

/// Main error type for overlay selection and capture confirmation.
#[derive(Error, Debug)]
pub enum SnapItError {
    /// Screenshot capture failed in the backend
    #[error("Capture failed: {0}")]
    CaptureError(String),

    /// Video/GIF recording call failed in the backend
    #[error("Recording error: {0}")]
    RecordingError(String),

    /// Window hit-test query failed
    #[error("Hit-test error: {0}")]
    HitTestError(String),

    /// Monitor not found by index
    #[error("Monitor not found at index {index}")]
    MonitorNotFound { index: usize },

    /// Window not found by ID
    #[error("Window not found with ID {id}")]
    WindowNotFound { id: u32 },

    /// The capture session cannot take this event in its current mode
    #[error("Invalid transition: {event} while {from}")]
    InvalidTransition { from: String, event: String },

    /// Pause/resume requested for a GIF recording
    #[error("Pause is not supported for GIF recordings")]
    PauseUnsupported,

    /// Every receiver of a channel has gone away
    #[error("Event bus closed")]
    BusClosed,

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Serialize for SnapItError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Attach a human-readable prefix to foreign errors.
///
/// ```ignore
/// fs::create_dir_all(dir).context("Failed to create log directory")?;
/// ```
pub trait ResultExt<T> {
    fn context(self, msg: &str) -> SnapItResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn context(self, msg: &str) -> SnapItResult<T> {
        self.map_err(|e| SnapItError::Other(format!("{}: {}", msg, e)))
    }
}

pub type SnapItResult<T> = Result<T, SnapItError>;
