//! Shared types for the capture backend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Result of a screenshot capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    /// Where the backend stored the image, if it wrote one.
    pub file_path: Option<String>,
    /// Width of the captured image in pixels.
    pub width: u32,
    /// Height of the captured image in pixels.
    pub height: u32,
    /// Indicates if the capture has meaningful transparency (alpha channel).
    #[serde(default)]
    pub has_transparency: bool,
}

impl CaptureResult {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            file_path: None,
            width,
            height,
            has_transparency: false,
        }
    }
}

/// Secondary windows the core positions and hides around a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub enum AuxiliarySurface {
    /// Floating confirmation/recording controls
    Toolbar,
    /// Outline drawn around the target while recording
    RecordingBorder,
    /// Countdown digits before recording starts
    Countdown,
}

impl AuxiliarySurface {
    pub const ALL: [AuxiliarySurface; 3] = [Self::Toolbar, Self::RecordingBorder, Self::Countdown];

    /// Window label used by backends that address surfaces by name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Toolbar => "capture-toolbar",
            Self::RecordingBorder => "recording-border",
            Self::Countdown => "countdown-window",
        }
    }
}
