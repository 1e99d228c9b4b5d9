//! Type definitions for capture sessions and recording.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::commands::capture_overlay::types::{CaptureKind, CaptureTarget};
use crate::config::OverlayConfig;

/// Output format for recordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "lowercase")]
pub enum RecordingFormat {
    #[default]
    Mp4,
    Gif,
}

impl RecordingFormat {
    /// Pause/resume is only available for MP4
    pub fn supports_pause(&self) -> bool {
        matches!(self, Self::Mp4)
    }
}

/// Settings handed to the backend when a recording starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct RecordingSettings {
    /// Output format (MP4 or GIF).
    pub format: RecordingFormat,
    /// What to capture.
    pub target: CaptureTarget,
    /// Frames per second (10-60).
    pub fps: u32,
    /// Maximum recording duration in seconds. None = unlimited.
    pub max_duration_secs: Option<u32>,
    /// Whether to include the cursor in the recording.
    pub include_cursor: bool,
    /// Quality setting (1-100). Affects video bitrate.
    pub quality: u32,
    /// Countdown duration before recording starts (0-10 seconds).
    pub countdown_secs: u32,
}

impl RecordingSettings {
    /// Build validated settings from a config snapshot.
    pub fn from_config(config: &OverlayConfig, format: RecordingFormat, target: CaptureTarget) -> Self {
        let mut settings = Self {
            format,
            target,
            fps: config.fps,
            max_duration_secs: config.max_duration_secs,
            include_cursor: config.include_cursor,
            quality: config.quality,
            countdown_secs: config.countdown_secs,
        };
        settings.validate();
        settings
    }

    /// Validate and clamp settings to acceptable ranges.
    pub fn validate(&mut self) {
        self.fps = self.fps.clamp(10, 60);
        self.quality = self.quality.clamp(1, 100);
        self.countdown_secs = self.countdown_secs.clamp(0, 10);

        // GIF-specific limits
        if self.format == RecordingFormat::Gif {
            self.fps = self.fps.min(30);

            if let Some(duration) = self.max_duration_secs {
                self.max_duration_secs = Some(duration.min(60));
            } else {
                self.max_duration_secs = Some(30);
            }
        }
    }
}

/// Where a capture attempt currently is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionMode {
    /// No selection in progress; surfaces highlight what is under the cursor.
    #[default]
    Hover,
    Dragging,
    /// A target is frozen and waiting for capture or a toolbar choice.
    Confirmed,
    Countdown {
        #[serde(rename = "secondsRemaining")]
        seconds_remaining: u32,
    },
    Recording {
        #[serde(rename = "startedAt")]
        started_at: String,
        #[serde(rename = "elapsedSecs")]
        elapsed_secs: f64,
    },
    /// Paused (MP4 only).
    Paused {
        #[serde(rename = "elapsedSecs")]
        elapsed_secs: f64,
    },
    /// Backend is finalizing the recording.
    Processing,
    Error { message: String },
}

impl SessionMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hover => "Hover",
            Self::Dragging => "Dragging",
            Self::Confirmed => "Confirmed",
            Self::Countdown { .. } => "Countdown",
            Self::Recording { .. } => "Recording",
            Self::Paused { .. } => "Paused",
            Self::Processing => "Processing",
            Self::Error { .. } => "Error",
        }
    }

    /// True while a recording is counting down, running, paused or finalizing.
    pub fn is_recording_phase(&self) -> bool {
        matches!(
            self,
            Self::Countdown { .. } | Self::Recording { .. } | Self::Paused { .. } | Self::Processing
        )
    }
}

/// Authoritative session state pushed on `recording-state-changed`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct CaptureSessionState {
    pub mode: SessionMode,
    pub capture_kind: CaptureKind,
}

impl CaptureSessionState {
    pub fn hover(capture_kind: CaptureKind) -> Self {
        Self {
            mode: SessionMode::Hover,
            capture_kind,
        }
    }
}
