//! Capture session module.
//!
//! Everything that happens after a target is confirmed:
//! - Immediate screenshot for the screenshot capture kind
//! - Toolbar, countdown and MP4/GIF recording for video kinds
//! - Region, window, monitor, and all-monitors capture targets
//! - Pause/resume for MP4 only

pub mod flow;
pub mod state;
pub mod types;

pub use flow::{CaptureFlow, FlowOutcome};
pub use state::{CaptureSession, SessionEvent};
pub use types::{CaptureSessionState, RecordingFormat, RecordingSettings, SessionMode};
