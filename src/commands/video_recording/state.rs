//! Capture session state machine.
//!
//! One `CaptureSession` per capture attempt. Every change goes through
//! [`CaptureSession::apply`]; an event that is not valid in the current mode
//! is rejected with an error and leaves the state untouched.
//!
//! Hover and Dragging before a confirmation belong to the overlay surfaces.
//! A session starts in Hover and its first transition is the confirmation.

use uuid::Uuid;

use super::types::{CaptureSessionState, RecordingFormat, SessionMode};
use crate::commands::capture_overlay::types::{CaptureKind, ConfirmedRegion};
use crate::error::{SnapItError, SnapItResult};

/// Inputs to the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Pointer released on a valid target.
    Confirm(ConfirmedRegion),
    /// Record pressed. Zero seconds goes straight to recording.
    StartCountdown { seconds: u32 },
    CountdownTick,
    Progress { elapsed_secs: f64 },
    Pause,
    Resume,
    /// Stop and save.
    Stop,
    /// Backend finished writing the output.
    Finished,
    /// Screenshot taken for the confirmed target.
    CaptureDone,
    Redo,
    /// Discard everything and return to Hover.
    Cancel,
    Fail(String),
    /// Error display time elapsed.
    ErrorTimeout,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirm(_) => "Confirm",
            Self::StartCountdown { .. } => "StartCountdown",
            Self::CountdownTick => "CountdownTick",
            Self::Progress { .. } => "Progress",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Stop => "Stop",
            Self::Finished => "Finished",
            Self::CaptureDone => "CaptureDone",
            Self::Redo => "Redo",
            Self::Cancel => "Cancel",
            Self::Fail(_) => "Fail",
            Self::ErrorTimeout => "ErrorTimeout",
        }
    }
}

pub struct CaptureSession {
    id: Uuid,
    state: CaptureSessionState,
    region: Option<ConfirmedRegion>,
}

impl CaptureSession {
    pub fn new(capture_kind: CaptureKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: CaptureSessionState::hover(capture_kind),
            region: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &CaptureSessionState {
        &self.state
    }

    pub fn mode(&self) -> &SessionMode {
        &self.state.mode
    }

    pub fn capture_kind(&self) -> CaptureKind {
        self.state.capture_kind
    }

    pub fn format(&self) -> Option<RecordingFormat> {
        self.state.capture_kind.recording_format()
    }

    pub fn region(&self) -> Option<&ConfirmedRegion> {
        self.region.as_ref()
    }

    /// Elapsed recording time, frozen while paused.
    pub fn elapsed_secs(&self) -> f64 {
        match &self.state.mode {
            SessionMode::Recording { elapsed_secs, .. } | SessionMode::Paused { elapsed_secs } => {
                *elapsed_secs
            }
            _ => 0.0,
        }
    }

    fn recording_now(elapsed_secs: f64) -> SessionMode {
        SessionMode::Recording {
            started_at: chrono::Local::now().to_rfc3339(),
            elapsed_secs,
        }
    }

    /// Single transition function.
    pub fn apply(&mut self, event: SessionEvent) -> SnapItResult<&CaptureSessionState> {
        use SessionMode as M;

        let next = match (&self.state.mode, &event) {
            (M::Hover, SessionEvent::Confirm(region)) => {
                self.region = Some(region.clone());
                M::Confirmed
            }

            (M::Confirmed, SessionEvent::StartCountdown { seconds })
                if self.state.capture_kind.is_recording() =>
            {
                if *seconds == 0 {
                    Self::recording_now(0.0)
                } else {
                    M::Countdown {
                        seconds_remaining: *seconds,
                    }
                }
            }

            (M::Countdown { seconds_remaining }, SessionEvent::CountdownTick) => {
                if *seconds_remaining > 1 {
                    M::Countdown {
                        seconds_remaining: seconds_remaining - 1,
                    }
                } else {
                    Self::recording_now(0.0)
                }
            }

            (M::Recording { started_at, .. }, SessionEvent::Progress { elapsed_secs }) => {
                M::Recording {
                    started_at: started_at.clone(),
                    elapsed_secs: *elapsed_secs,
                }
            }
            // Paused time does not count
            (M::Paused { elapsed_secs }, SessionEvent::Progress { .. }) => M::Paused {
                elapsed_secs: *elapsed_secs,
            },

            (M::Recording { elapsed_secs, .. }, SessionEvent::Pause) => {
                if !self.format().is_some_and(|f| f.supports_pause()) {
                    return Err(SnapItError::PauseUnsupported);
                }
                M::Paused {
                    elapsed_secs: *elapsed_secs,
                }
            }
            (M::Paused { elapsed_secs }, SessionEvent::Resume) => Self::recording_now(*elapsed_secs),

            (M::Recording { .. } | M::Paused { .. }, SessionEvent::Stop) => M::Processing,

            (M::Processing, SessionEvent::Finished) => {
                self.region = None;
                M::Hover
            }

            (M::Confirmed, SessionEvent::CaptureDone | SessionEvent::Redo) => {
                self.region = None;
                M::Hover
            }

            (
                M::Hover
                | M::Confirmed
                | M::Countdown { .. }
                | M::Recording { .. }
                | M::Paused { .. },
                SessionEvent::Cancel,
            ) => {
                self.region = None;
                M::Hover
            }

            (_, SessionEvent::Fail(message)) => M::Error {
                message: message.clone(),
            },

            (M::Error { .. }, SessionEvent::ErrorTimeout) => {
                self.region = None;
                M::Hover
            }

            (from, event) => {
                log::warn!(
                    "[SESSION] {} rejected {} while {}",
                    self.id,
                    event.name(),
                    from.name()
                );
                return Err(SnapItError::InvalidTransition {
                    from: from.name().to_string(),
                    event: event.name().to_string(),
                });
            }
        };

        log::debug!(
            "[SESSION] {} {} -> {} on {}",
            self.id,
            self.state.mode.name(),
            next.name(),
            event.name()
        );
        self.state.mode = next;
        Ok(&self.state)
    }
}
