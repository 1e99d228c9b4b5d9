//! In-memory backend for tests. Records every request and can be told to fail
//! specific calls.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use super::{AuxiliarySurface, CaptureBackend, CaptureResult};
use crate::commands::capture_overlay::types::{
    CaptureKind, CaptureTarget, MonitorDescriptor, Point, WindowInfo,
};
use crate::commands::video_recording::RecordingSettings;
use crate::error::{SnapItError, SnapItResult};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    HitTest { point: Point, monitor_index: usize },
    EnumerateMonitors,
    BeginCapture { kind: CaptureKind, target: CaptureTarget },
    StartRecording(RecordingSettings),
    PauseRecording,
    ResumeRecording,
    StopRecording,
    CancelRecording,
    PositionSurface {
        surface: AuxiliarySurface,
        x: i32,
        y: i32,
        size: Option<(u32, u32)>,
    },
    HideSurface(AuxiliarySurface),
    HideOverlaySet { restore_host: bool },
    MoveOffscreen,
}

impl BackendCall {
    pub fn name(&self) -> &'static str {
        match self {
            Self::HitTest { .. } => "hit_test_window_at",
            Self::EnumerateMonitors => "enumerate_monitors",
            Self::BeginCapture { .. } => "begin_capture",
            Self::StartRecording(_) => "start_recording",
            Self::PauseRecording => "pause_recording",
            Self::ResumeRecording => "resume_recording",
            Self::StopRecording => "stop_recording",
            Self::CancelRecording => "cancel_recording",
            Self::PositionSurface { .. } => "position_auxiliary_surface",
            Self::HideSurface(_) => "hide_auxiliary_surface",
            Self::HideOverlaySet { .. } => "hide_overlay_set",
            Self::MoveOffscreen => "move_overlay_set_offscreen",
        }
    }
}

#[derive(Default)]
pub struct MockBackend {
    monitors: Vec<MonitorDescriptor>,
    windows: Vec<WindowInfo>,
    calls: Mutex<Vec<BackendCall>>,
    /// Remaining failures per method name
    failures: Mutex<HashMap<&'static str, usize>>,
    decline_recording: Mutex<bool>,
    /// How long `begin_capture` takes
    capture_delay: Mutex<Option<Duration>>,
}

impl MockBackend {
    pub fn new(monitors: Vec<MonitorDescriptor>) -> Self {
        Self {
            monitors,
            ..Default::default()
        }
    }

    pub fn with_windows(mut self, windows: Vec<WindowInfo>) -> Self {
        self.windows = windows;
        self
    }

    /// Make the next `times` calls of `method` fail.
    pub fn fail(&self, method: &'static str, times: usize) {
        self.failures.lock().insert(method, times);
    }

    pub fn decline_recording(&self) {
        *self.decline_recording.lock() = true;
    }

    /// Make every `begin_capture` take `delay` of tokio time.
    pub fn delay_capture(&self, delay: Duration) {
        *self.capture_delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().iter().map(BackendCall::name).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.name() == method).count()
    }

    fn record(&self, call: BackendCall) -> SnapItResult<()> {
        let name = call.name();
        self.calls.lock().push(call);
        let mut failures = self.failures.lock();
        match failures.get_mut(name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                let message = format!("{} failed", name);
                Err(match name {
                    "hit_test_window_at" => SnapItError::HitTestError(message),
                    "begin_capture" => SnapItError::CaptureError(message),
                    "start_recording" | "pause_recording" | "resume_recording"
                    | "stop_recording" | "cancel_recording" => SnapItError::RecordingError(message),
                    _ => SnapItError::Other(message),
                })
            }
            _ => Ok(()),
        }
    }
}

impl CaptureBackend for MockBackend {
    async fn hit_test_window_at(
        &self,
        point: Point,
        monitor_index: usize,
    ) -> SnapItResult<Option<WindowInfo>> {
        self.record(BackendCall::HitTest {
            point,
            monitor_index,
        })?;
        Ok(self.windows.iter().find(|w| w.bounds.contains(point)).cloned())
    }

    async fn enumerate_monitors(&self) -> SnapItResult<Vec<MonitorDescriptor>> {
        self.record(BackendCall::EnumerateMonitors)?;
        Ok(self.monitors.clone())
    }

    async fn begin_capture(
        &self,
        kind: CaptureKind,
        target: &CaptureTarget,
    ) -> SnapItResult<CaptureResult> {
        self.record(BackendCall::BeginCapture {
            kind,
            target: target.clone(),
        })?;
        let delay = *self.capture_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let CaptureTarget::Window { window_id } = target {
            if !self.windows.iter().any(|w| w.id == *window_id) {
                return Err(SnapItError::WindowNotFound { id: *window_id });
            }
        }
        Ok(CaptureResult::new(100, 100))
    }

    async fn start_recording(&self, settings: &RecordingSettings) -> SnapItResult<bool> {
        self.record(BackendCall::StartRecording(settings.clone()))?;
        Ok(!*self.decline_recording.lock())
    }

    async fn pause_recording(&self) -> SnapItResult<()> {
        self.record(BackendCall::PauseRecording)
    }

    async fn resume_recording(&self) -> SnapItResult<()> {
        self.record(BackendCall::ResumeRecording)
    }

    async fn stop_recording(&self) -> SnapItResult<Option<String>> {
        self.record(BackendCall::StopRecording)?;
        Ok(Some("recording.mp4".to_string()))
    }

    async fn cancel_recording(&self) -> SnapItResult<()> {
        self.record(BackendCall::CancelRecording)
    }

    async fn position_auxiliary_surface(
        &self,
        surface: AuxiliarySurface,
        x: i32,
        y: i32,
        size: Option<(u32, u32)>,
    ) -> SnapItResult<()> {
        self.record(BackendCall::PositionSurface {
            surface,
            x,
            y,
            size,
        })
    }

    async fn hide_auxiliary_surface(&self, surface: AuxiliarySurface) -> SnapItResult<()> {
        self.record(BackendCall::HideSurface(surface))
    }

    async fn hide_overlay_set(&self, restore_host: bool) -> SnapItResult<()> {
        self.record(BackendCall::HideOverlaySet { restore_host })
    }

    async fn move_overlay_set_offscreen(&self) -> SnapItResult<()> {
        self.record(BackendCall::MoveOffscreen)
    }
}
