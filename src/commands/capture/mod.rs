//! Capture backend interface.
//!
//! The backend owns everything platform specific: window enumeration, pixel
//! capture, the recorder and the auxiliary windows. The overlay core only
//! talks to it through [`CaptureBackend`]; every call is asynchronous and may
//! fail, and the caller decides what a failure means for the session.

#[cfg(test)]
pub mod mock;
pub mod types;

pub use types::{AuxiliarySurface, CaptureResult};

use std::future::Future;

use crate::commands::capture_overlay::types::{
    CaptureKind, CaptureTarget, MonitorDescriptor, Point, WindowInfo,
};
use crate::commands::video_recording::RecordingSettings;
use crate::error::SnapItResult;

/// Request/response surface of the capture service.
///
/// Implementations are shared between surface tasks behind an `Arc`, so every
/// returned future must be `Send`.
pub trait CaptureBackend: Send + Sync + 'static {
    /// Top-level window under a global point. `None` when nothing is there or
    /// when the request is no longer the active hit-test target.
    fn hit_test_window_at(
        &self,
        point: Point,
        monitor_index: usize,
    ) -> impl Future<Output = SnapItResult<Option<WindowInfo>>> + Send;

    fn enumerate_monitors(&self) -> impl Future<Output = SnapItResult<Vec<MonitorDescriptor>>> + Send;

    fn begin_capture(
        &self,
        kind: CaptureKind,
        target: &CaptureTarget,
    ) -> impl Future<Output = SnapItResult<CaptureResult>> + Send;

    /// Start recording. `Ok(false)` means the backend declined.
    fn start_recording(
        &self,
        settings: &RecordingSettings,
    ) -> impl Future<Output = SnapItResult<bool>> + Send;

    fn pause_recording(&self) -> impl Future<Output = SnapItResult<()>> + Send;

    fn resume_recording(&self) -> impl Future<Output = SnapItResult<()>> + Send;

    /// Stop and finalize. Resolves once the output is written.
    fn stop_recording(&self) -> impl Future<Output = SnapItResult<Option<String>>> + Send;

    /// Stop and discard.
    fn cancel_recording(&self) -> impl Future<Output = SnapItResult<()>> + Send;

    /// Show `surface` at a global position, optionally resizing it.
    fn position_auxiliary_surface(
        &self,
        surface: AuxiliarySurface,
        x: i32,
        y: i32,
        size: Option<(u32, u32)>,
    ) -> impl Future<Output = SnapItResult<()>> + Send;

    fn hide_auxiliary_surface(
        &self,
        surface: AuxiliarySurface,
    ) -> impl Future<Output = SnapItResult<()>> + Send;

    /// Hide every overlay surface; with `restore_host` the main window that was
    /// hidden for the capture comes back.
    fn hide_overlay_set(&self, restore_host: bool) -> impl Future<Output = SnapItResult<()>> + Send;

    /// Keep the overlay set alive but out of the recorded area.
    fn move_overlay_set_offscreen(&self) -> impl Future<Output = SnapItResult<()>> + Send;
}
