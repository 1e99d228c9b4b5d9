//! Capture flow driver.
//!
//! Runs one confirmed capture against the backend: an immediate screenshot,
//! or the toolbar/countdown/recording sequence for video and GIF. The flow is
//! its own task, so overlay surfaces keep processing bus traffic while it
//! waits on the backend. Every exit path ends in Hover with the cleanup
//! broadcasts sent.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use super::state::{CaptureSession, SessionEvent};
use super::types::{RecordingSettings, SessionMode};
use crate::app::events::{EventBus, OverlayEvent, Subscription, SurfaceId, ToolbarAction, ALL_MONITORS};
use crate::commands::capture::{AuxiliarySurface, CaptureBackend, CaptureResult};
use crate::commands::capture_overlay::types::{
    monitor_at, CaptureKind, CaptureTarget, ConfirmedRegion, MonitorDescriptor,
};
use crate::commands::toolbar_position::{calculate_position, ToolbarSize, DEFAULT_TOOLBAR_SIZE};
use crate::config::{FallbackTarget, OverlayConfig};
use crate::error::{SnapItError, SnapItResult};

const TICK: Duration = Duration::from_secs(1);

/// How a flow ended. The session is back in Hover in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutcome {
    Captured(CaptureResult),
    /// Recording saved; carries the output path when the backend reports one.
    Recorded(Option<String>),
    Cancelled,
    /// Selection discarded, overlay set kept open for another try.
    Redo,
    Failed(String),
}

pub struct CaptureFlow<B: CaptureBackend> {
    backend: Arc<B>,
    bus: EventBus,
    session: CaptureSession,
    /// Snapshot taken when the flow was created
    config: OverlayConfig,
    monitors: Vec<MonitorDescriptor>,
    toolbar_size: ToolbarSize,
}

impl<B: CaptureBackend> CaptureFlow<B> {
    pub fn new(
        backend: Arc<B>,
        bus: EventBus,
        capture_kind: CaptureKind,
        monitors: Vec<MonitorDescriptor>,
        config: OverlayConfig,
    ) -> Self {
        Self {
            backend,
            bus,
            session: CaptureSession::new(capture_kind),
            config,
            monitors,
            toolbar_size: DEFAULT_TOOLBAR_SIZE,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    fn publish(&self, event: OverlayEvent) {
        self.bus.publish(SurfaceId::Session, event);
    }

    fn publish_state(&self) {
        self.publish(OverlayEvent::RecordingStateChanged(self.session.state().clone()));
    }

    fn transition(&mut self, event: SessionEvent) -> bool {
        match self.session.apply(event) {
            Ok(_) => {
                self.publish_state();
                true
            }
            Err(e) => {
                log::debug!("[SESSION] {} {}", self.session.id(), e);
                false
            }
        }
    }

    /// Drive the session for `region` until it returns to Hover.
    ///
    /// `actions` must be subscribed before the toolbar can be shown, so no
    /// toolbar click is missed.
    pub async fn run(mut self, region: ConfirmedRegion, actions: Subscription) -> FlowOutcome {
        log::info!(
            "[SESSION] {} confirmed {:?} for {:?}",
            self.session.id(),
            region.target,
            self.session.capture_kind()
        );
        if !self.transition(SessionEvent::Confirm(region.clone())) {
            return FlowOutcome::Cancelled;
        }

        if self.session.capture_kind().is_recording() {
            self.await_toolbar(region, &actions).await
        } else {
            self.capture_screenshot(region, &actions).await
        }
    }

    // ========================================================================
    // Screenshot
    // ========================================================================

    /// One capture attempt. `None` when the toolbar cancelled first; a
    /// cancel already queued wins over a capture that is ready.
    async fn capture_or_cancel(
        &self,
        target: &CaptureTarget,
        actions: &Subscription,
    ) -> Option<SnapItResult<CaptureResult>> {
        let backend = self.backend.clone();
        tokio::select! {
            biased;
            _ = cancel_requested(actions) => {
                log::info!("[SESSION] {} cancelled while capturing {:?}", self.session.id(), target);
                None
            }
            result = backend.begin_capture(CaptureKind::Screenshot, target) => Some(result),
        }
    }

    async fn capture_screenshot(
        &mut self,
        region: ConfirmedRegion,
        actions: &Subscription,
    ) -> FlowOutcome {
        let Some(first) = self.capture_or_cancel(&region.target, actions).await else {
            return self.cancel().await;
        };

        let result = match first {
            Ok(result) => Ok(result),
            Err(e) => {
                log::warn!(
                    "[SESSION] {} capture of {:?} failed: {}",
                    self.session.id(),
                    region.target,
                    e
                );
                match self.fallback_target(&region) {
                    Some(fallback) => {
                        log::info!("[SESSION] {} retrying with {:?}", self.session.id(), fallback);
                        match self.capture_or_cancel(&fallback, actions).await {
                            Some(result) => result,
                            None => return self.cancel().await,
                        }
                    }
                    None => Err(e),
                }
            }
        };

        match result {
            Ok(result) => {
                self.transition(SessionEvent::CaptureDone);
                self.cleanup().await;
                FlowOutcome::Captured(result)
            }
            Err(e) => {
                if let Err(hide) = self.backend.hide_overlay_set(true).await {
                    log::warn!("[SESSION] Failed to hide overlay set: {}", hide);
                }
                self.fail(e).await
            }
        }
    }

    /// Whole-monitor target used when capturing the confirmed target fails.
    fn fallback_target(&self, region: &ConfirmedRegion) -> Option<CaptureTarget> {
        let fallback = match self.config.fallback_target {
            FallbackTarget::HoveredMonitor => {
                let monitor = monitor_at(&self.monitors, region.bounds.center())
                    .or_else(|| self.monitors.first())?;
                CaptureTarget::Monitor {
                    monitor_index: monitor.index,
                }
            }
            FallbackTarget::AllMonitors => CaptureTarget::AllMonitors,
        };
        Some(fallback).filter(|f| *f != region.target)
    }

    // ========================================================================
    // Toolbar
    // ========================================================================

    async fn position_toolbar(&self, region: &ConfirmedRegion) {
        let pos = calculate_position(
            region.bounds,
            self.toolbar_size,
            &self.monitors,
            self.config.toolbar_margin,
        );
        let size = Some((self.toolbar_size.width, self.toolbar_size.height));
        if let Err(e) = self
            .backend
            .position_auxiliary_surface(AuxiliarySurface::Toolbar, pos.x, pos.y, size)
            .await
        {
            log::warn!("[TOOLBAR] Failed to position toolbar: {}", e);
        }
    }

    async fn resize_toolbar(&mut self, region: &ConfirmedRegion, width: u32, height: u32) {
        self.toolbar_size = ToolbarSize { width, height };
        self.position_toolbar(region).await;
    }

    async fn await_toolbar(&mut self, region: ConfirmedRegion, actions: &Subscription) -> FlowOutcome {
        self.position_toolbar(&region).await;

        loop {
            let Some(action) = next_action(actions).await else {
                return self.cancel().await;
            };
            match action {
                ToolbarAction::Record => return self.record(region, actions).await,
                ToolbarAction::Screenshot => {
                    return self.capture_screenshot(region, actions).await
                }
                ToolbarAction::Redo => return self.redo().await,
                ToolbarAction::Cancel => return self.cancel().await,
                ToolbarAction::Resized { width, height } => {
                    self.resize_toolbar(&region, width, height).await
                }
                other => log::debug!("[TOOLBAR] Ignoring {:?} before recording", other),
            }
        }
    }

    // ========================================================================
    // Recording
    // ========================================================================

    async fn record(&mut self, region: ConfirmedRegion, actions: &Subscription) -> FlowOutcome {
        let Some(format) = self.session.format() else {
            return self.cancel().await;
        };
        let settings = RecordingSettings::from_config(&self.config, format, region.target.clone());

        if !self.transition(SessionEvent::StartCountdown {
            seconds: settings.countdown_secs,
        }) {
            return self.cancel().await;
        }

        if matches!(self.session.mode(), SessionMode::Countdown { .. }) {
            let center = region.bounds.center();
            if let Err(e) = self
                .backend
                .position_auxiliary_surface(AuxiliarySurface::Countdown, center.x, center.y, None)
                .await
            {
                log::warn!("[SESSION] Failed to show countdown: {}", e);
            }

            let mut deadline = Instant::now() + TICK;
            while matches!(self.session.mode(), SessionMode::Countdown { .. }) {
                tokio::select! {
                    _ = time::sleep_until(deadline) => {
                        deadline += TICK;
                        self.transition(SessionEvent::CountdownTick);
                    }
                    action = next_action(actions) => match action {
                        Some(ToolbarAction::Cancel) | None => return self.cancel().await,
                        Some(ToolbarAction::Resized { width, height }) => {
                            self.resize_toolbar(&region, width, height).await
                        }
                        Some(other) => log::debug!("[SESSION] Ignoring {:?} during countdown", other),
                    }
                }
            }

            if let Err(e) = self
                .backend
                .hide_auxiliary_surface(AuxiliarySurface::Countdown)
                .await
            {
                log::warn!("[SESSION] Failed to hide countdown: {}", e);
            }
        }

        if let Err(e) = self.backend.move_overlay_set_offscreen().await {
            log::warn!("[SESSION] Failed to move overlay set offscreen: {}", e);
        }
        let b = region.bounds;
        if let Err(e) = self
            .backend
            .position_auxiliary_surface(
                AuxiliarySurface::RecordingBorder,
                b.x,
                b.y,
                Some((b.width, b.height)),
            )
            .await
        {
            log::warn!("[SESSION] Failed to show recording border: {}", e);
        }

        match self.backend.start_recording(&settings).await {
            Ok(true) => {
                log::info!(
                    "[SESSION] {} recording {:?} at {} fps",
                    self.session.id(),
                    settings.format,
                    settings.fps
                );
            }
            Ok(false) => {
                log::warn!("[SESSION] {} backend declined to record", self.session.id());
                return self.cancel().await;
            }
            Err(e) => return self.fail(e).await,
        }

        self.run_recording(&region, &settings, actions).await
    }

    async fn run_recording(
        &mut self,
        region: &ConfirmedRegion,
        settings: &RecordingSettings,
        actions: &Subscription,
    ) -> FlowOutcome {
        let max = settings.max_duration_secs.map(|s| Duration::from_secs(s as u64));
        let mut accumulated = Duration::ZERO;
        let mut running_since = Some(Instant::now());
        let mut ticker = time::interval_at(Instant::now() + TICK, TICK);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(since) = running_since else {
                        continue;
                    };
                    let elapsed = accumulated + since.elapsed();
                    self.transition(SessionEvent::Progress {
                        elapsed_secs: elapsed.as_secs_f64(),
                    });
                    if max.is_some_and(|max| elapsed >= max) {
                        log::info!("[SESSION] {} reached max duration", self.session.id());
                        return self.stop().await;
                    }
                }
                action = next_action(actions) => match action {
                    Some(ToolbarAction::Pause) => {
                        if let Err(e) = self.session.apply(SessionEvent::Pause) {
                            log::debug!("[SESSION] {} pause rejected: {}", self.session.id(), e);
                            continue;
                        }
                        if let Err(e) = self.backend.pause_recording().await {
                            return self.fail(e).await;
                        }
                        if let Some(since) = running_since.take() {
                            accumulated += since.elapsed();
                        }
                        self.publish_state();
                    }
                    Some(ToolbarAction::Resume) => {
                        if self.session.apply(SessionEvent::Resume).is_err() {
                            continue;
                        }
                        if let Err(e) = self.backend.resume_recording().await {
                            return self.fail(e).await;
                        }
                        running_since = Some(Instant::now());
                        self.publish_state();
                    }
                    Some(ToolbarAction::Stop) => return self.stop().await,
                    Some(ToolbarAction::Cancel) | None => {
                        if let Err(e) = self.backend.cancel_recording().await {
                            log::warn!("[SESSION] Failed to cancel recording: {}", e);
                        }
                        return self.cancel().await;
                    }
                    Some(ToolbarAction::Resized { width, height }) => {
                        self.resize_toolbar(region, width, height).await
                    }
                    Some(other) => log::debug!("[SESSION] Ignoring {:?} while recording", other),
                }
            }
        }
    }

    async fn stop(&mut self) -> FlowOutcome {
        self.transition(SessionEvent::Stop);
        match self.backend.stop_recording().await {
            Ok(path) => {
                log::info!("[SESSION] {} saved {:?}", self.session.id(), path);
                self.transition(SessionEvent::Finished);
                self.cleanup().await;
                FlowOutcome::Recorded(path)
            }
            Err(e) => self.fail(e).await,
        }
    }

    // ========================================================================
    // Exits
    // ========================================================================

    async fn cancel(&mut self) -> FlowOutcome {
        log::info!("[SESSION] {} cancelled", self.session.id());
        self.transition(SessionEvent::Cancel);
        self.cleanup().await;
        FlowOutcome::Cancelled
    }

    /// Discard the selection but keep the overlay set up.
    async fn redo(&mut self) -> FlowOutcome {
        if let Err(e) = self
            .backend
            .hide_auxiliary_surface(AuxiliarySurface::Toolbar)
            .await
        {
            log::warn!("[TOOLBAR] Failed to hide toolbar: {}", e);
        }
        self.session.apply(SessionEvent::Redo).ok();
        self.publish(OverlayEvent::SelectionUpdate(None));
        self.publish(OverlayEvent::ClearHoveredWindow {
            target_monitor: ALL_MONITORS,
        });
        self.publish_state();
        FlowOutcome::Redo
    }

    /// Show the error, then revert to Hover.
    async fn fail(&mut self, error: SnapItError) -> FlowOutcome {
        let message = error.to_string();
        log::error!("[SESSION] {} {}", self.session.id(), message);
        self.transition(SessionEvent::Fail(message.clone()));

        time::sleep(Duration::from_millis(self.config.error_display_ms)).await;

        self.transition(SessionEvent::ErrorTimeout);
        self.cleanup().await;
        FlowOutcome::Failed(message)
    }

    /// Hide auxiliary surfaces, restore the host window and reset every
    /// surface.
    async fn cleanup(&mut self) {
        for surface in AuxiliarySurface::ALL {
            if let Err(e) = self.backend.hide_auxiliary_surface(surface).await {
                log::warn!("[SESSION] Failed to hide {}: {}", surface.label(), e);
            }
        }
        if let Err(e) = self.backend.hide_overlay_set(true).await {
            log::warn!("[SESSION] Failed to hide overlay set: {}", e);
        }

        self.publish(OverlayEvent::SelectionUpdate(None));
        self.publish(OverlayEvent::SetCursorPassthrough {
            origin_monitor: ALL_MONITORS,
            enable: false,
        });
        if *self.session.mode() != SessionMode::Hover {
            self.session.apply(SessionEvent::Cancel).ok();
        }
        self.publish_state();
    }
}

/// Next toolbar action on the bus. `None` once the bus is gone.
async fn next_action(actions: &Subscription) -> Option<ToolbarAction> {
    loop {
        match actions.recv().await {
            Ok(envelope) => {
                if let OverlayEvent::ToolbarAction(action) = envelope.event {
                    return Some(action);
                }
            }
            Err(_) => return None,
        }
    }
}

/// Resolves once the toolbar cancels or the bus goes away.
async fn cancel_requested(actions: &Subscription) {
    loop {
        match next_action(actions).await {
            Some(ToolbarAction::Cancel) | None => return,
            Some(other) => log::debug!("[SESSION] Ignoring {:?} while capturing", other),
        }
    }
}
