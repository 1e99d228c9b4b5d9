//! Overlay surface runtime and overlay set lifecycle.
//!
//! Each monitor gets one task that owns a [`SelectorController`] and feeds it
//! pointer input, bus messages, hit-test answers and throttle deadlines. The
//! task never waits on the backend itself: hit-tests and capture flows run as
//! separate tasks and report back over channels or the bus.
//!
//! How each session ended is reported once through [`OverlaySet::next_outcome`].

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::controller::{ControllerEffect, OverlayView, PointerEvent, SelectorController};
use super::input::{Clock, HitTestRequest};
use super::types::{CaptureKind, MonitorDescriptor, WindowInfo};
use crate::app::events::{EventBus, OverlayEvent, Subscription};
use crate::commands::capture::CaptureBackend;
use crate::commands::video_recording::{CaptureFlow, FlowOutcome};
use crate::config::{get_overlay_config, OverlayConfig};
use crate::error::{SnapItError, SnapItResult};

/// Clock that follows tokio's timer, so paused test time applies to throttling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Local input delivered to one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceInput {
    Pointer(PointerEvent),
    Escape,
}

type HitTestAnswer = (HitTestRequest, Option<WindowInfo>);

/// Handle to one running overlay surface.
pub struct SurfaceHandle {
    monitor: MonitorDescriptor,
    input: flume::Sender<SurfaceInput>,
    view: Arc<Mutex<OverlayView>>,
    task: JoinHandle<()>,
}

impl SurfaceHandle {
    pub fn monitor(&self) -> &MonitorDescriptor {
        &self.monitor
    }

    pub fn send(&self, input: SurfaceInput) -> SnapItResult<()> {
        self.input.send(input).map_err(|_| SnapItError::BusClosed)
    }

    pub fn pointer(&self, event: PointerEvent) -> SnapItResult<()> {
        self.send(SurfaceInput::Pointer(event))
    }

    /// Latest render model
    pub fn view(&self) -> OverlayView {
        self.view.lock().clone()
    }
}

struct Surface<B: CaptureBackend> {
    controller: SelectorController<TokioClock>,
    backend: Arc<B>,
    bus: EventBus,
    monitors: Vec<MonitorDescriptor>,
    config: OverlayConfig,
    view: Arc<Mutex<OverlayView>>,
    hit_tx: flume::Sender<HitTestAnswer>,
    outcome_tx: flume::Sender<FlowOutcome>,
}

impl<B: CaptureBackend> Surface<B> {
    fn execute(&mut self, effects: Vec<ControllerEffect>) {
        for effect in effects {
            match effect {
                ControllerEffect::HitTest(request) => {
                    let backend = self.backend.clone();
                    let tx = self.hit_tx.clone();
                    tokio::spawn(async move {
                        let window = match backend
                            .hit_test_window_at(request.point, request.monitor_index)
                            .await
                        {
                            Ok(window) => window,
                            Err(e) => {
                                log::warn!("[HIT_TEST] Query failed: {}", e);
                                None
                            }
                        };
                        // Surface may be gone by now
                        let _ = tx.send((request, window));
                    });
                }
                ControllerEffect::Confirmed(region) => {
                    let actions = self.bus.subscribe();
                    let flow = CaptureFlow::new(
                        self.backend.clone(),
                        self.bus.clone(),
                        self.controller.capture_kind(),
                        self.monitors.clone(),
                        self.config.clone(),
                    );
                    let outcome_tx = self.outcome_tx.clone();
                    tokio::spawn(async move {
                        let outcome = flow.run(region, actions).await;
                        log::debug!("[SESSION] Flow finished: {:?}", outcome);
                        let _ = outcome_tx.send(outcome);
                    });
                }
                ControllerEffect::Dismiss => {
                    log::info!(
                        "[OVERLAY] Monitor {} dismissed the overlay",
                        self.controller.monitor().index
                    );
                    self.bus
                        .publish(self.controller.id(), OverlayEvent::ResetOverlay(None));
                    let _ = self.outcome_tx.send(FlowOutcome::Cancelled);
                    let backend = self.backend.clone();
                    tokio::spawn(async move {
                        if let Err(e) = backend.hide_overlay_set(true).await {
                            log::warn!("[OVERLAY] Failed to hide overlay set: {}", e);
                        }
                    });
                }
            }
        }
        *self.view.lock() = self.controller.view();
    }

    async fn run(
        mut self,
        inputs: flume::Receiver<SurfaceInput>,
        subscription: Subscription,
        hit_rx: flume::Receiver<HitTestAnswer>,
        token: CancellationToken,
    ) {
        let index = self.controller.monitor().index;
        log::debug!("[OVERLAY] Surface {} started", index);

        loop {
            let deadline = self
                .controller
                .next_deadline()
                .map(tokio::time::Instant::from_std);
            let tick = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => futures::future::pending::<()>().await,
                }
            };

            let effects = tokio::select! {
                _ = token.cancelled() => break,
                input = inputs.recv_async() => match input {
                    Ok(SurfaceInput::Pointer(event)) => self.controller.on_pointer(event),
                    Ok(SurfaceInput::Escape) => self.controller.on_escape(),
                    Err(_) => break,
                },
                envelope = subscription.recv() => match envelope {
                    Ok(envelope) => {
                        self.controller.on_bus(&envelope);
                        Vec::new()
                    }
                    Err(_) => break,
                },
                answer = hit_rx.recv_async() => match answer {
                    Ok((request, window)) => {
                        self.controller.on_hit_test_result(&request, window);
                        Vec::new()
                    }
                    Err(_) => Vec::new(),
                },
                _ = tick => self.controller.on_tick(),
            };
            self.execute(effects);
        }

        log::debug!("[OVERLAY] Surface {} stopped", index);
    }
}

/// All overlay surfaces of one capture session, one per monitor.
pub struct OverlaySet {
    surfaces: Vec<SurfaceHandle>,
    outcomes: flume::Receiver<FlowOutcome>,
    token: CancellationToken,
}

impl OverlaySet {
    /// Enumerate monitors and start one surface per monitor, using the
    /// current global configuration.
    pub async fn show<B: CaptureBackend>(
        backend: Arc<B>,
        bus: EventBus,
        capture_kind: CaptureKind,
    ) -> SnapItResult<Self> {
        Self::show_with_config(backend, bus, capture_kind, get_overlay_config()).await
    }

    pub async fn show_with_config<B: CaptureBackend>(
        backend: Arc<B>,
        bus: EventBus,
        capture_kind: CaptureKind,
        config: OverlayConfig,
    ) -> SnapItResult<Self> {
        let monitors = backend.enumerate_monitors().await?;
        if monitors.is_empty() {
            return Err(SnapItError::MonitorNotFound { index: 0 });
        }
        log::info!(
            "[OVERLAY] Showing {} surfaces for {:?}",
            monitors.len(),
            capture_kind
        );

        let token = CancellationToken::new();
        let (outcome_tx, outcomes) = flume::unbounded();
        let surfaces = monitors
            .iter()
            .map(|monitor| {
                let (input_tx, input_rx) = flume::unbounded();
                let (hit_tx, hit_rx) = flume::unbounded();
                let view = Arc::new(Mutex::new(OverlayView::default()));
                // Subscribe before the task starts so nothing published from
                // here on is missed.
                let subscription = bus.subscribe();

                let surface = Surface {
                    controller: SelectorController::with_clock(
                        monitor.clone(),
                        monitors.clone(),
                        bus.clone(),
                        capture_kind,
                        config.fallback_target,
                        TokioClock,
                    ),
                    backend: backend.clone(),
                    bus: bus.clone(),
                    monitors: monitors.clone(),
                    config: config.clone(),
                    view: view.clone(),
                    hit_tx,
                    outcome_tx: outcome_tx.clone(),
                };
                let task = tokio::spawn(surface.run(
                    input_rx,
                    subscription,
                    hit_rx,
                    token.child_token(),
                ));

                SurfaceHandle {
                    monitor: monitor.clone(),
                    input: input_tx,
                    view,
                    task,
                }
            })
            .collect();

        Ok(Self {
            surfaces,
            outcomes,
            token,
        })
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    pub fn surfaces(&self) -> &[SurfaceHandle] {
        &self.surfaces
    }

    pub fn surface(&self, monitor_index: usize) -> SnapItResult<&SurfaceHandle> {
        self.surfaces
            .iter()
            .find(|s| s.monitor.index == monitor_index)
            .ok_or(SnapItError::MonitorNotFound {
                index: monitor_index,
            })
    }

    /// Wait for the next session to end: a capture flow finishing in any way,
    /// or Escape dismissing the set before anything was confirmed.
    ///
    /// Fails with `BusClosed` once every surface has stopped and no outcome
    /// is queued.
    pub async fn next_outcome(&self) -> SnapItResult<FlowOutcome> {
        self.outcomes
            .recv_async()
            .await
            .map_err(|_| SnapItError::BusClosed)
    }

    /// Stop every surface task and wait for them to exit.
    pub async fn shutdown(self) {
        self.token.cancel();
        for surface in self.surfaces {
            if let Err(e) = surface.task.await {
                log::warn!("[OVERLAY] Surface task ended abnormally: {}", e);
            }
        }
        log::debug!("[OVERLAY] Overlay set shut down");
    }
}
