//! Per-monitor selection controller.
//!
//! One controller runs per overlay surface. It turns local pointer input and
//! bus messages into selection state, broadcasts every change that other
//! surfaces need to see, and returns effects (hit-test queries, a confirmed
//! target) for the surface runtime to carry out. It never blocks and never
//! talks to the backend directly.

use std::time::Instant;

use crate::app::events::{Envelope, EventBus, OverlayEvent, SurfaceId, ToolbarAction, ALL_MONITORS};
use crate::commands::capture_overlay::input::{Clock, HitTestRequest, HitTestThrottler, SystemClock};
use crate::commands::capture_overlay::state::{CursorState, DragOrigin, DragState};
use crate::commands::capture_overlay::types::{
    monitor_at, virtual_bounds, CaptureKind, ConfirmedRegion, MonitorDescriptor, Point, Rect,
    SharedSelection, WindowInfo, MIN_SELECTION_SIZE,
};
use crate::commands::video_recording::SessionMode;
use crate::config::FallbackTarget;

/// Pointer input in the surface's local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Point, shift: bool },
    Move { position: Point, button_held: bool, shift: bool },
    Up { position: Point },
    /// Pointer crossed into this surface, possibly mid-drag.
    Enter { position: Point, button_held: bool },
    Leave,
}

/// Work the surface runtime performs on behalf of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEffect {
    HitTest(HitTestRequest),
    /// Pointer released on a valid target; start the capture flow.
    Confirmed(ConfirmedRegion),
    /// Escape before anything was confirmed; close the overlay set.
    Dismiss,
}

/// What one surface should draw, in its local coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayView {
    pub crosshair: Option<Point>,
    /// Hovered window outline
    pub highlight: Option<Rect>,
    /// Visible part of the selection or confirmed target
    pub selection: Option<Rect>,
    /// Full size of the selection, shown in the dimension badge
    pub dimensions: Option<(u32, u32)>,
    pub passthrough: bool,
}

pub struct SelectorController<C: Clock = SystemClock> {
    monitor: MonitorDescriptor,
    monitors: Vec<MonitorDescriptor>,
    bus: EventBus,
    clock: C,
    fallback: FallbackTarget,
    capture_kind: CaptureKind,
    mode: SessionMode,
    drag: Option<DragState>,
    cursor: CursorState,
    /// Active selection owned by another surface
    foreign: Option<SharedSelection>,
    confirmed: Option<ConfirmedRegion>,
    /// Region another surface finished, shown once the session leaves Dragging
    finished: Option<Rect>,
    /// Stamp of the newest selection-update applied here
    selection_stamp: u64,
    passthrough: bool,
    hit_test: HitTestThrottler,
}

impl SelectorController<SystemClock> {
    pub fn new(
        monitor: MonitorDescriptor,
        monitors: Vec<MonitorDescriptor>,
        bus: EventBus,
        capture_kind: CaptureKind,
        fallback: FallbackTarget,
    ) -> Self {
        Self::with_clock(monitor, monitors, bus, capture_kind, fallback, SystemClock)
    }
}

impl<C: Clock> SelectorController<C> {
    pub fn with_clock(
        monitor: MonitorDescriptor,
        monitors: Vec<MonitorDescriptor>,
        bus: EventBus,
        capture_kind: CaptureKind,
        fallback: FallbackTarget,
        clock: C,
    ) -> Self {
        let hit_test = HitTestThrottler::new(monitor.index);
        Self {
            monitor,
            monitors,
            bus,
            clock,
            fallback,
            capture_kind,
            mode: SessionMode::Hover,
            drag: None,
            cursor: CursorState::default(),
            foreign: None,
            confirmed: None,
            finished: None,
            selection_stamp: 0,
            passthrough: false,
            hit_test,
        }
    }

    pub fn id(&self) -> SurfaceId {
        SurfaceId::Overlay(self.monitor.index)
    }

    pub fn monitor(&self) -> &MonitorDescriptor {
        &self.monitor
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn capture_kind(&self) -> CaptureKind {
        self.capture_kind
    }

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn foreign_selection(&self) -> Option<&SharedSelection> {
        self.foreign.as_ref()
    }

    pub fn hovered_window(&self) -> Option<&WindowInfo> {
        self.cursor.hovered_window.as_ref()
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }

    /// Next time `on_tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.hit_test.deadline()
    }

    fn index(&self) -> i32 {
        self.monitor.index as i32
    }

    fn broadcast(&self, event: OverlayEvent) -> u64 {
        self.bus.publish(self.id(), event)
    }

    fn broadcast_selection(&mut self, selection: Option<SharedSelection>) {
        self.selection_stamp = self.broadcast(OverlayEvent::SelectionUpdate(selection));
    }

    fn foreign_active(&self) -> Option<&SharedSelection> {
        self.foreign
            .as_ref()
            .filter(|s| s.is_active && s.origin_monitor_index != self.monitor.index)
    }

    fn stop_hover(&mut self) {
        self.hit_test.cancel();
        self.cursor.clear_hovered();
    }

    fn reset_local(&mut self) {
        self.drag = None;
        self.foreign = None;
        self.confirmed = None;
        self.finished = None;
        self.mode = SessionMode::Hover;
        self.passthrough = false;
        self.stop_hover();
    }

    // ========================================================================
    // Pointer input
    // ========================================================================

    pub fn on_pointer(&mut self, event: PointerEvent) -> Vec<ControllerEffect> {
        match event {
            PointerEvent::Down { position, shift } => self.on_down(position, shift),
            PointerEvent::Move {
                position,
                button_held,
                shift,
            } => self.on_move(position, button_held, shift),
            PointerEvent::Up { position } => self.on_up(position),
            PointerEvent::Enter {
                position,
                button_held,
            } => self.on_move(position, button_held, false),
            PointerEvent::Leave => {
                self.cursor.inside = false;
                // A drag in progress survives leaving; the pointer may come back.
                if self.mode != SessionMode::Dragging {
                    self.cursor.position = None;
                    self.stop_hover();
                }
                Vec::new()
            }
        }
    }

    fn on_down(&mut self, position: Point, shift: bool) -> Vec<ControllerEffect> {
        let global = self.monitor.to_global(position);
        self.cursor.set_position(global);
        self.cursor.button_held = true;

        if self.mode != SessionMode::Hover || self.passthrough {
            return Vec::new();
        }

        // Leaving Hover: no more hit-tests, but keep the highlight for a click.
        self.hit_test.cancel();
        self.foreign = None;
        self.finished = None;

        let drag = DragState::local(self.bus.allocate_id(), self.monitor.index, global, shift);
        log::debug!(
            "[OVERLAY] Monitor {} started drag {} at ({}, {})",
            self.monitor.index,
            drag.drag_id,
            global.x,
            global.y
        );
        let shared = drag.to_shared(true);
        self.drag = Some(drag);
        self.mode = SessionMode::Dragging;

        self.broadcast_selection(Some(shared));
        self.broadcast(OverlayEvent::SetCursorPassthrough {
            origin_monitor: self.index(),
            enable: true,
        });
        Vec::new()
    }

    fn on_move(&mut self, position: Point, button_held: bool, shift: bool) -> Vec<ControllerEffect> {
        let global = self.monitor.to_global(position);
        self.cursor.set_position(global);
        self.cursor.button_held = button_held;

        match self.mode {
            SessionMode::Dragging => {
                let Some(drag) = self.drag.as_mut() else {
                    return Vec::new();
                };
                if drag.origin == DragOrigin::Local {
                    drag.shift_held = shift;
                }
                if drag.update(global) {
                    self.cursor.clear_hovered();
                }
                let shared = drag.to_shared(true);
                self.broadcast_selection(Some(shared));
                Vec::new()
            }
            SessionMode::Hover => {
                if button_held {
                    if let Some(selection) = self.foreign_active().cloned() {
                        self.adopt(&selection, global);
                    }
                    return Vec::new();
                }
                if self.passthrough
                    || self.foreign_active().is_some()
                    || self.capture_kind != CaptureKind::Screenshot
                {
                    return Vec::new();
                }
                let now = self.clock.now();
                self.hit_test
                    .request(now, global)
                    .map(ControllerEffect::HitTest)
                    .into_iter()
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    fn on_up(&mut self, position: Point) -> Vec<ControllerEffect> {
        let global = self.monitor.to_global(position);
        self.cursor.set_position(global);
        self.cursor.button_held = false;

        if self.mode == SessionMode::Hover {
            // Released here after the drag crossed over without a move event.
            match self.foreign_active().cloned() {
                Some(selection) => self.adopt(&selection, global),
                None => return Vec::new(),
            }
        }
        if self.mode != SessionMode::Dragging {
            return Vec::new();
        }
        let Some(mut drag) = self.drag.take() else {
            return Vec::new();
        };
        drag.update(global);

        let target = self.resolve_target(&drag, global);

        self.broadcast_selection(Some(drag.to_shared(false)));
        self.broadcast(OverlayEvent::SetCursorPassthrough {
            origin_monitor: ALL_MONITORS,
            enable: false,
        });
        self.foreign = None;
        self.passthrough = false;
        self.hit_test.cancel();

        match target {
            Some(region) => {
                log::info!(
                    "[OVERLAY] Monitor {} confirmed {:?} ({}x{} at {}, {})",
                    self.monitor.index,
                    region.target,
                    region.bounds.width,
                    region.bounds.height,
                    region.bounds.x,
                    region.bounds.y
                );
                self.mode = SessionMode::Confirmed;
                self.confirmed = Some(region.clone());
                self.cursor.clear_hovered();
                vec![ControllerEffect::Confirmed(region)]
            }
            None => {
                log::debug!(
                    "[OVERLAY] Discarding selection below {}px",
                    MIN_SELECTION_SIZE
                );
                self.mode = SessionMode::Hover;
                self.cursor.clear_hovered();
                Vec::new()
            }
        }
    }

    /// Continue a drag that started on another surface.
    fn adopt(&mut self, selection: &SharedSelection, global: Point) {
        let mut drag = DragState::adopted(selection);
        drag.update(global);
        log::debug!(
            "[OVERLAY] Monitor {} adopted drag {} from monitor {}",
            self.monitor.index,
            drag.drag_id,
            selection.origin_monitor_index
        );
        let shared = drag.to_shared(true);
        self.drag = Some(drag);
        self.foreign = None;
        self.finished = None;
        self.mode = SessionMode::Dragging;
        self.stop_hover();
        self.broadcast_selection(Some(shared));
    }

    /// Capture target for a finished drag, or None when it is too small.
    fn resolve_target(&self, drag: &DragState, release: Point) -> Option<ConfirmedRegion> {
        let region = if drag.is_region() {
            ConfirmedRegion::region(drag.selection_rect())
        } else if let Some(window) = self.cursor.hovered_window.as_ref() {
            ConfirmedRegion::window(window)
        } else {
            self.fallback_target(release)?
        };
        Some(region).filter(|r| r.bounds.is_at_least(MIN_SELECTION_SIZE))
    }

    fn fallback_target(&self, release: Point) -> Option<ConfirmedRegion> {
        match self.fallback {
            FallbackTarget::HoveredMonitor => {
                let monitor = monitor_at(&self.monitors, release).unwrap_or(&self.monitor);
                Some(ConfirmedRegion::monitor(monitor))
            }
            FallbackTarget::AllMonitors => {
                virtual_bounds(&self.monitors).map(ConfirmedRegion::all_monitors)
            }
        }
    }

    /// Escape key.
    pub fn on_escape(&mut self) -> Vec<ControllerEffect> {
        match self.mode {
            SessionMode::Hover | SessionMode::Dragging => {
                if let Some(drag) = self.drag.take() {
                    self.broadcast_selection(Some(drag.to_shared(false)));
                    self.broadcast(OverlayEvent::SetCursorPassthrough {
                        origin_monitor: ALL_MONITORS,
                        enable: false,
                    });
                }
                self.reset_local();
                vec![ControllerEffect::Dismiss]
            }
            _ => {
                self.broadcast(OverlayEvent::ToolbarAction(ToolbarAction::Cancel));
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Bus input
    // ========================================================================

    pub fn on_bus(&mut self, envelope: &Envelope) {
        let own = envelope.source == self.id();
        match &envelope.event {
            OverlayEvent::SelectionUpdate(selection) => {
                if envelope.stamp < self.selection_stamp {
                    log::trace!(
                        "[OVERLAY] Monitor {} ignoring stale selection #{}",
                        self.monitor.index,
                        envelope.stamp
                    );
                    return;
                }
                self.selection_stamp = envelope.stamp;
                if !own {
                    self.apply_remote_selection(selection.clone());
                }
            }
            OverlayEvent::SetCursorPassthrough {
                origin_monitor,
                enable,
            } => {
                if *origin_monitor == ALL_MONITORS {
                    self.passthrough = false;
                } else if *origin_monitor != self.index() {
                    self.passthrough = *enable;
                    if *enable {
                        self.stop_hover();
                    }
                }
            }
            OverlayEvent::RecordingStateChanged(state) => {
                self.capture_kind = state.capture_kind;
                match &state.mode {
                    SessionMode::Hover => self.reset_local(),
                    // Drag state is owned by the surfaces, not the session.
                    SessionMode::Dragging => {}
                    mode => {
                        self.mode = mode.clone();
                        self.drag = None;
                        self.foreign = None;
                        self.stop_hover();
                    }
                }
            }
            OverlayEvent::RecordingFormat(kind) => {
                self.capture_kind = *kind;
                if *kind != CaptureKind::Screenshot {
                    self.stop_hover();
                }
            }
            OverlayEvent::ResetOverlay(reset) => {
                if let Some(kind) = reset.as_ref().and_then(|r| r.capture_kind) {
                    self.capture_kind = kind;
                }
                self.reset_local();
            }
            OverlayEvent::ClearHoveredWindow { target_monitor } => {
                if *target_monitor == ALL_MONITORS || *target_monitor == self.index() {
                    self.cursor.clear_hovered();
                }
            }
            OverlayEvent::ToolbarAction(_) => {}
        }
    }

    fn apply_remote_selection(&mut self, selection: Option<SharedSelection>) {
        let Some(selection) = selection else {
            // Explicit clear
            self.drag = None;
            self.foreign = None;
            self.finished = None;
            if self.mode == SessionMode::Dragging {
                self.mode = SessionMode::Hover;
            }
            return;
        };

        if !selection.is_active {
            let ours = self.drag.as_ref().map(|d| d.drag_id) == Some(selection.drag_id)
                || self.foreign.as_ref().map(|s| s.drag_id) == Some(selection.drag_id);
            let rect = selection.rect();
            if ours && rect.is_at_least(MIN_SELECTION_SIZE) {
                self.finished = Some(rect);
            }
            if self.drag.as_ref().map(|d| d.drag_id) == Some(selection.drag_id) {
                self.drag = None;
                if self.mode == SessionMode::Dragging {
                    self.mode = SessionMode::Hover;
                }
            }
            if self.foreign.as_ref().map(|s| s.drag_id) == Some(selection.drag_id) {
                self.foreign = None;
            }
            return;
        }

        if let Some(drag) = self.drag.as_mut() {
            if drag.drag_id == selection.drag_id {
                // The pointer moved on to another surface; keep our copy current.
                drag.update(selection.end_point);
            } else if selection.drag_id > drag.drag_id {
                log::debug!(
                    "[OVERLAY] Monitor {} abandoning drag {} for newer drag {}",
                    self.monitor.index,
                    drag.drag_id,
                    selection.drag_id
                );
                self.drag = None;
                self.mode = SessionMode::Hover;
            } else {
                return;
            }
        }

        if let Some(cached) = self.foreign.as_ref() {
            if selection.drag_id < cached.drag_id {
                return;
            }
        }
        self.foreign = Some(selection);
        self.stop_hover();

        if self.mode == SessionMode::Hover && self.cursor.inside && self.cursor.button_held {
            if let (Some(selection), Some(global)) =
                (self.foreign_active().cloned(), self.cursor.position)
            {
                self.adopt(&selection, global);
            }
        }
    }

    // ========================================================================
    // Hit-testing
    // ========================================================================

    /// Apply a backend answer. Stale answers and answers arriving after the
    /// surface stopped hovering are dropped.
    pub fn on_hit_test_result(&mut self, request: &HitTestRequest, window: Option<WindowInfo>) {
        if !self.hit_test.is_latest(request) {
            log::trace!(
                "[OVERLAY] Monitor {} dropping stale hit-test {}",
                self.monitor.index,
                request.seq
            );
            return;
        }
        if self.mode != SessionMode::Hover
            || !self.cursor.inside
            || self.passthrough
            || self.foreign_active().is_some()
        {
            return;
        }
        self.cursor.hovered_window = window;
    }

    /// Fire the trailing hit-test if it is due.
    pub fn on_tick(&mut self) -> Vec<ControllerEffect> {
        let now = self.clock.now();
        match self.hit_test.poll(now) {
            Some(request) if self.mode == SessionMode::Hover && self.cursor.inside => {
                vec![ControllerEffect::HitTest(request)]
            }
            Some(_) => {
                self.hit_test.cancel();
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Render model
    // ========================================================================

    pub fn view(&self) -> OverlayView {
        let global_selection = if let Some(drag) = self.drag.as_ref() {
            drag.is_region().then(|| drag.selection_rect())
        } else if let Some(selection) = self.foreign.as_ref().filter(|s| s.is_active) {
            Some(selection.rect())
        } else if let Some(confirmed) = self.confirmed.as_ref() {
            Some(confirmed.bounds)
        } else if matches!(self.mode, SessionMode::Hover | SessionMode::Dragging) {
            None
        } else {
            self.finished
        };

        let clip = |r: Rect| {
            r.intersect(&self.monitor.bounds())
                .map(|r| self.monitor.rect_to_local(r))
        };

        let crosshair = if self.mode == SessionMode::Hover
            && self.cursor.inside
            && self.foreign_active().is_none()
            && !self.passthrough
        {
            self.cursor.position.map(|p| self.monitor.to_local(p))
        } else {
            None
        };

        OverlayView {
            crosshair,
            highlight: self
                .cursor
                .hovered_window
                .as_ref()
                .and_then(|w| clip(w.bounds)),
            selection: global_selection.and_then(clip),
            dimensions: global_selection.map(|r| (r.width, r.height)),
            passthrough: self.passthrough,
        }
    }
}
