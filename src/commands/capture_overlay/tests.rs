//! Multi-monitor protocol tests.
//!
//! Several controllers share one bus, the way separate overlay surfaces do.
//! Delivery is pumped by hand so tests can hold messages back and reproduce
//! cross-publisher races.

#[cfg(test)]
mod protocol_tests {
    use std::time::Duration;

    use crate::app::events::{
        Envelope, EventBus, OverlayEvent, ResetOverlay, Subscription, SurfaceId, ALL_MONITORS,
    };
    use crate::commands::capture_overlay::controller::{
        ControllerEffect, PointerEvent, SelectorController,
    };
    use crate::commands::capture_overlay::input::{HitTestArbiter, ManualClock};
    use crate::commands::capture_overlay::types::*;
    use crate::commands::video_recording::{CaptureSessionState, SessionMode};
    use crate::config::FallbackTarget;

    struct Surface {
        controller: SelectorController<ManualClock>,
        inbox: Subscription,
    }

    struct Desk {
        bus: EventBus,
        clock: ManualClock,
        surfaces: Vec<Surface>,
    }

    impl Desk {
        fn new(monitors: Vec<MonitorDescriptor>, kind: CaptureKind, fallback: FallbackTarget) -> Self {
            let bus = EventBus::new();
            let clock = ManualClock::new();
            let surfaces = monitors
                .iter()
                .map(|m| Surface {
                    controller: SelectorController::with_clock(
                        m.clone(),
                        monitors.clone(),
                        bus.clone(),
                        kind,
                        fallback,
                        clock.clone(),
                    ),
                    inbox: bus.subscribe(),
                })
                .collect();
            Self {
                bus,
                clock,
                surfaces,
            }
        }

        /// Two 1920x1080 monitors side by side.
        fn dual(kind: CaptureKind) -> Self {
            Self::new(
                vec![
                    MonitorDescriptor::new(0, 0, 0, 1920, 1080),
                    MonitorDescriptor::new(1, 1920, 0, 1920, 1080),
                ],
                kind,
                FallbackTarget::HoveredMonitor,
            )
        }

        fn ctl(&mut self, index: usize) -> &mut SelectorController<ManualClock> {
            &mut self.surfaces[index].controller
        }

        fn input(&mut self, index: usize, event: PointerEvent) -> Vec<ControllerEffect> {
            self.ctl(index).on_pointer(event)
        }

        /// Deliver queued messages to one surface only.
        fn pump_one(&mut self, index: usize) {
            let surface = &mut self.surfaces[index];
            for envelope in surface.inbox.drain() {
                surface.controller.on_bus(&envelope);
            }
        }

        /// Deliver until every inbox is empty.
        fn pump(&mut self) {
            loop {
                let mut delivered = false;
                for surface in &mut self.surfaces {
                    for envelope in surface.inbox.drain() {
                        delivered = true;
                        surface.controller.on_bus(&envelope);
                    }
                }
                if !delivered {
                    break;
                }
            }
        }

        fn active_drags(&self) -> usize {
            self.surfaces
                .iter()
                .filter(|s| s.controller.drag().is_some())
                .count()
        }
    }

    fn down(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            shift: false,
        }
    }

    fn held(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
            button_held: true,
            shift: false,
        }
    }

    fn hover(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Move {
            position: Point::new(x, y),
            button_held: false,
            shift: false,
        }
    }

    fn enter_held(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Enter {
            position: Point::new(x, y),
            button_held: true,
        }
    }

    fn up(x: i32, y: i32) -> PointerEvent {
        PointerEvent::Up {
            position: Point::new(x, y),
        }
    }

    fn confirmed(effects: &[ControllerEffect]) -> Option<&ConfirmedRegion> {
        effects.iter().find_map(|e| match e {
            ControllerEffect::Confirmed(r) => Some(r),
            _ => None,
        })
    }

    // ========================================================================
    // Handoff
    // ========================================================================

    #[test]
    fn handoff_yields_same_region_as_single_surface_drag() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);

        desk.input(0, down(1800, 500));
        desk.input(0, held(1900, 550));
        desk.pump();
        desk.input(0, PointerEvent::Leave);

        desk.input(1, enter_held(0, 560));
        desk.pump();
        desk.input(1, held(80, 600));
        desk.pump();

        // Both surfaces render their part of the same rectangle
        assert_eq!(
            desk.ctl(1).view().selection,
            Some(Rect::new(0, 500, 80, 100))
        );
        assert_eq!(
            desk.ctl(0).view().selection,
            Some(Rect::new(1800, 500, 120, 100))
        );

        let effects = desk.input(1, up(80, 600));
        let handed_off = confirmed(&effects).cloned().unwrap();
        desk.pump();

        // Same gesture on one surface spanning the whole desktop
        let mut single = Desk::new(
            vec![MonitorDescriptor::new(0, 0, 0, 3840, 1080)],
            CaptureKind::Screenshot,
            FallbackTarget::HoveredMonitor,
        );
        single.input(0, down(1800, 500));
        single.input(0, held(1900, 550));
        single.input(0, held(2000, 600));
        let effects = single.input(0, up(2000, 600));
        let direct = confirmed(&effects).cloned().unwrap();

        assert_eq!(handed_off, direct);
        assert_eq!(handed_off.bounds, Rect::new(1800, 500, 200, 100));

        assert_eq!(desk.active_drags(), 0);
        assert_eq!(*desk.ctl(0).mode(), SessionMode::Hover);
        assert!(desk.ctl(0).foreign_selection().is_none());
    }

    #[test]
    fn release_without_move_on_second_surface_finishes_drag() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.input(0, down(1800, 500));
        desk.input(0, held(1900, 550));
        desk.pump();

        let effects = desk.input(1, up(80, 600));
        assert_eq!(
            confirmed(&effects).map(|r| r.bounds),
            Some(Rect::new(1800, 500, 200, 100))
        );

        desk.pump();
        assert_eq!(desk.active_drags(), 0);
    }

    #[test]
    fn release_on_second_surface_broadcasts_inactive_and_reset() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        let observer = desk.bus.subscribe();
        desk.input(0, down(1800, 500));
        desk.input(0, held(1900, 550));
        desk.pump();
        desk.input(1, enter_held(10, 560));
        observer.drain();

        desk.input(1, up(80, 600));
        let events: Vec<Envelope> = observer.drain();
        assert!(matches!(
            &events[0].event,
            OverlayEvent::SelectionUpdate(Some(s)) if !s.is_active && s.origin_monitor_index == 0
        ));
        assert_eq!(
            events[1].event,
            OverlayEvent::SetCursorPassthrough {
                origin_monitor: ALL_MONITORS,
                enable: false
            }
        );
        assert_eq!(events[1].source, SurfaceId::Overlay(1));
    }

    #[test]
    fn pointer_returning_to_origin_keeps_drag() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.input(0, down(1800, 500));
        desk.input(0, held(1900, 550));
        desk.pump();
        desk.input(0, PointerEvent::Leave);
        desk.input(1, enter_held(20, 560));
        desk.pump();
        desk.input(1, PointerEvent::Leave);

        // Back on A with the button still down
        desk.input(0, enter_held(1850, 600));
        desk.pump();
        let effects = desk.input(0, up(1850, 600));
        assert_eq!(
            confirmed(&effects).map(|r| r.bounds),
            Some(Rect::new(1800, 500, 50, 100))
        );
        desk.pump();
        assert_eq!(desk.active_drags(), 0);
    }

    // ========================================================================
    // Split-brain
    // ========================================================================

    #[test]
    fn new_drag_elsewhere_invalidates_older_drag() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.input(0, down(100, 100));
        desk.input(0, held(300, 300));
        desk.input(0, PointerEvent::Leave);

        // B has not seen A's messages yet and starts its own drag
        desk.input(1, down(500, 500));
        assert_eq!(desk.active_drags(), 2);

        desk.pump();
        assert_eq!(desk.active_drags(), 1);
        assert!(desk.ctl(0).drag().is_none());
        assert_eq!(*desk.ctl(0).mode(), SessionMode::Hover);
        assert!(desk.ctl(1).drag().is_some());
        assert_eq!(
            desk.ctl(0).foreign_selection().map(|s| s.origin_monitor_index),
            Some(1)
        );
    }

    #[test]
    fn third_surface_follows_newest_drag() {
        let mut desk = Desk::new(
            vec![
                MonitorDescriptor::new(0, 0, 0, 1920, 1080),
                MonitorDescriptor::new(1, 1920, 0, 1920, 1080),
                MonitorDescriptor::new(2, 3840, 0, 1920, 1080),
            ],
            CaptureKind::Screenshot,
            FallbackTarget::HoveredMonitor,
        );
        desk.input(0, down(100, 100));
        desk.input(0, PointerEvent::Leave);
        desk.input(1, down(100, 100));
        desk.pump();

        let newest = desk.ctl(1).drag().map(|d| d.drag_id);
        assert_eq!(
            desk.ctl(2).foreign_selection().map(|s| s.drag_id),
            newest
        );
    }

    #[test]
    fn stale_selection_update_is_discarded() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.input(0, down(100, 100));
        desk.input(0, held(400, 400));
        desk.pump();
        let current = desk.ctl(1).foreign_selection().cloned().unwrap();

        let stale = Envelope {
            stamp: 1,
            source: SurfaceId::Overlay(0),
            event: OverlayEvent::SelectionUpdate(Some(SharedSelection {
                end_point: Point::new(120, 120),
                ..current.clone()
            })),
        };
        desk.ctl(1).on_bus(&stale);
        assert_eq!(desk.ctl(1).foreign_selection(), Some(&current));
    }

    // ========================================================================
    // Noise and passthrough
    // ========================================================================

    #[test]
    fn tiny_cross_monitor_selection_is_discarded() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.input(0, down(1915, 500));
        desk.input(0, held(1919, 506));
        desk.pump();
        desk.input(1, enter_held(2, 507));
        let effects = desk.input(1, up(2, 507));
        assert!(confirmed(&effects).is_none());

        desk.pump();
        assert_eq!(desk.active_drags(), 0);
        for i in 0..2 {
            assert_eq!(*desk.ctl(i).mode(), SessionMode::Hover);
            assert!(!desk.ctl(i).is_passthrough());
        }
    }

    #[test]
    fn passthrough_blocks_new_drags_and_hover_elsewhere() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.input(0, down(100, 100));
        desk.pump();
        assert!(desk.ctl(1).is_passthrough());
        assert!(!desk.ctl(0).is_passthrough());

        assert!(desk.input(1, hover(300, 300)).is_empty());
        desk.input(1, down(300, 300));
        assert!(desk.ctl(1).drag().is_none());
        desk.input(1, hover(310, 300));

        desk.input(0, held(400, 400));
        desk.input(0, up(400, 400));
        desk.pump();
        assert!(!desk.ctl(1).is_passthrough());
    }

    // ========================================================================
    // Hit-testing across monitors
    // ========================================================================

    #[test]
    fn most_recent_hit_test_wins_across_monitors() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        let arbiter = HitTestArbiter::new();
        let window = |id: u32, x: i32| WindowInfo {
            id,
            title: format!("w{}", id),
            app_name: "app".to_string(),
            bounds: Rect::new(x, 0, 500, 500),
        };

        let req_a = match desk.input(0, hover(100, 100)).remove(0) {
            ControllerEffect::HitTest(r) => r,
            other => panic!("unexpected {:?}", other),
        };
        desk.clock.advance(Duration::from_millis(5));
        let req_b = match desk.input(1, hover(100, 100)).remove(0) {
            ControllerEffect::HitTest(r) => r,
            other => panic!("unexpected {:?}", other),
        };

        arbiter.register(&req_a);
        // A's highlight arrives first
        let a_result = arbiter.resolve(&req_a, Some(window(1, 0)));
        desk.ctl(0).on_hit_test_result(&req_a, a_result);

        let lost = arbiter.register(&req_b);
        assert_eq!(lost, Some(0));
        desk.bus.publish(
            SurfaceId::Backend,
            OverlayEvent::ClearHoveredWindow {
                target_monitor: lost.unwrap() as i32,
            },
        );
        let b_result = arbiter.resolve(&req_b, Some(window(2, 1920)));
        desk.ctl(1).on_hit_test_result(&req_b, b_result);
        desk.pump();

        assert!(desk.ctl(0).hovered_window().is_none());
        assert_eq!(desk.ctl(1).hovered_window().map(|w| w.id), Some(2));
    }

    // ========================================================================
    // Session broadcasts
    // ========================================================================

    #[test]
    fn confirmed_region_stays_visible_on_every_monitor_it_spans() {
        let mut desk = Desk::dual(CaptureKind::Video);
        desk.input(0, down(1800, 500));
        desk.input(0, held(1900, 550));
        desk.pump();
        desk.input(0, PointerEvent::Leave);
        desk.input(1, enter_held(0, 560));
        desk.input(1, held(80, 600));
        let effects = desk.input(1, up(80, 600));
        assert!(confirmed(&effects).is_some());
        desk.pump();

        // The toolbar flow announces Confirmed and waits for a choice
        desk.bus.publish(
            SurfaceId::Session,
            OverlayEvent::RecordingStateChanged(CaptureSessionState {
                mode: SessionMode::Confirmed,
                capture_kind: CaptureKind::Video,
            }),
        );
        desk.pump();

        assert_eq!(
            desk.ctl(0).view().selection,
            Some(Rect::new(1800, 500, 120, 100))
        );
        assert_eq!(
            desk.ctl(1).view().selection,
            Some(Rect::new(0, 500, 80, 100))
        );

        desk.bus.publish(
            SurfaceId::Session,
            OverlayEvent::RecordingStateChanged(CaptureSessionState::hover(CaptureKind::Video)),
        );
        desk.pump();
        for i in 0..2 {
            assert!(desk.ctl(i).view().selection.is_none());
        }
    }

    #[test]
    fn click_confirmation_leaves_other_monitors_clear() {
        let mut desk = Desk::dual(CaptureKind::Video);
        desk.input(1, down(300, 300));
        let effects = desk.input(1, up(302, 301));
        assert!(confirmed(&effects).is_some());
        desk.pump();

        desk.bus.publish(
            SurfaceId::Session,
            OverlayEvent::RecordingStateChanged(CaptureSessionState {
                mode: SessionMode::Confirmed,
                capture_kind: CaptureKind::Video,
            }),
        );
        desk.pump();
        assert!(desk.ctl(0).view().selection.is_none());
    }

    #[test]
    fn hover_state_resets_every_surface() {
        let mut desk = Desk::dual(CaptureKind::Video);
        desk.input(0, down(100, 100));
        desk.input(0, held(600, 400));
        let effects = desk.input(0, up(600, 400));
        assert!(confirmed(&effects).is_some());
        desk.pump();

        desk.bus.publish(
            SurfaceId::Session,
            OverlayEvent::RecordingStateChanged(CaptureSessionState {
                mode: SessionMode::Recording {
                    started_at: String::new(),
                    elapsed_secs: 1.0,
                },
                capture_kind: CaptureKind::Video,
            }),
        );
        desk.pump();
        assert!(desk.ctl(1).mode().is_recording_phase());
        // Overlay input is inert while recording
        assert!(desk.input(1, down(10, 10)).is_empty());

        desk.bus.publish(SurfaceId::Session, OverlayEvent::SelectionUpdate(None));
        desk.bus.publish(
            SurfaceId::Session,
            OverlayEvent::RecordingStateChanged(CaptureSessionState::hover(CaptureKind::Video)),
        );
        desk.pump();
        for i in 0..2 {
            assert_eq!(*desk.ctl(i).mode(), SessionMode::Hover);
            assert!(desk.ctl(i).view().selection.is_none());
        }
    }

    #[test]
    fn reset_overlay_switches_capture_kind() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.bus.publish(
            SurfaceId::Backend,
            OverlayEvent::ResetOverlay(Some(ResetOverlay {
                capture_kind: Some(CaptureKind::Gif),
            })),
        );
        desk.pump();
        for i in 0..2 {
            assert_eq!(desk.ctl(i).capture_kind(), CaptureKind::Gif);
        }
        // No window hit-testing outside screenshot mode
        assert!(desk.input(0, hover(50, 50)).is_empty());
    }

    #[test]
    fn click_fallback_uses_all_monitors_when_configured() {
        let mut desk = Desk::new(
            vec![
                MonitorDescriptor::new(0, 0, 0, 1920, 1080),
                MonitorDescriptor::new(1, 1920, -200, 1280, 1024),
            ],
            CaptureKind::Screenshot,
            FallbackTarget::AllMonitors,
        );
        desk.input(1, down(100, 100));
        let effects = desk.input(1, up(100, 100));
        assert_eq!(
            confirmed(&effects).cloned(),
            Some(ConfirmedRegion::all_monitors(Rect::new(0, -200, 3200, 1280)))
        );
    }

    #[test]
    fn delayed_delivery_to_one_surface_still_converges() {
        let mut desk = Desk::dual(CaptureKind::Screenshot);
        desk.input(0, down(100, 100));
        desk.input(0, held(500, 500));
        desk.pump_one(0);
        let effects = desk.input(0, up(500, 500));
        assert!(confirmed(&effects).is_some());

        // B only now sees the whole drag, ending inactive
        desk.pump_one(1);
        assert!(desk
            .ctl(1)
            .foreign_selection()
            .map_or(true, |s| !s.is_active));
        assert!(!desk.ctl(1).is_passthrough());
    }
}
