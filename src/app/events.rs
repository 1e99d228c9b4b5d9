//! Cross-surface event bus.
//!
//! Every overlay surface, the toolbar and the backend share one process-wide
//! bus. Delivery is at-most-once: a subscriber whose receiver was dropped is
//! pruned on the next publish and nothing is retried. Within one publisher,
//! each subscriber sees messages in publish order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::commands::capture_overlay::types::{CaptureKind, SharedSelection};
use crate::commands::video_recording::CaptureSessionState;
use crate::error::{SnapItError, SnapItResult};

/// `originMonitor`/`targetMonitor` value meaning "every surface".
pub const ALL_MONITORS: i32 = -1;

/// Who published a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub enum SurfaceId {
    Overlay(usize),
    Toolbar,
    /// Capture flow driving a confirmed session
    Session,
    Backend,
}

/// Payload of `reset-overlay`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct ResetOverlay {
    pub capture_kind: Option<CaptureKind>,
}

/// User choices reported by the floating toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ToolbarAction {
    Record,
    /// Capture the confirmed region as a screenshot instead of recording
    Screenshot,
    Redo,
    Cancel,
    Pause,
    Resume,
    Stop,
    /// Toolbar content changed size and needs repositioning
    Resized { width: u32, height: u32 },
}

/// One message per topic. Subscribers match exhaustively; new topics are new
/// variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(tag = "topic", content = "payload", rename_all = "kebab-case")]
pub enum OverlayEvent {
    SelectionUpdate(Option<SharedSelection>),
    SetCursorPassthrough {
        #[serde(rename = "originMonitor")]
        origin_monitor: i32,
        enable: bool,
    },
    RecordingStateChanged(CaptureSessionState),
    RecordingFormat(CaptureKind),
    ResetOverlay(Option<ResetOverlay>),
    ClearHoveredWindow {
        #[serde(rename = "targetMonitor")]
        target_monitor: i32,
    },
    ToolbarAction(ToolbarAction),
}

impl OverlayEvent {
    /// Wire name of the topic
    pub fn topic(&self) -> &'static str {
        match self {
            Self::SelectionUpdate(_) => "selection-update",
            Self::SetCursorPassthrough { .. } => "set-cursor-passthrough",
            Self::RecordingStateChanged(_) => "recording-state-changed",
            Self::RecordingFormat(_) => "recording-format",
            Self::ResetOverlay(_) => "reset-overlay",
            Self::ClearHoveredWindow { .. } => "clear-hovered-window",
            Self::ToolbarAction(_) => "toolbar-action",
        }
    }
}

/// A published message.
///
/// `stamp` is assigned by the bus and strictly increases across all
/// publishers, so it doubles as the last-writer-wins version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub stamp: u64,
    pub source: SurfaceId,
    pub event: OverlayEvent,
}

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<Vec<flume::Sender<Envelope>>>,
    next_stamp: AtomicU64,
}

/// Broadcast channel shared by all surfaces. Cheap to clone.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It only sees messages published after this call.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = flume::unbounded();
        self.inner.subscribers.lock().push(tx);
        Subscription { rx }
    }

    /// Fire-and-forget broadcast. Returns the stamp assigned to the message.
    pub fn publish(&self, source: SurfaceId, event: OverlayEvent) -> u64 {
        let mut subscribers = self.inner.subscribers.lock();
        let stamp = self.inner.next_stamp.fetch_add(1, Ordering::SeqCst) + 1;
        log::trace!("[BUS] #{} {:?} -> {}", stamp, source, event.topic());

        let envelope = Envelope {
            stamp,
            source,
            event,
        };
        subscribers.retain(|tx| tx.send(envelope.clone()).is_ok());
        stamp
    }

    /// Reserve a value from the stamp sequence without publishing. Used as a
    /// drag identity, so a newer drag always carries a larger id.
    pub fn allocate_id(&self) -> u64 {
        let _guard = self.inner.subscribers.lock();
        self.inner.next_stamp.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

/// Receiving end of one subscriber.
pub struct Subscription {
    rx: flume::Receiver<Envelope>,
}

impl Subscription {
    /// Next queued message, if any
    pub fn try_recv(&self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// All currently queued messages, in delivery order
    pub fn drain(&self) -> Vec<Envelope> {
        self.rx.try_iter().collect()
    }

    /// Wait for the next message.
    pub async fn recv(&self) -> SnapItResult<Envelope> {
        self.rx.recv_async().await.map_err(|_| SnapItError::BusClosed)
    }
}
