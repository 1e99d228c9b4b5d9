//! Type definitions for the capture overlay system.
//!
//! Geometry primitives, monitor descriptors and the selection values that are
//! replicated across overlay surfaces. All coordinates are integer pixels in
//! the global (virtual screen) space unless a method says otherwise.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::commands::video_recording::RecordingFormat;

// ============================================================================
// Constants
// ============================================================================

/// Minimum drag distance before a press is reclassified as a region drag
pub const DRAG_THRESHOLD: i32 = 5;

/// Targets smaller than this (in either dimension) are discarded as noise
pub const MIN_SELECTION_SIZE: u32 = 10;

/// Minimum spacing between two dispatched hit-test queries
pub const HIT_TEST_INTERVAL_MS: u64 = 100;

// ============================================================================
// Geometry Types
// ============================================================================

/// A point with integer coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A rectangle with non-negative size.
///
/// `right()` and `bottom()` are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized rectangle spanning two corners, in any drag direction.
    pub fn from_points(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self {
            x: left,
            y: top,
            width: (a.x.max(b.x) - left) as u32,
            height: (a.y.max(b.y) - top) as u32,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width as i32) / 2,
            self.y + (self.height as i32) / 2,
        )
    }

    /// Check if a point is inside the rectangle (exclusive of right/bottom edges)
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }

    /// Overlapping area of two rectangles, or None when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::from_points(
            Point::new(left, top),
            Point::new(right, bottom),
        ))
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_points(
            Point::new(self.x.min(other.x), self.y.min(other.y)),
            Point::new(self.right().max(other.right()), self.bottom().max(other.bottom())),
        )
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// True when both dimensions reach `min`.
    pub fn is_at_least(&self, min: u32) -> bool {
        self.width >= min && self.height >= min
    }
}

// ============================================================================
// Monitors and Windows
// ============================================================================

/// One physical display. Immutable for the lifetime of an overlay set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct MonitorDescriptor {
    pub index: usize,
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
    pub scale_factor: f64,
}

impl MonitorDescriptor {
    pub fn new(index: usize, origin_x: i32, origin_y: i32, width: u32, height: u32) -> Self {
        Self {
            index,
            origin_x,
            origin_y,
            width,
            height,
            scale_factor: 1.0,
        }
    }

    /// Monitor bounds in global coordinates
    pub fn bounds(&self) -> Rect {
        Rect::new(self.origin_x, self.origin_y, self.width, self.height)
    }

    pub fn contains(&self, global: Point) -> bool {
        self.bounds().contains(global)
    }

    /// Convert global coordinates to this surface's local coordinates
    pub fn to_local(&self, global: Point) -> Point {
        global.offset(-self.origin_x, -self.origin_y)
    }

    /// Convert this surface's local coordinates to global coordinates
    pub fn to_global(&self, local: Point) -> Point {
        local.offset(self.origin_x, self.origin_y)
    }

    pub fn rect_to_local(&self, r: Rect) -> Rect {
        r.offset(-self.origin_x, -self.origin_y)
    }

    pub fn rect_to_global(&self, r: Rect) -> Rect {
        r.offset(self.origin_x, self.origin_y)
    }
}

/// Find the monitor containing a global point.
pub fn monitor_at(monitors: &[MonitorDescriptor], global: Point) -> Option<&MonitorDescriptor> {
    monitors.iter().find(|m| m.contains(global))
}

/// Bounding box of all monitors combined.
pub fn virtual_bounds(monitors: &[MonitorDescriptor]) -> Option<Rect> {
    monitors
        .iter()
        .map(MonitorDescriptor::bounds)
        .reduce(|acc, r| acc.union(&r))
}

/// Top-level window under a screen point, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub id: u32,
    pub title: String,
    pub app_name: String,
    pub bounds: Rect,
}

// ============================================================================
// Capture Types
// ============================================================================

/// The type of capture being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub enum CaptureKind {
    #[default]
    Screenshot,
    Video,
    Gif,
}

impl CaptureKind {
    /// Check if this capture kind involves recording
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Video | Self::Gif)
    }

    /// Output format for recording kinds
    pub fn recording_format(&self) -> Option<RecordingFormat> {
        match self {
            Self::Screenshot => None,
            Self::Video => Some(RecordingFormat::Mp4),
            Self::Gif => Some(RecordingFormat::Gif),
        }
    }
}

impl From<&str> for CaptureKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "video" => Self::Video,
            "gif" => Self::Gif,
            _ => Self::Screenshot,
        }
    }
}

/// What the backend should capture or record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaptureTarget {
    /// A screen region in global coordinates.
    Region(Rect),
    /// A specific top-level window.
    Window {
        #[serde(rename = "windowId")]
        window_id: u32,
    },
    /// A whole monitor.
    Monitor {
        #[serde(rename = "monitorIndex")]
        monitor_index: usize,
    },
    /// All monitors combined.
    AllMonitors,
}

// ============================================================================
// Selection Values
// ============================================================================

/// Cross-monitor drag state, replicated to every surface over the event bus.
///
/// `start`/`end` are global. `drag_id` identifies one logical drag across
/// handoffs; a different id means a newer drag that supersedes this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct SharedSelection {
    pub start_point: Point,
    pub end_point: Point,
    pub origin_monitor_index: usize,
    #[ts(type = "number")]
    pub drag_id: u64,
    pub is_active: bool,
}

impl SharedSelection {
    /// Normalized selection in global coordinates
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.start_point, self.end_point)
    }

    /// The visible part of the selection on a monitor, in its local coordinates.
    pub fn clipped_to(&self, monitor: &MonitorDescriptor) -> Option<Rect> {
        self.rect()
            .intersect(&monitor.bounds())
            .map(|r| monitor.rect_to_local(r))
    }
}

/// Frozen target after pointer release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedRegion {
    /// Global bounds of the target
    pub bounds: Rect,
    pub target: CaptureTarget,
}

impl ConfirmedRegion {
    pub fn region(bounds: Rect) -> Self {
        Self {
            bounds,
            target: CaptureTarget::Region(bounds),
        }
    }

    pub fn window(window: &WindowInfo) -> Self {
        Self {
            bounds: window.bounds,
            target: CaptureTarget::Window {
                window_id: window.id,
            },
        }
    }

    pub fn monitor(monitor: &MonitorDescriptor) -> Self {
        Self {
            bounds: monitor.bounds(),
            target: CaptureTarget::Monitor {
                monitor_index: monitor.index,
            },
        }
    }

    pub fn all_monitors(bounds: Rect) -> Self {
        Self {
            bounds,
            target: CaptureTarget::AllMonitors,
        }
    }

    pub fn window_id(&self) -> Option<u32> {
        match self.target {
            CaptureTarget::Window { window_id } => Some(window_id),
            _ => None,
        }
    }
}
