//! Per-surface selection state.
//!
//! # State Organization
//!
//! - `DragState` - The drag this surface is tracking, local or adopted
//! - `CursorState` - Pointer position, button and hovered window

use crate::commands::capture_overlay::types::{
    Point, Rect, SharedSelection, WindowInfo, DRAG_THRESHOLD,
};

// ============================================================================
// Drag State
// ============================================================================

/// Where the tracked drag began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOrigin {
    /// Pointer went down on this surface.
    Local,
    /// Pointer entered this surface mid-drag; start point came over the bus.
    Adopted,
}

/// Click vs region. Becomes `Region` once the threshold is crossed and never
/// goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Classification {
    #[default]
    Click,
    Region,
}

/// A drag tracked by one surface, in global coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub drag_id: u64,
    pub origin: DragOrigin,
    /// Monitor where the pointer first went down
    pub origin_monitor: usize,
    pub start: Point,
    pub current: Point,
    pub classification: Classification,
    /// Shift key held (for square constraint)
    pub shift_held: bool,
}

impl DragState {
    pub fn local(drag_id: u64, origin_monitor: usize, start: Point, shift_held: bool) -> Self {
        Self {
            drag_id,
            origin: DragOrigin::Local,
            origin_monitor,
            start,
            current: start,
            classification: Classification::Click,
            shift_held,
        }
    }

    /// Continue a drag that another surface started.
    pub fn adopted(selection: &SharedSelection) -> Self {
        let mut drag = Self {
            drag_id: selection.drag_id,
            origin: DragOrigin::Adopted,
            origin_monitor: selection.origin_monitor_index,
            start: selection.start_point,
            current: selection.start_point,
            classification: Classification::Click,
            shift_held: false,
        };
        drag.update(selection.end_point);
        drag
    }

    /// Move the live end point. Returns true if this call reclassified the
    /// drag as a region.
    pub fn update(&mut self, current: Point) -> bool {
        self.current = current;
        if self.classification == Classification::Click && self.exceeds_threshold() {
            self.classification = Classification::Region;
            return true;
        }
        false
    }

    /// Check if the drag distance exceeds the threshold
    pub fn exceeds_threshold(&self) -> bool {
        let dx = (self.current.x - self.start.x).abs();
        let dy = (self.current.y - self.start.y).abs();
        dx > DRAG_THRESHOLD || dy > DRAG_THRESHOLD
    }

    /// End point after the square constraint.
    pub fn end_point(&self) -> Point {
        if !self.shift_held {
            return self.current;
        }
        let dx = self.current.x - self.start.x;
        let dy = self.current.y - self.start.y;
        let size = dx.abs().max(dy.abs());
        // Expand in the direction of the drag
        let sx = if dx >= 0 { size } else { -size };
        let sy = if dy >= 0 { size } else { -size };
        self.start.offset(sx, sy)
    }

    /// Normalized selection rectangle
    pub fn selection_rect(&self) -> Rect {
        Rect::from_points(self.start, self.end_point())
    }

    pub fn is_region(&self) -> bool {
        self.classification == Classification::Region
    }

    pub fn to_shared(&self, is_active: bool) -> SharedSelection {
        SharedSelection {
            start_point: self.start,
            end_point: self.end_point(),
            origin_monitor_index: self.origin_monitor,
            drag_id: self.drag_id,
            is_active,
        }
    }
}

// ============================================================================
// Cursor State
// ============================================================================

/// Pointer as seen by one surface.
#[derive(Debug, Clone, Default)]
pub struct CursorState {
    /// Last known position in global coordinates
    pub position: Option<Point>,
    /// Pointer is over this surface
    pub inside: bool,
    /// Primary button physically held
    pub button_held: bool,
    /// Window currently highlighted
    pub hovered_window: Option<WindowInfo>,
}

impl CursorState {
    pub fn set_position(&mut self, global: Point) {
        self.position = Some(global);
        self.inside = true;
    }

    pub fn clear_hovered(&mut self) {
        self.hovered_window = None;
    }
}
