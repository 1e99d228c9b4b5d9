//! Toolbar Positioning Module
//!
//! Places the floating toolbar relative to a confirmed region.
//!
//! # Positioning Rules
//!
//! 1. **Primary Position**: Centered horizontally below the region, with margin
//! 2. **Vertical Fallback**: If below doesn't fit the owning monitor, try above
//! 3. **Final Fallback**: Clamp to the owning monitor's bounds
//!
//! The owning monitor is the one containing the region's center, or the first
//! enumerated monitor when the center falls in a gap between monitors.
//! Horizontal position is always clamped to the owning monitor.
//!
//! Computed once per confirmation and again when the toolbar reports a new
//! size, never continuously.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::commands::capture_overlay::types::{monitor_at, MonitorDescriptor, Rect};

/// Default toolbar size before the toolbar reports its measured size
pub const DEFAULT_TOOLBAR_SIZE: ToolbarSize = ToolbarSize {
    width: 600,
    height: 64,
};

/// Measured toolbar size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
pub struct ToolbarSize {
    pub width: u32,
    pub height: u32,
}

/// Toolbar position result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
pub struct ToolbarPosition {
    pub x: i32,
    pub y: i32,
}

/// Usable area of one monitor, shrunk by the margin.
struct MonitorBounds {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl MonitorBounds {
    fn new(m: &MonitorDescriptor, margin: i32) -> Self {
        let b = m.bounds();
        Self {
            left: b.x + margin,
            top: b.y + margin,
            right: b.right() - margin,
            bottom: b.bottom() - margin,
        }
    }

    /// Check if a toolbar starting at `y` fits vertically
    fn fits_vertically(&self, y: i32, size: ToolbarSize) -> bool {
        y >= self.top && y + size.height as i32 <= self.bottom
    }

    /// Clamp a coordinate into `[lo, hi]`; when the toolbar is larger than
    /// the monitor the low edge wins.
    fn clamp(value: i32, lo: i32, hi: i32) -> i32 {
        value.min(hi).max(lo)
    }

    fn clamp_x(&self, x: i32, size: ToolbarSize) -> i32 {
        Self::clamp(x, self.left, self.right - size.width as i32)
    }

    fn clamp_y(&self, y: i32, size: ToolbarSize) -> i32 {
        Self::clamp(y, self.top, self.bottom - size.height as i32)
    }
}

/// Calculate the toolbar position for a confirmed region.
pub fn calculate_position(
    region: Rect,
    size: ToolbarSize,
    monitors: &[MonitorDescriptor],
    margin: i32,
) -> ToolbarPosition {
    let below_x = region.center().x - size.width as i32 / 2;
    let below_y = region.bottom() + margin;
    let above_y = region.y - size.height as i32 - margin;

    let Some(owner) = monitor_at(monitors, region.center()).or_else(|| monitors.first()) else {
        return ToolbarPosition {
            x: below_x,
            y: below_y,
        };
    };
    let bounds = MonitorBounds::new(owner, margin);
    let x = bounds.clamp_x(below_x, size);

    let y = if bounds.fits_vertically(below_y, size) {
        below_y
    } else if bounds.fits_vertically(above_y, size) {
        above_y
    } else {
        bounds.clamp_y(below_y, size)
    };

    log::debug!(
        "[TOOLBAR] Region {:?} on monitor {} -> ({}, {})",
        region,
        owner.index,
        x,
        y
    );
    ToolbarPosition { x, y }
}
