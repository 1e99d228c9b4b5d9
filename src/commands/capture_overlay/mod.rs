//! Cross-monitor capture overlay.
//!
//! One overlay surface per monitor, each with its own input and no shared
//! memory. Surfaces agree on the current selection only through the event
//! bus, which lets a drag that starts on one monitor continue and finish on
//! another.
//!
//! # Features
//!
//! - Window detection and highlighting (click to select window)
//! - Region selection with drag (drag to select custom region)
//! - Drag handoff between monitors while the button is held
//! - Crosshair cursor and dimension badge in the render model
//! - Shift for square regions
//!
//! # Architecture
//!
//! ```text
//! mod.rs (public API)
//!   |
//!   +-- types.rs (geometry, monitors, selection values, constants)
//!   +-- state.rs (per-surface drag and cursor state)
//!   +-- controller.rs (selection state machine per surface)
//!   +-- surface.rs (async surface task, overlay set lifecycle)
//!   +-- input/ (throttle, hit-testing)
//! ```

pub mod controller;
pub mod input;
pub mod state;
pub mod surface;
pub mod types;

#[cfg(test)]
mod tests;

// Re-exports for public API
pub use controller::{ControllerEffect, OverlayView, PointerEvent, SelectorController};
pub use surface::{OverlaySet, SurfaceHandle, SurfaceInput, TokioClock};
pub use types::{
    CaptureKind, CaptureTarget, ConfirmedRegion, MonitorDescriptor, Point, Rect, SharedSelection,
    WindowInfo,
};
