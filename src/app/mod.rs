//! Application plumbing shared by every surface.
//!
//! - `events`: cross-surface event bus

pub mod events;

pub use events::{Envelope, EventBus, OverlayEvent, Subscription, SurfaceId, ToolbarAction};
