//! SnapIt capture overlay.
//!
//! Region and window selection across every connected monitor, and the
//! screenshot/recording session that follows a confirmed selection.
//!
//! Each monitor gets its own overlay surface. Surfaces share nothing but the
//! [`EventBus`], over which they agree on the current drag, hand it off when
//! the pointer crosses monitors, and learn the authoritative session state.

pub mod app;
pub mod commands;
pub mod config;
pub mod error;

pub use app::events::{EventBus, OverlayEvent, SurfaceId};
pub use commands::capture::CaptureBackend;
pub use commands::capture_overlay::{OverlaySet, SelectorController};
pub use commands::logging::init_logging;
pub use commands::video_recording::{CaptureFlow, FlowOutcome};
pub use config::{get_overlay_config, set_overlay_config, OverlayConfig};
pub use error::{SnapItError, SnapItResult};
