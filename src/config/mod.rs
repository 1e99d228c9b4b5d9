//! Overlay configuration management.
//!
//! Thread-safe configuration for the selection overlay and the recording
//! sessions it starts. One typed struct behind a `parking_lot::RwLock` so the
//! settings surface can batch-update everything in a single call.
//!
//! Each capture session snapshots the config when it starts; later edits only
//! affect the next session.

pub mod overlay;

pub use overlay::{
    get_overlay_config, load_overlay_config_json, reset_overlay_config, set_overlay_config,
    FallbackTarget, OverlayConfig, OVERLAY_CONFIG,
};
