//! Overlay configuration.
//!
//! Countdown, fallback policy, toolbar placement and recording defaults in a
//! single typed struct with thread-safe access via RwLock.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::SnapItResult;

/// What a click captures when no window is under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase")]
pub enum FallbackTarget {
    /// The monitor the pointer is over.
    #[default]
    HoveredMonitor,
    /// The union of every monitor.
    AllMonitors,
}

/// Centralized overlay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "overlay/")]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayConfig {
    /// Countdown duration before recording starts (0-10 seconds).
    pub countdown_secs: u32,

    /// Target for a click that hits no window.
    pub fallback_target: FallbackTarget,

    /// Gap between the confirmed region and the toolbar, in pixels.
    pub toolbar_margin: i32,

    /// How long an error stays visible before the session reverts to Hover.
    #[ts(type = "number")]
    pub error_display_ms: u64,

    /// Frames per second (10-60).
    pub fps: u32,

    /// Quality setting (1-100). Affects video bitrate.
    pub quality: u32,

    /// Maximum recording duration in seconds. None = unlimited.
    pub max_duration_secs: Option<u32>,

    /// Whether to include the cursor in the recording.
    pub include_cursor: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            countdown_secs: 3,
            fallback_target: FallbackTarget::default(),
            toolbar_margin: 8,
            error_display_ms: 3000,
            fps: 30,
            quality: 80,
            max_duration_secs: None,
            include_cursor: false,
        }
    }
}

impl OverlayConfig {
    /// Clamp values to their valid ranges.
    pub fn validate(&mut self) {
        self.countdown_secs = self.countdown_secs.clamp(0, 10);
        self.toolbar_margin = self.toolbar_margin.max(0);
        self.fps = self.fps.clamp(10, 60);
        self.quality = self.quality.clamp(1, 100);
        if self.max_duration_secs == Some(0) {
            self.max_duration_secs = None;
        }
    }

    /// Reset to defaults.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

lazy_static! {
    /// Global overlay configuration.
    pub static ref OVERLAY_CONFIG: RwLock<OverlayConfig> = RwLock::new(OverlayConfig::default());
}

/// Replace the whole configuration (batch update).
pub fn set_overlay_config(config: OverlayConfig) {
    let mut current = OVERLAY_CONFIG.write();
    *current = config;
    current.validate();
    log::debug!("[CONFIG] Overlay config updated: {:?}", *current);
}

/// Snapshot of the current configuration.
pub fn get_overlay_config() -> OverlayConfig {
    OVERLAY_CONFIG.read().clone()
}

/// Parse a JSON settings blob and apply it. Missing fields keep their defaults.
pub fn load_overlay_config_json(json: &str) -> SnapItResult<OverlayConfig> {
    let config: OverlayConfig = serde_json::from_str(json)?;
    set_overlay_config(config);
    Ok(get_overlay_config())
}

/// Reset the configuration to defaults.
pub fn reset_overlay_config() {
    OVERLAY_CONFIG.write().reset();
    log::debug!("[CONFIG] Overlay settings reset to defaults");
}
