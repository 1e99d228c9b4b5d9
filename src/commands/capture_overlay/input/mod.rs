//! Input handling for the capture overlay.
//!
//! # Modules
//!
//! - `throttle` - Leading/trailing-edge throttle with an injectable clock
//! - `hit_test` - Throttled window hit-testing and the cross-monitor arbiter

pub mod throttle;

pub use hit_test::{HitTestArbiter, HitTestRequest, HitTestThrottler};
pub use throttle::{throttle, Clock, ManualClock, SystemClock, Throttle, Throttled};
