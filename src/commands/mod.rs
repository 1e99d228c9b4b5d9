pub mod capture;
pub mod capture_overlay;
pub mod logging;
pub mod toolbar_position;
pub mod video_recording;
