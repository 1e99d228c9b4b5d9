//! Unified logging for SnapIt overlays.
//!
//! Installs `env_logger` behind the `log` facade. Every line is also appended
//! to a daily log file when a log directory is configured, with size-based
//! rotation and cleanup of old files.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ResultExt, SnapItResult};

/// Maximum log file size before rotation (5MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum number of log files to keep
const MAX_LOG_FILES: usize = 5;

lazy_static::lazy_static! {
    /// Global log file handle
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
    /// Log directory path
    static ref LOG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Log levels used by non-Rust surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Case-insensitive parse; anything unknown is `Info`.
    pub fn parse(level: &str) -> Self {
        match level.to_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Initialize the logging system.
///
/// Honors `RUST_LOG` (default `info`). Calling this again only switches the
/// file sink; the console logger stays installed.
pub fn init_logging(log_dir: Option<&Path>) -> SnapItResult<()> {
    if let Some(dir) = log_dir {
        open_log_dir(dir)?;
    }

    let env = env_logger::Env::default().default_filter_or("info");
    let installed = env_logger::Builder::from_env(env)
        .format(|buf, record| {
            let line = format_line(
                record.level().as_str(),
                record.target(),
                &record.args().to_string(),
            );
            append_to_file(&line);
            writeln!(buf, "{}", line)
        })
        .try_init()
        .is_ok();

    if installed {
        log::info!("[LOGGING] Logging system initialized");
    } else {
        log::debug!("[LOGGING] Logger already installed");
    }
    if let Some(dir) = log_dir {
        log::info!("[LOGGING] Log directory: {:?}", dir);
    }
    Ok(())
}

fn open_log_dir(log_dir: &Path) -> SnapItResult<()> {
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(current_log_path(log_dir))
        .context("Failed to open log file")?;

    *LOG_DIR.lock() = Some(log_dir.to_path_buf());
    *LOG_FILE.lock() = Some(file);

    cleanup_old_logs(log_dir);
    Ok(())
}

fn format_line(level: &str, source: &str, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{}] [{}] [{}] {}", timestamp, level, source, message)
}

/// The path for the current log file (one per day)
fn current_log_path(log_dir: &Path) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    log_dir.join(format!("snapit_{}.log", date))
}

/// Keep only the most recent MAX_LOG_FILES
fn cleanup_old_logs(log_dir: &Path) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };
    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "log").unwrap_or(false))
        .collect();

    // Newest first; names carry the date, so they break ties
    log_files.sort_by(|a, b| {
        let a_time = fs::metadata(a).and_then(|m| m.modified()).ok();
        let b_time = fs::metadata(b).and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time).then_with(|| b.cmp(a))
    });

    for path in log_files.into_iter().skip(MAX_LOG_FILES) {
        let _ = fs::remove_file(path);
    }
}

fn append_to_file(line: &str) {
    {
        let mut log_file = LOG_FILE.lock();
        if let Some(file) = log_file.as_mut() {
            let _ = writeln!(file, "{}", line);
            let _ = file.flush();
        } else {
            return;
        }
    }
    check_rotation();
}

/// Rotate the current file once it grows past MAX_LOG_SIZE
fn check_rotation() {
    let Some(log_dir) = LOG_DIR.lock().clone() else {
        return;
    };
    let current_path = current_log_path(&log_dir);

    let Ok(metadata) = fs::metadata(&current_path) else {
        return;
    };
    if metadata.len() <= MAX_LOG_SIZE {
        return;
    }

    let timestamp = Local::now().format("%Y-%m-%d_%H%M%S");
    let rotated_path = log_dir.join(format!("snapit_{}.log", timestamp));
    let _ = fs::rename(&current_path, &rotated_path);

    if let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&current_path)
    {
        *LOG_FILE.lock() = Some(file);
    }

    cleanup_old_logs(&log_dir);
}

/// Route a log line from another surface (toolbar webview) into the same sink.
pub fn write_log(level: &str, source: &str, message: &str) {
    let level: log::Level = LogLevel::parse(level).into();
    log::log!(target: source, level, "{}", message);
}
