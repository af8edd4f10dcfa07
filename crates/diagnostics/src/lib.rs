//! Logging bootstrap shared by the zksnap crates
//!
//! Provides lightweight, configurable structured logging to stderr.
//!
//! Usage:
//! - Set ZKSNAP_LOG=off (default) - no logs
//! - Set ZKSNAP_LOG=info - backup/restore progress (created, skipped, excluded)
//! - Set ZKSNAP_LOG=debug - per-node diagnostics
//!
//! Stdout is never written to: backups may be streamed there.

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable consulted by [`init_diagnostics`]
pub const LOG_ENV: &str = "ZKSNAP_LOG";

static INIT: Once = Once::new();

/// Parsed value of the log level setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    /// Parse a level name, `None` for anything unrecognized
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "off" | "" => Some(LogLevel::Off),
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    fn emit_level(self) -> Option<emit::Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(emit::Level::Error),
            LogLevel::Warn => Some(emit::Level::Warn),
            LogLevel::Info => Some(emit::Level::Info),
            LogLevel::Debug => Some(emit::Level::Debug),
        }
    }
}

/// Initialize diagnostics from the ZKSNAP_LOG environment variable
///
/// Safe to call multiple times; only the first call installs an emitter.
pub fn init_diagnostics() {
    let setting = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());
    let level = LogLevel::parse(&setting).unwrap_or(LogLevel::Info);
    init_with_level(level);
}

/// Initialize diagnostics at debug level regardless of ZKSNAP_LOG
pub fn init_verbose() {
    init_with_level(LogLevel::Debug);
}

/// Initialize diagnostics at an explicit level
pub fn init_with_level(level: LogLevel) {
    INIT.call_once(|| {
        let Some(min) = level.emit_level() else {
            return;
        };
        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(min))
            .init();

        // emit_term writes synchronously, nothing is left to flush at exit
        std::mem::forget(rt);
    });
}

/// Log progress a user running a backup or restore wants to see
///
/// Examples: "Created node: /a", "Excluding path: /tmp matching pattern: ^/tmp"
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log per-node detail useful when debugging a run
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable conditions (vanished nodes, conflicts, retries)
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log the failure that is about to abort a run
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}
