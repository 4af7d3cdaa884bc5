use std::path::PathBuf;

use super::types::{CaptureConfig, ConsoleSettings, HttpConfig};
use super::APP_DIR_NAME;

pub const DEFAULT_PORT: u16 = 8181;
pub const DEFAULT_IP: &str = "0.0.0.0";
pub const UNBOUNDED: i64 = -1;

fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        .join(APP_DIR_NAME)
}

pub(super) fn default_true() -> bool {
    true
}

pub(super) fn default_log_history_capacity() -> i64 {
    UNBOUNDED
}

pub(super) fn default_command_history_capacity() -> i64 {
    UNBOUNDED
}

pub(super) fn default_stack_traces() -> bool {
    true
}

pub(super) fn default_history_dir() -> PathBuf {
    app_data_dir().join("history")
}

pub(super) fn default_http_enabled() -> bool {
    true
}

pub(super) fn default_ip() -> String {
    DEFAULT_IP.to_string()
}

pub(super) fn default_port() -> u16 {
    DEFAULT_PORT
}

pub(super) fn default_assets_dir() -> PathBuf {
    app_data_dir().join("www")
}

pub(super) fn default_request_timeout_ms() -> u64 {
    5_000
}

pub(super) fn default_max_body_bytes() -> usize {
    64 * 1024
}

pub(super) fn default_shutdown_timeout_ms() -> u64 {
    2_000
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            log_history_capacity: default_log_history_capacity(),
            command_history_capacity: default_command_history_capacity(),
            stack_traces: default_stack_traces(),
            history_dir: default_history_dir(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            errors: true,
            warnings: true,
            info: true,
            debug: false,
            panics: true,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            ip: default_ip(),
            port: default_port(),
            assets_dir: default_assets_dir(),
            request_timeout_ms: default_request_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}
