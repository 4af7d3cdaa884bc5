use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::store::Capacity;

use super::defaults::{
    default_assets_dir, default_command_history_capacity, default_history_dir, default_http_enabled,
    default_ip, default_log_history_capacity, default_max_body_bytes, default_port,
    default_request_timeout_ms, default_shutdown_timeout_ms, default_stack_traces, default_true,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    #[serde(default)]
    pub console: ConsoleSettings,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

/// Settings for the console state itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConsoleSettings {
    /// Maximum stored log entries, `-1` for no limit.
    #[serde(default = "default_log_history_capacity")]
    pub log_history_capacity: i64,

    /// Maximum stored command lines, `-1` for no limit.
    #[serde(default = "default_command_history_capacity")]
    pub command_history_capacity: i64,

    /// Capture a backtrace for the convenience log calls.
    #[serde(default = "default_stack_traces")]
    pub stack_traces: bool,

    /// Where history exports go when no directory is given.
    #[serde(default = "default_history_dir")]
    pub history_dir: PathBuf,
}

impl ConsoleSettings {
    pub fn log_capacity(&self) -> Capacity {
        Capacity::from_limit(self.log_history_capacity)
    }

    pub fn command_capacity(&self) -> Capacity {
        Capacity::from_limit(self.command_history_capacity)
    }
}

/// Which host `tracing` events and panics get mirrored into the console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CaptureConfig {
    #[serde(default = "default_true")]
    pub errors: bool,

    #[serde(default = "default_true")]
    pub warnings: bool,

    #[serde(default = "default_true")]
    pub info: bool,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub panics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ip")]
    pub ip: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Root of the inspector's static files.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl HttpConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.ip, self.port).parse()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
