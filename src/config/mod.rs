//! TOML configuration for the console, its log capture and the HTTP bridge.

mod defaults;
mod loader;
mod types;
mod validation;

pub use loader::ConfigLoader;
pub use types::{CaptureConfig, Config, ConsoleSettings, HttpConfig};
pub use validation::Validate;

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "tungsten-console";
