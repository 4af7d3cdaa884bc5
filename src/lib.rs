//! Tungsten console: an in-process diagnostic console.
//!
//! Captures log entries into a bounded history, runs text commands against
//! registered handlers, and serves both to a browser inspector over a local
//! HTTP bridge.

pub mod capture;
pub mod config;
pub mod console;
pub mod entry;
pub mod error;
pub mod parser;
pub mod registry;
pub mod store;
pub mod web;

pub use console::{CommandOutcome, Console, LogSubscriber, SubscriptionId};
pub use entry::{EntryColors, LogEntry, Rgba, Severity};
pub use error::ConsoleError;
pub use registry::{Command, CommandHandler, CommandRegistry};
pub use web::HttpBridge;
