//! Mirrors the host application's own diagnostics into the console.

use std::backtrace::Backtrace;
use std::fmt::Write as _;
use std::sync::{Arc, Weak};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::EnvFilter;

use crate::config::CaptureConfig;
use crate::console::Console;
use crate::entry::{LogEntry, Severity};

/// Events from this crate are never captured, otherwise a console that logs
/// about itself would feed its own history.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// A `tracing` layer recording host events as console entries.
///
/// Holds a weak handle so the subscriber does not keep the console alive.
pub struct ConsoleLayer {
    console: Weak<Console>,
    config: CaptureConfig,
}

impl ConsoleLayer {
    pub fn new(console: &Arc<Console>, config: CaptureConfig) -> Self {
        ConsoleLayer { console: Arc::downgrade(console), config }
    }

    /// Maps a `tracing` level to a severity, or `None` if that level is not captured.
    pub fn severity_for(&self, level: &Level) -> Option<Severity> {
        match *level {
            Level::ERROR if self.config.errors => Some(Severity::Error),
            Level::WARN if self.config.warnings => Some(Severity::Warning),
            Level::INFO if self.config.info => Some(Severity::Info),
            Level::DEBUG | Level::TRACE if self.config.debug => Some(Severity::Info),
            _ => None,
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with(OWN_TARGET) {
            return;
        }
        let Some(severity) = self.severity_for(metadata.level()) else {
            return;
        };
        let Some(console) = self.console.upgrade() else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let trace = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => format!("{} ({}:{})", metadata.target(), file, line),
            _ => metadata.target().to_string(),
        };
        let message = format!("{}{}", visitor.message, visitor.fields);
        console.record(LogEntry::new(message, severity).with_stack_trace(trace));
    }
}

/// Subscriber for a host application.
///
/// `log_level` only filters the formatted output; the console layer applies
/// its own `[capture]` toggles, so events below the printed level can still
/// reach the console.
pub fn host_subscriber(
    console: &Arc<Console>,
    capture: CaptureConfig,
    log_level: &str,
) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(EnvFilter::new(log_level)))
        .with(ConsoleLayer::new(console, capture))
}

/// Chains a panic hook that records panics as `Exception` entries, then
/// defers to the previously installed hook.
pub fn install_panic_hook(console: &Arc<Console>) {
    let console = Arc::downgrade(console);
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(console) = console.upgrade() {
            let location = info
                .location()
                .map(|l| format!(" at {}:{}", l.file(), l.line()))
                .unwrap_or_default();
            let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = info.payload().downcast_ref::<String>() {
                s.clone()
            } else {
                "panic".to_string()
            };
            console.record(
                LogEntry::new(format!("panic{location}: {message}"), Severity::Exception)
                    .with_stack_trace(Backtrace::force_capture().to_string()),
            );
        }
        previous(info);
    }));
}
