//! The console context: log history, command registry, command history and
//! log subscribers behind one explicit, shareable object.

use chrono::{DateTime, Local, Utc};
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, warn};

use crate::config::ConsoleSettings;
use crate::entry::{LogEntry, Rgba, Severity};
use crate::error::ConsoleError;
use crate::parser::parse_command;
use crate::registry::{Command, CommandRegistry};
use crate::store::{History, LogStore};

/// Callback invoked for every new entry.
pub type LogSubscriber = Arc<dyn Fn(&LogEntry) + Send + Sync>;

/// Handle returned by [`Console::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What happened to a submitted command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The handler ran to completion.
    Executed,
    /// The line held no tokens; only the history was updated.
    Empty,
    /// No command is registered under the name.
    NotFound(String),
    /// The handler returned an error or panicked.
    Failed(String),
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

thread_local! {
    /// Consoles with a command running on this thread.
    static EXECUTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a console as running a command on the current thread until dropped.
struct ExecutionMark(usize);

impl ExecutionMark {
    fn enter(console: &Console) -> Option<Self> {
        let id = console as *const Console as usize;
        EXECUTING.with(|running| {
            let mut running = running.borrow_mut();
            if running.contains(&id) {
                None
            } else {
                running.push(id);
                Some(ExecutionMark(id))
            }
        })
    }
}

impl Drop for ExecutionMark {
    fn drop(&mut self) {
        EXECUTING.with(|running| {
            let mut running = running.borrow_mut();
            if let Some(pos) = running.iter().rposition(|id| *id == self.0) {
                running.remove(pos);
            }
        });
    }
}

/// Central coordination point for logs and commands.
///
/// Every piece of state sits behind its own lock, held only for the
/// operation at hand. Command execution is additionally serialized so that
/// concurrent submissions never interleave their side effects. A handler
/// that calls [`Console::execute_command`] on its own console gets
/// [`CommandOutcome::Failed`] back instead of blocking.
pub struct Console {
    settings: ConsoleSettings,
    logs: LogStore,
    commands: RwLock<CommandRegistry>,
    command_history: Mutex<History<String>>,
    subscribers: RwLock<Vec<(SubscriptionId, LogSubscriber)>>,
    next_subscription: AtomicU64,
    execution: Mutex<()>,
}

impl Console {
    pub fn new(settings: ConsoleSettings) -> Arc<Self> {
        Arc::new(Console {
            logs: LogStore::new(settings.log_capacity()),
            command_history: Mutex::new(History::new(settings.command_capacity())),
            commands: RwLock::new(CommandRegistry::new()),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            execution: Mutex::new(()),
            settings,
        })
    }

    pub fn settings(&self) -> &ConsoleSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------

    /// Records a message and notifies subscribers.
    pub fn log(
        &self,
        message: impl Into<String>,
        severity: Severity,
        capture_trace: bool,
    ) -> LogEntry {
        let entry = LogEntry::new(message, severity);
        self.push(Self::with_trace(entry, capture_trace))
    }

    /// Records a message with custom text and background colors.
    pub fn log_colored(
        &self,
        message: impl Into<String>,
        text: Rgba,
        background: Rgba,
        capture_trace: bool,
    ) -> LogEntry {
        let entry = LogEntry::new(message, Severity::Info).with_colors(text, background);
        self.push(Self::with_trace(entry, capture_trace))
    }

    /// Records an entry built elsewhere, e.g. by a log capture layer.
    pub fn record(&self, entry: LogEntry) -> LogEntry {
        self.push(entry)
    }

    pub fn info(&self, message: impl Into<String>) -> LogEntry {
        self.log(message, Severity::Info, self.settings.stack_traces)
    }

    pub fn warning(&self, message: impl Into<String>) -> LogEntry {
        self.log(message, Severity::Warning, self.settings.stack_traces)
    }

    pub fn error(&self, message: impl Into<String>) -> LogEntry {
        self.log(message, Severity::Error, self.settings.stack_traces)
    }

    pub fn assert(&self, message: impl Into<String>) -> LogEntry {
        self.log(message, Severity::Assert, self.settings.stack_traces)
    }

    pub fn exception(&self, message: impl Into<String>) -> LogEntry {
        self.log(message, Severity::Exception, self.settings.stack_traces)
    }

    fn with_trace(entry: LogEntry, capture_trace: bool) -> LogEntry {
        if capture_trace {
            entry.with_stack_trace(Backtrace::force_capture().to_string())
        } else {
            entry
        }
    }

    fn push(&self, entry: LogEntry) -> LogEntry {
        let stored = self.logs.append(entry);
        self.notify(&stored);
        stored
    }

    /// Calls every subscriber in registration order. The list is copied out
    /// first so a subscriber may (un)subscribe or log without deadlocking.
    fn notify(&self, entry: &LogEntry) {
        let subscribers: Vec<(SubscriptionId, LogSubscriber)> = read(&self.subscribers).clone();
        for (id, subscriber) in subscribers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| subscriber(entry))) {
                error!("Log subscriber {:?} panicked: {}", id, panic_message(payload.as_ref()));
            }
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        write(&self.subscribers).push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = write(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn logs_since(&self, since: DateTime<Utc>) -> Vec<LogEntry> {
        self.logs.query_since(since)
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.snapshot()
    }

    pub fn clear_logs(&self) {
        self.logs.clear();
    }

    pub fn history_text(&self, strip_markup: bool) -> String {
        self.logs.render_text(strip_markup)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    pub fn register_command<F>(
        &self,
        name: &str,
        help: &str,
        handler: F,
    ) -> Result<(), ConsoleError>
    where
        F: Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        write(&self.commands).register(name, help, Arc::new(handler))
    }

    pub fn unregister_command(&self, name: &str) -> bool {
        write(&self.commands).unregister(name)
    }

    pub fn ordered_commands(&self) -> Vec<Command> {
        read(&self.commands).list_ordered()
    }

    pub fn command_history(&self) -> Vec<String> {
        lock(&self.command_history).to_vec()
    }

    /// Logs one `name : help` line per registered command.
    pub fn print_help(&self) {
        for command in self.ordered_commands() {
            self.log(command.help_line(), Severity::Info, false);
        }
    }

    /// Runs a command line.
    ///
    /// The raw line always lands in the command history, and every failure is
    /// reported as an entry in the log stream instead of being returned.
    pub fn execute_command(&self, raw: &str) -> CommandOutcome {
        let Some(_mark) = ExecutionMark::enter(self) else {
            let err = ConsoleError::ReentrantCommand { line: raw.trim().to_string() };
            warn!("{}", err);
            self.error(err.to_string());
            return CommandOutcome::Failed(err.to_string());
        };
        let _serial = lock(&self.execution);

        lock(&self.command_history).push(raw.to_string());

        let line = raw.trim();
        let Some(parsed) = parse_command(line) else {
            return CommandOutcome::Empty;
        };

        self.log(format!("> {line}"), Severity::Info, false);

        // Clone the handler out so the registry lock is not held while it runs.
        let lookup = read(&self.commands).lookup(&parsed.name).cloned();
        let command = match lookup {
            Ok(command) => command,
            Err(err) => {
                self.error(err.to_string());
                return CommandOutcome::NotFound(parsed.name);
            }
        };

        debug!("Executing command '{}' with {} argument(s)", command.name, parsed.args.len());
        let handler = &command.handler;
        let result = panic::catch_unwind(AssertUnwindSafe(|| handler(self, &parsed.args)));

        let reason = match result {
            Ok(Ok(())) => return CommandOutcome::Executed,
            Ok(Err(err)) => format!("{err:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };

        let failure = ConsoleError::HandlerFailure { name: parsed.name, reason: reason.clone() };
        warn!("{}", failure);
        self.error(failure.to_string());
        CommandOutcome::Failed(reason)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Writes the rendered history to `<dir>/<prefix>_<timestamp>.log` and
    /// returns the written path with forward slashes.
    ///
    /// An empty `dir` falls back to the configured history directory.
    pub fn save_history_to_file(
        &self,
        dir: impl AsRef<Path>,
        prefix: &str,
        strip_markup: bool,
    ) -> Result<PathBuf, ConsoleError> {
        let requested = dir.as_ref().to_string_lossy().trim().to_string();
        let dir = if requested.is_empty() {
            std::fs::create_dir_all(&self.settings.history_dir)?;
            self.settings.history_dir.clone()
        } else if is_bare_drive(&requested) {
            PathBuf::from(format!("{requested}\\"))
        } else {
            PathBuf::from(&requested)
        };

        if !dir.is_dir() {
            let err = ConsoleError::InvalidPath { path: dir };
            self.error(err.to_string());
            return Err(err);
        }

        let file_name = format!("{}_{}.log", prefix, Local::now().format("%Y-%m-%d_%H-%M-%S"));
        let path = dir.join(file_name);
        std::fs::write(&path, self.history_text(strip_markup))?;

        Ok(PathBuf::from(path.to_string_lossy().replace('\\', "/")))
    }
}

/// `C:` style drive designators without a separator.
fn is_bare_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
