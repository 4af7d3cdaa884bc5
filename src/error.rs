use std::path::PathBuf;

/// Error types for the console and its HTTP bridge
#[derive(thiserror::Error, Debug)]
pub enum ConsoleError {
    #[error("Command \"{name}\" not found.")]
    CommandNotFound { name: String },

    #[error("Command \"{name}\" is already registered")]
    DuplicateCommand { name: String },

    #[error("Directory not found: {}", path.display())]
    InvalidPath { path: PathBuf },

    #[error("Command \"{name}\" failed: {reason}")]
    HandlerFailure { name: String, reason: String },

    #[error("Command \"{line}\" cannot run from inside another command on the same console")]
    ReentrantCommand { line: String },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Listener terminated")]
    ListenerTerminated,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    /// Whether this error is the expected outcome of stopping the listener.
    pub fn is_expected_shutdown(&self) -> bool {
        matches!(self, ConsoleError::ListenerTerminated)
    }
}
