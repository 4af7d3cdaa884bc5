use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::console::Console;
use crate::error::ConsoleError;

/// Signature every command handler implements.
///
/// Handlers receive the console they were invoked on, so they can log their
/// own output, and the positional arguments exactly as tokenized.
pub type CommandHandler = Arc<dyn Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync>;

/// Wraps a closure into a [`CommandHandler`].
pub fn handler<F>(f: F) -> CommandHandler
where
    F: Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A registered console command.
#[derive(Clone)]
pub struct Command {
    /// Name as registered, used for display.
    pub name: String,
    pub help: String,
    pub handler: CommandHandler,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("help", &self.help)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// One line of help output, `name : help`.
    pub fn help_line(&self) -> String {
        format!("{} : {}", self.name, self.help)
    }
}

/// Case-insensitive map from command name to handler.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        help: &str,
        handler: CommandHandler,
    ) -> Result<(), ConsoleError> {
        let key = key(name);
        if self.commands.contains_key(&key) {
            return Err(ConsoleError::DuplicateCommand { name: name.to_string() });
        }
        self.commands.insert(
            key,
            Command { name: name.trim().to_string(), help: help.to_string(), handler },
        );
        Ok(())
    }

    /// Removes a command. Returns `true` if one was registered under `name`.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.commands.remove(&key(name)).is_some()
    }

    pub fn lookup(&self, name: &str) -> Result<&Command, ConsoleError> {
        self.commands
            .get(&key(name))
            .ok_or_else(|| ConsoleError::CommandNotFound { name: name.to_string() })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&key(name))
    }

    /// All commands sorted case-insensitively by name.
    pub fn list_ordered(&self) -> Vec<Command> {
        let mut entries: Vec<(&String, &Command)> = self.commands.iter().collect();
        entries.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.name.cmp(&b.name)));
        entries.into_iter().map(|(_, command)| command.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CommandHandler {
        handler(|_, _| Ok(()))
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut registry = CommandRegistry::new();
        registry.register("SetColorRed", "Set color to red", noop()).unwrap();

        assert_eq!(registry.lookup("setcolorred").unwrap().name, "SetColorRed");
        assert_eq!(registry.lookup("SETCOLORRED").unwrap().help, "Set color to red");
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = CommandRegistry::new();
        registry.register("echo", "", noop()).unwrap();
        let err = registry.register("ECHO", "", noop()).unwrap_err();
        assert!(matches!(err, ConsoleError::DuplicateCommand { name } if name == "ECHO"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_command() {
        let registry = CommandRegistry::new();
        let err = registry.lookup("bogus").unwrap_err();
        assert!(matches!(err, ConsoleError::CommandNotFound { name } if name == "bogus"));
    }

    #[test]
    fn test_list_ordered_is_sorted_and_stable() {
        let mut registry = CommandRegistry::new();
        for name in ["zeta", "alpha", "mid", "beta"] {
            registry.register(name, "", noop()).unwrap();
        }

        let first: Vec<String> = registry.list_ordered().into_iter().map(|c| c.name).collect();
        let second: Vec<String> = registry.list_ordered().into_iter().map(|c| c.name).collect();

        assert_eq!(first, vec!["alpha", "beta", "mid", "zeta"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_list_ordered_ignores_case() {
        let mut registry = CommandRegistry::new();
        for name in ["SetColorRed", "alpha", "Beta", "zap"] {
            registry.register(name, "", noop()).unwrap();
        }

        let names: Vec<String> = registry.list_ordered().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["alpha", "Beta", "SetColorRed", "zap"]);
    }

    #[test]
    fn test_unregister() {
        let mut registry = CommandRegistry::new();
        registry.register("temp", "", noop()).unwrap();
        assert!(registry.unregister("TEMP"));
        assert!(!registry.unregister("temp"));
        assert!(registry.register("temp", "", noop()).is_ok());
    }
}
