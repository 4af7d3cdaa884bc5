//! Command line tokenizer.
//!
//! Splits on whitespace unless the text is inside single or double quotes.
//! Quotes may be escaped with a backslash inside a quoted run. A quote that is
//! never closed swallows the rest of the line into one token.

use regex::Regex;
use std::sync::OnceLock;

const TOKEN_PATTERN: &str = concat!(
    r#"(?:"#,
    r#""[^"\\]*(?:\\.[^"\\]*)*""#,
    r#"|'[^'\\]*(?:\\.[^'\\]*)*'"#,
    r#"|"[^"\\]*(?:\\.[^"\\]*)*\\?$"#,
    r#"|'[^'\\]*(?:\\.[^'\\]*)*\\?$"#,
    r#"|\S+"#,
    r#")+"#,
);

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("valid token regex"))
}

/// Strips the quotes of a token fully wrapped in matching quotes.
fn unwrap_quotes(token: &str) -> &str {
    let wrapped = token.len() >= 2
        && ((token.starts_with('"') && token.ends_with('"'))
            || (token.starts_with('\'') && token.ends_with('\'')));
    if wrapped {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

/// Tokenizes a command line. Empty or blank input yields no tokens.
pub fn tokenize(line: &str) -> Vec<String> {
    token_regex()
        .find_iter(line.trim())
        .map(|m| unwrap_quotes(m.as_str().trim()).to_string())
        .collect()
}

/// A command line split into its name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased command name, used as the registry key.
    pub name: String,
    pub args: Vec<String>,
}

/// Splits a command line into a case-folded name and positional arguments.
///
/// Returns `None` when the line holds no tokens.
pub fn parse_command(line: &str) -> Option<ParsedCommand> {
    let mut tokens = tokenize(line).into_iter();
    let name = tokens.next()?.to_lowercase();
    Some(ParsedCommand { name, args: tokens.collect() })
}
