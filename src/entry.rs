use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Represents the severity of a console entry.
///
/// Serialized by name (`"Info"`, `"Warning"`, ...) so the inspector page can
/// style entries without knowing any numeric encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Regular informational output.
    Info,
    /// A potential issue or unexpected situation.
    Warning,
    /// A failure that did not stop the application.
    Error,
    /// A violated assertion.
    Assert,
    /// An unhandled failure, typically a panic.
    Exception,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "[INFO]"),
            Severity::Warning => write!(f, "[WARN]"),
            Severity::Error => write!(f, "[ERROR]"),
            Severity::Assert => write!(f, "[ASSERT]"),
            Severity::Exception => write!(f, "[EXCEPTION]"),
        }
    }
}

/// An RGBA color, carried on the wire as an 8-digit hex string (`RRGGBBAA`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba { r, g, b, a }
    }

    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }
}

impl Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("invalid color '{0}': expected 8 hex digits (RRGGBBAA)")]
pub struct ParseColorError(String);

impl FromStr for Rgba {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 8 || !hex.is_ascii() {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        Ok(Rgba::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?))
    }
}

impl Serialize for Rgba {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Custom foreground/background pair attached to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryColors {
    pub text: Rgba,
    pub background: Rgba,
}

/// A single recorded console event.
///
/// Entries are never mutated once stored. Timestamps are kept at microsecond
/// precision so that a client echoing back the last `timeStamp` it saw gets
/// exactly the entries after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "LogEntryWire", from = "LogEntryWire")]
pub struct LogEntry {
    pub message: String,
    pub stack_trace: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub colors: Option<EntryColors>,
}

impl LogEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        LogEntry {
            message: message.into(),
            stack_trace: String::new(),
            severity,
            timestamp: now(),
            colors: None,
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = stack_trace.into();
        self
    }

    pub fn with_colors(mut self, text: Rgba, background: Rgba) -> Self {
        self.colors = Some(EntryColors { text, background });
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(6);
        self
    }

    pub fn has_custom_color(&self) -> bool {
        self.colors.is_some()
    }
}

impl Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.severity, self.message)
    }
}

/// Current time at the precision entries are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// JSON shape consumed by the inspector page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntryWire {
    log_string: String,
    #[serde(default)]
    stack_trace: String,
    log_type: Severity,
    time_stamp: DateTime<Utc>,
    #[serde(default)]
    custom_color: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text_color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bg_color: Option<Rgba>,
}

impl From<LogEntry> for LogEntryWire {
    fn from(entry: LogEntry) -> Self {
        LogEntryWire {
            log_string: entry.message,
            stack_trace: entry.stack_trace,
            log_type: entry.severity,
            time_stamp: entry.timestamp,
            custom_color: entry.colors.is_some(),
            text_color: entry.colors.map(|c| c.text),
            bg_color: entry.colors.map(|c| c.background),
        }
    }
}

impl From<LogEntryWire> for LogEntry {
    fn from(wire: LogEntryWire) -> Self {
        let colors = match (wire.custom_color, wire.text_color, wire.bg_color) {
            (true, Some(text), Some(background)) => Some(EntryColors { text, background }),
            (true, Some(text), None) => Some(EntryColors { text, background: Rgba::BLACK }),
            (true, None, Some(background)) => Some(EntryColors { text: Rgba::WHITE, background }),
            _ => None,
        };
        LogEntry {
            message: wire.log_string,
            stack_trace: wire.stack_trace,
            severity: wire.log_type,
            timestamp: wire.time_stamp,
            colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_color_hex_round_trip() {
        let color = Rgba::new(0x12, 0xAB, 0x00, 0xFF);
        assert_eq!(color.to_hex(), "12AB00FF");
        assert_eq!("12ab00ff".parse::<Rgba>(), Ok(color));
        assert_eq!("#12AB00FF".parse::<Rgba>(), Ok(color));
    }

    #[test]
    fn test_color_rejects_bad_input() {
        assert!("FFF".parse::<Rgba>().is_err());
        assert!("GG000000".parse::<Rgba>().is_err());
        assert!("ÿÿÿÿ".parse::<Rgba>().is_err());
    }

    #[test]
    fn test_wire_field_names() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let entry = LogEntry::new("hello", Severity::Warning).with_timestamp(ts);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["logString"], "hello");
        assert_eq!(json["stackTrace"], "");
        assert_eq!(json["logType"], "Warning");
        assert_eq!(json["timeStamp"], "2024-05-01T12:30:00Z");
        assert_eq!(json["customColor"], false);
        assert!(json.get("textColor").is_none());
        assert!(json.get("bgColor").is_none());
    }

    #[test]
    fn test_colored_entry_serializes_hex() {
        let entry = LogEntry::new("tinted", Severity::Info)
            .with_colors(Rgba::new(255, 0, 0, 255), Rgba::BLACK);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["customColor"], true);
        assert_eq!(json["textColor"], "FF0000FF");
        assert_eq!(json["bgColor"], "000000FF");
    }

    #[test]
    fn test_wire_round_trip_keeps_fields() {
        let plain =
            LogEntry::new("plain <b>text</b>", Severity::Exception).with_stack_trace("at main");
        let colored = LogEntry::new("colored", Severity::Assert)
            .with_colors(Rgba::new(1, 2, 3, 4), Rgba::new(5, 6, 7, 8));
        let entries = vec![plain, colored];

        let encoded = serde_json::to_string(&entries).unwrap();
        let decoded: Vec<LogEntry> = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded, entries);
        assert_eq!(decoded[0].colors, None);
    }

    #[test]
    fn test_with_timestamp_truncates_to_micros() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let entry = LogEntry::new("x", Severity::Info).with_timestamp(ts);
        assert_eq!(entry.timestamp.timestamp_subsec_nanos(), 123_456_000);
    }
}
