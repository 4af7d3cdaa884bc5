use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::entry::LogEntry;
use crate::error::ConsoleError;

/// Body of `POST /command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

impl CommandRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, ConsoleError> {
        serde_json::from_slice(body).map_err(|e| ConsoleError::MalformedRequest(e.to_string()))
    }
}

/// Body of `GET /log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogResponse {
    pub logs: Vec<LogEntry>,
}

/// Local date-time layouts accepted besides RFC 3339.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Parses the `timeStamp` query value.
///
/// RFC 3339 values carry their own offset; the other layouts are read as
/// local time. Returns `None` for anything unparsable.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    LOCAL_FORMATS.iter().find_map(|format| {
        let naive = NaiveDateTime::parse_from_str(raw, format).ok()?;
        Local.from_local_datetime(&naive).earliest().map(|ts| ts.with_timezone(&Utc))
    })
}

/// Content type served for a static file, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "svg" => "image/svg+xml",
        "gif" => "image/gif",
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_command_request_decoding() {
        let req = CommandRequest::from_slice(br#"{"command": "echo hi"}"#).unwrap();
        assert_eq!(req.command, "echo hi");

        let bodies: [&[u8]; 2] = [b"{}", b"not json"];
        for body in bodies {
            assert!(matches!(
                CommandRequest::from_slice(body),
                Err(ConsoleError::MalformedRequest(_))
            ));
        }
        assert!(matches!(
            CommandRequest::from_slice(br#"{"command": 5}"#),
            Err(ConsoleError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_timestamp("2024-05-01T12:30:00.250+02:00").unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(ts.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_local_formats() {
        let expected = Local
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parse_timestamp("2024-05-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("05/01/2024 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("05/01/2024 12:30:00 PM"), Some(expected));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for(Path::new("index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("app.JS")), "application/javascript");
        assert_eq!(content_type_for(Path::new("img/logo.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("data.bin")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }
}
