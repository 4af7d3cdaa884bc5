use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::entry::LogEntry;

/// Matches tag-like rich text markup such as `<b>` or `<color=red>`.
fn markup_tag() -> &'static Regex {
    static MARKUP_TAG: OnceLock<Regex> = OnceLock::new();
    MARKUP_TAG.get_or_init(|| Regex::new(r"<.*?>").expect("valid markup regex"))
}

/// Maximum number of items a history keeps.
///
/// Configuration carries this as a signed number where `-1` (or anything
/// `<= 0`) means "keep everything".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    #[default]
    Unbounded,
    Bounded(usize),
}

impl Capacity {
    pub fn from_limit(limit: i64) -> Self {
        if limit <= 0 {
            Capacity::Unbounded
        } else {
            Capacity::Bounded(usize::try_from(limit).unwrap_or(usize::MAX))
        }
    }
}

/// Append-only ring of items with oldest-first eviction.
#[derive(Debug, Clone)]
pub struct History<T> {
    items: VecDeque<T>,
    capacity: Capacity,
}

impl<T> History<T> {
    pub fn new(capacity: Capacity) -> Self {
        History { items: VecDeque::new(), capacity }
    }

    /// Pushes an item, returning the evicted one if the history was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = match self.capacity {
            Capacity::Bounded(max) if self.items.len() >= max => self.items.pop_front(),
            _ => None,
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> History<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// Thread-safe, bounded, time-ordered log history.
///
/// A single mutex guards the ring; it is held only for the duration of one
/// append or query.
#[derive(Debug)]
pub struct LogStore {
    entries: Mutex<History<LogEntry>>,
}

impl LogStore {
    pub fn new(capacity: Capacity) -> Self {
        LogStore { entries: Mutex::new(History::new(capacity)) }
    }

    fn lock(&self) -> MutexGuard<'_, History<LogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an entry and returns it as stored.
    ///
    /// The stored timestamp never goes backwards: an entry stamped earlier
    /// than the newest one is clamped to the newest timestamp.
    pub fn append(&self, mut entry: LogEntry) -> LogEntry {
        let mut entries = self.lock();
        if let Some(last) = entries.back() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }
        entries.push(entry.clone());
        entry
    }

    /// Every entry strictly newer than `since`, oldest first.
    pub fn query_since(&self, since: DateTime<Utc>) -> Vec<LogEntry> {
        let entries = self.lock();
        match entries.back() {
            Some(newest) if newest.timestamp > since => {}
            _ => return Vec::new(),
        }

        let newer = entries.iter().rev().take_while(|entry| entry.timestamp > since).count();
        entries.iter().skip(entries.len() - newer).cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Renders the history as plain text, one blank line between entries.
    pub fn render_text(&self, strip_markup: bool) -> String {
        let mut text = String::new();
        for entry in self.lock().iter() {
            text.push_str(entry.message.trim());
            text.push('\n');
            if !entry.stack_trace.is_empty() {
                text.push_str(entry.stack_trace.trim());
                text.push('\n');
            }
            text.push('\n');
        }

        if strip_markup {
            markup_tag().replace_all(&text, "").trim().to_string()
        } else {
            text.trim().to_string()
        }
    }
}
