// service/error_log.rs
use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorOrigin {
    Client,
    Server,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub id: Uuid,
    pub origin: ErrorOrigin,
    pub message: String,
    pub source: Option<String>,
    pub stack: Option<String>,
    pub url: Option<String>,
    pub user_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorLogEntry {
    pub fn new(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        ErrorLogEntry {
            id: Uuid::new_v4(),
            origin,
            message: message.into(),
            source: None,
            stack: None,
            url: None,
            user_id: None,
            recorded_at: Utc::now(),
        }
    }
}

/// Bounded, in-process history of client and server failures. The oldest
/// entry is dropped once `capacity` is reached.
#[derive(Debug)]
pub struct ErrorLog {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorLogEntry>>,
}

const MAX_FIELD_LEN: usize = 4000;

fn clip(value: String) -> String {
    if value.len() <= MAX_FIELD_LEN {
        return value;
    }
    let mut end = MAX_FIELD_LEN;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].to_string()
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ErrorLog {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&self, mut entry: ErrorLogEntry) {
        entry.message = clip(entry.message);
        entry.stack = entry.stack.map(clip);

        match entry.origin {
            ErrorOrigin::Client => tracing::warn!("Client error reported: {}", entry.message),
            ErrorOrigin::Server => tracing::error!("Server error recorded: {}", entry.message),
        }

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<ErrorLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let removed = entries.len();
        entries.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_entry_when_full() {
        let log = ErrorLog::new(3);
        for i in 0..5 {
            log.record(ErrorLogEntry::new(ErrorOrigin::Client, format!("error {}", i)));
        }

        let recent = log.recent(10);
        assert_eq!(log.len(), 3);
        assert_eq!(
            recent.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(),
            vec!["error 4", "error 3", "error 2"]
        );
    }

    #[test]
    fn recent_respects_limit_and_clear_empties() {
        let log = ErrorLog::new(10);
        log.record(ErrorLogEntry::new(ErrorOrigin::Server, "a"));
        log.record(ErrorLogEntry::new(ErrorOrigin::Server, "b"));

        assert_eq!(log.recent(1)[0].message, "b");
        assert_eq!(log.clear(), 2);
        assert!(log.recent(10).is_empty());
    }

    #[test]
    fn long_messages_are_clipped() {
        let log = ErrorLog::new(1);
        log.record(ErrorLogEntry::new(ErrorOrigin::Client, "é".repeat(MAX_FIELD_LEN)));
        assert!(log.recent(1)[0].message.len() <= MAX_FIELD_LEN);
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let log = ErrorLog::new(0);
        log.record(ErrorLogEntry::new(ErrorOrigin::Client, "only"));
        assert_eq!(log.len(), 1);
    }
}
