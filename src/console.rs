//! Console log — the append-only stream of status lines shown to the user.
//!
//! Lines carry sequential ids so the window can poll incrementally
//! (`GET /api/console?since=<id>`). The stream is never truncated and lives
//! for the core's lifetime; nothing is persisted.

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A single line of console output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleLine {
    /// Sequential id, starting at 1.
    pub id: u64,
    /// Unix timestamp (seconds)
    pub timestamp: u64,
    /// Raw text content
    pub content: String,
}

/// Append-only log stream. Thread-safe; handlers and background tasks share
/// it behind an `Arc`.
pub struct ConsoleLog {
    lines: Mutex<Vec<ConsoleLine>>,
}

impl Default for ConsoleLog {
    fn default() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }
}

impl ConsoleLog {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means some writer panicked mid-append; the lines
    // themselves are still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<ConsoleLine>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append one line and return it.
    pub fn append(&self, content: impl Into<String>) -> ConsoleLine {
        let mut lines = self.lock();
        let line = ConsoleLine {
            id: lines.len() as u64 + 1,
            timestamp: current_timestamp(),
            content: content.into(),
        };
        lines.push(line.clone());
        line
    }

    /// All lines with id > `since_id`, oldest first.
    pub fn get_since(&self, since_id: u64) -> Vec<ConsoleLine> {
        self.lock()
            .iter()
            .filter(|l| l.id > since_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
