//! In-flight run registry
//!
//! Tracks triggered batches between start and completion so a control
//! surface can poll their output text. Entries are removed when the batch
//! completes; nothing is persisted.

use crate::domain::RunId;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Append-only progress text of one run or batch
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    text: Arc<Mutex<String>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one line
    pub fn line(&self, line: impl AsRef<str>) {
        let mut text = lock(&self.text);
        text.push_str(line.as_ref());
        text.push('\n');
    }

    pub fn contents(&self) -> String {
        lock(&self.text).clone()
    }
}

/// What a registered batch is running
#[derive(Debug, Clone)]
pub struct RunEntry {
    pub job_keys: Vec<String>,
    pub output: RunLog,
}

/// Answer to a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPoll {
    pub output: String,
    pub complete: bool,
}

/// RunId → in-flight entry
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    entries: Arc<Mutex<HashMap<RunId, RunEntry>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a batch at start and returns its output log
    pub fn insert(&self, run_id: RunId, job_keys: Vec<String>) -> RunLog {
        let output = RunLog::new();
        lock(&self.entries).insert(
            run_id,
            RunEntry {
                job_keys,
                output: output.clone(),
            },
        );
        output
    }

    /// Drops the entry of a completed batch
    pub fn complete(&self, run_id: &RunId) -> Option<RunEntry> {
        lock(&self.entries).remove(run_id)
    }

    /// Current output of a batch
    ///
    /// Unknown ids, including batches that already completed, read as
    /// `{output: "", complete: true}`.
    pub fn poll(&self, run_id: &RunId) -> RunPoll {
        match lock(&self.entries).get(run_id) {
            Some(entry) => RunPoll {
                output: entry.output.contents(),
                complete: false,
            },
            None => RunPoll {
                output: String::new(),
                complete: true,
            },
        }
    }

    pub fn job_keys(&self, run_id: &RunId) -> Option<Vec<String>> {
        lock(&self.entries).get(run_id).map(|e| e.job_keys.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// A panic while holding the lock leaves plain data behind; keep using it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_appends_lines() {
        let log = RunLog::new();
        let shared = log.clone();
        log.line("first");
        shared.line("second");
        assert_eq!(log.contents(), "first\nsecond\n");
    }

    #[test]
    fn test_poll_lifecycle() {
        let registry = RunRegistry::new();
        let run_id = RunId::generate();

        let log = registry.insert(run_id, vec!["daily".to_string()]);
        log.line("Starting job daily");

        let poll = registry.poll(&run_id);
        assert!(!poll.complete);
        assert_eq!(poll.output, "Starting job daily\n");
        assert_eq!(registry.job_keys(&run_id), Some(vec!["daily".to_string()]));

        assert!(registry.complete(&run_id).is_some());
        assert_eq!(
            registry.poll(&run_id),
            RunPoll {
                output: String::new(),
                complete: true
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_run_reads_complete() {
        let registry = RunRegistry::new();
        assert!(registry.poll(&RunId::generate()).complete);
    }
}
