//! Testing utilities for users of the atelier library.
//!
//! This module provides helpers for testing task orchestration:
//!
//! - [`ProbeTask`]: a task that records starts and completions, optionally
//!   slow or failing
//! - [`Journal`]: a shared ordered record of task activity

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::task::{Task, TaskError};

/// A shared, ordered record of task activity.
///
/// Tasks append `start:{name}`, `done:{name}` and `fail:{name}` entries as
/// they run, letting tests assert on ordering across a whole plan.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().expect("journal lock poisoned").push(entry.into());
    }

    /// Snapshot of all entries in order.
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock poisoned").clone()
    }
}

/// A task that records how it was driven.
///
/// By default it succeeds immediately. Builders make it slow (to create
/// overlap windows) or failing (to exercise error propagation).
///
/// # Example
///
/// ```
/// use atelier::testing::ProbeTask;
/// use std::time::Duration;
///
/// let probe = ProbeTask::new("styles").slow(Duration::from_millis(10));
/// assert_eq!(probe.starts(), 0);
/// ```
pub struct ProbeTask {
    name: String,
    delay: Option<Duration>,
    fail_with: Option<String>,
    journal: Option<Journal>,
    starts: AtomicU32,
    completions: AtomicU32,
}

impl ProbeTask {
    /// Create a probe that succeeds immediately.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            delay: None,
            fail_with: None,
            journal: None,
            starts: AtomicU32::new(0),
            completions: AtomicU32::new(0),
        }
    }

    /// Sleep for `delay` before settling.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail with the given message instead of succeeding.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Record activity into a shared journal.
    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// How many times the body was started.
    pub fn starts(&self) -> u32 {
        self.starts.load(Ordering::SeqCst)
    }

    /// How many times the body completed successfully.
    pub fn completions(&self) -> u32 {
        self.completions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Task for ProbeTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), TaskError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.record(format!("start:{}", self.name));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.fail_with {
            Some(message) => {
                if let Some(journal) = &self.journal {
                    journal.record(format!("fail:{}", self.name));
                }
                Err(TaskError::ExecutionFailed(message.clone()))
            }
            None => {
                self.completions.fetch_add(1, Ordering::SeqCst);
                if let Some(journal) = &self.journal {
                    journal.record(format!("done:{}", self.name));
                }
                Ok(())
            }
        }
    }
}
