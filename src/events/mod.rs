//! Lifecycle events and event handling.
//!
//! This module provides event emission for run and task lifecycle events,
//! enabling observability into plan execution and watch-triggered rebuilds.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::{NodePath, RunId, TaskName};

/// Lifecycle events emitted during execution.
#[derive(Debug, Clone)]
pub enum Event {
    /// A plan run has started.
    RunStarted {
        run_id: RunId,
        target: String,
        timestamp: Instant,
    },

    /// A plan run completed (successfully or with failures).
    RunCompleted {
        run_id: RunId,
        target: String,
        success: bool,
        duration: Duration,
        timestamp: Instant,
    },

    /// A task has started execution.
    TaskStarted {
        run_id: RunId,
        name: TaskName,
        path: NodePath,
        timestamp: Instant,
    },

    /// A task completed successfully.
    TaskCompleted {
        run_id: RunId,
        name: TaskName,
        path: NodePath,
        duration: Duration,
        timestamp: Instant,
    },

    /// A task failed with an error.
    TaskFailed {
        run_id: RunId,
        name: TaskName,
        path: NodePath,
        error: String,
        timestamp: Instant,
    },

    /// A watch binding matched filesystem changes and is about to re-run.
    WatchTriggered { binding: String, timestamp: Instant },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::RunStarted { timestamp, .. } => *timestamp,
            Event::RunCompleted { timestamp, .. } => *timestamp,
            Event::TaskStarted { timestamp, .. } => *timestamp,
            Event::TaskCompleted { timestamp, .. } => *timestamp,
            Event::TaskFailed { timestamp, .. } => *timestamp,
            Event::WatchTriggered { timestamp, .. } => *timestamp,
        }
    }

    /// Create a RunStarted event.
    pub fn run_started(run_id: RunId, target: impl Into<String>) -> Self {
        Event::RunStarted {
            run_id,
            target: target.into(),
            timestamp: Instant::now(),
        }
    }

    /// Create a RunCompleted event.
    pub fn run_completed(
        run_id: RunId,
        target: impl Into<String>,
        success: bool,
        duration: Duration,
    ) -> Self {
        Event::RunCompleted {
            run_id,
            target: target.into(),
            success,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskStarted event.
    pub fn task_started(run_id: RunId, name: TaskName, path: NodePath) -> Self {
        Event::TaskStarted {
            run_id,
            name,
            path,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskCompleted event.
    pub fn task_completed(run_id: RunId, name: TaskName, path: NodePath, duration: Duration) -> Self {
        Event::TaskCompleted {
            run_id,
            name,
            path,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskFailed event.
    pub fn task_failed(run_id: RunId, name: TaskName, path: NodePath, error: String) -> Self {
        Event::TaskFailed {
            run_id,
            name,
            path,
            error,
            timestamp: Instant::now(),
        }
    }

    /// Create a WatchTriggered event.
    pub fn watch_triggered(binding: impl Into<String>) -> Self {
        Event::WatchTriggered {
            binding: binding.into(),
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
