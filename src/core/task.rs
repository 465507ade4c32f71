//! Task trait and error types.
//!
//! The `Task` trait is the fundamental unit of work in the pipeline. A task
//! body performs its effect (spawn a compiler, copy files, notify browsers)
//! and settles exactly once: either `Ok(())` or a `TaskError`.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that a task body can report.
///
/// Bodies wrap whatever the external collaborator reported: a compiler syntax
/// error, a missing file, an optimizer crash.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// External command exited with a non-zero status.
    #[error("command `{program}` exited with code {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    /// Task timed out.
    #[error("task timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The core trait for defining executable tasks.
///
/// # Example
///
/// ```ignore
/// use atelier::{Task, TaskError};
/// use async_trait::async_trait;
///
/// struct Touch {
///     name: String,
///     path: std::path::PathBuf,
/// }
///
/// #[async_trait]
/// impl Task for Touch {
///     fn name(&self) -> &str {
///         &self.name
///     }
///
///     async fn run(&self) -> Result<(), TaskError> {
///         tokio::fs::write(&self.path, b"").await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync {
    /// Returns the name for this task. Anonymous inline tasks may return an
    /// empty string.
    fn name(&self) -> &str;

    /// Execute the task body.
    ///
    /// # Returns
    /// * `Ok(())` - Task completed successfully
    /// * `Err(TaskError)` - Task failed
    async fn run(&self) -> Result<(), TaskError>;

    /// Optional description for display/logging purposes.
    fn description(&self) -> Option<&str> {
        None
    }
}

type BodyFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send>>;

/// Adapter turning an async closure into a [`Task`].
///
/// Used for inline bodies that do not warrant a dedicated type.
pub struct FnTask {
    name: String,
    body: Box<dyn Fn() -> BodyFuture + Send + Sync>,
}

impl FnTask {
    /// Create a named task from an async closure.
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(move || Box::pin(body())),
        }
    }

    /// Create an anonymous inline task.
    pub fn anonymous<F, Fut>(body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self::new("", body)
    }
}

#[async_trait]
impl Task for FnTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), TaskError> {
        (self.body)().await
    }
}
