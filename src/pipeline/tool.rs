//! External tool task implementation.
//!
//! [`ToolTask`] wraps the external compilers, minifiers, and optimizers the
//! pipeline delegates to. The wrapped command is opaque: the task spawns it,
//! awaits its exit, and reports a non-zero status as a failure carrying the
//! tool's stderr.
//!
//! Inputs are scanned when the task runs, not when it is built, so a watched
//! rebuild always sees the current file set (and a task with inputs but no
//! matching files is a no-op, like an empty source glob).
//!
//! # Quick Start
//!
//! ```ignore
//! use atelier::pipeline::ToolTask;
//! use atelier::PathFilter;
//! use std::time::Duration;
//!
//! let styles = ToolTask::builder("styles:compile", "sass")
//!     .args(["--no-source-map", "{src}", "{dest}/main.css"])
//!     .input(PathFilter::file("app/base/main.scss"))
//!     .dest("dist/css")
//!     .timeout(Duration::from_secs(60))
//!     .build();
//! ```

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::ToolCommand;
use crate::core::task::{Task, TaskError};
use crate::watch::PathFilter;

/// A task delegating to an external command.
pub struct ToolTask {
    name: String,
    program: String,
    args: Vec<String>,
    inputs: Vec<PathFilter>,
    dest: Option<PathBuf>,
    timeout: Option<Duration>,
}

/// Builder for [`ToolTask`].
pub struct ToolTaskBuilder {
    task: ToolTask,
}

impl ToolTask {
    /// Start building a tool task.
    pub fn builder(name: impl Into<String>, program: impl Into<String>) -> ToolTaskBuilder {
        ToolTaskBuilder {
            task: ToolTask {
                name: name.into(),
                program: program.into(),
                args: Vec::new(),
                inputs: Vec::new(),
                dest: None,
                timeout: None,
            },
        }
    }

    /// Start building from a configured command line.
    pub fn from_command(name: impl Into<String>, command: &ToolCommand) -> ToolTaskBuilder {
        let mut builder = Self::builder(name, command.program.clone()).args(command.args.clone());
        if let Some(secs) = command.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder
    }

    /// Resolve the argv: `{src}` expands to the scanned files, `{dest}` to
    /// the destination directory.
    fn argv(&self, files: &[PathBuf]) -> Vec<String> {
        let dest = self
            .dest
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default();

        let mut argv = Vec::with_capacity(self.args.len() + files.len());
        for arg in &self.args {
            if arg == "{src}" {
                argv.extend(files.iter().map(|f| f.display().to_string()));
            } else {
                argv.push(arg.replace("{dest}", &dest));
            }
        }
        argv
    }
}

impl ToolTaskBuilder {
    /// Add one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.task.args.push(arg.into());
        self
    }

    /// Add several arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.task.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an input filter; `{src}` expands to the files it matches.
    pub fn input(mut self, filter: PathFilter) -> Self {
        self.task.inputs.push(filter);
        self
    }

    /// Destination directory; created before the tool runs and substituted
    /// for `{dest}`.
    pub fn dest(mut self, dest: impl Into<PathBuf>) -> Self {
        self.task.dest = Some(dest.into());
        self
    }

    /// Fail the task if the tool has not exited within `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.task.timeout = Some(timeout);
        self
    }

    /// Finish building.
    pub fn build(self) -> ToolTask {
        self.task
    }
}

#[async_trait]
impl Task for ToolTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Result<(), TaskError> {
        let files = if self.inputs.is_empty() {
            Vec::new()
        } else {
            let inputs = self.inputs.clone();
            tokio::task::spawn_blocking(move || {
                let mut files: Vec<PathBuf> =
                    inputs.iter().flat_map(|filter| filter.scan()).collect();
                files.sort();
                files
            })
            .await
            .map_err(|e| TaskError::ExecutionFailed(format!("input scan failed: {e}")))?
        };

        if !self.inputs.is_empty() && files.is_empty() {
            debug!(task = %self.name, "no matching inputs, skipping");
            return Ok(());
        }

        if let Some(dest) = &self.dest {
            tokio::fs::create_dir_all(dest).await?;
        }

        let argv = self.argv(&files);
        debug!(task = %self.name, program = %self.program, inputs = files.len(), "spawning tool");

        let mut command = Command::new(&self.program);
        command
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, command.output())
                .await
                .map_err(|_| TaskError::Timeout(timeout))??,
            None => command.output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            trace!(task = %self.name, stdout = %stdout.trim());
        }

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(TaskError::CommandFailed {
                program: self.program.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr,
            })
        }
    }
}
