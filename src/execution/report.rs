//! Run outcomes and error reporting.

use std::time::Duration;

use thiserror::Error;

use crate::core::types::{NodePath, RunId, TaskName};

/// Final state of one leaf within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafStatus {
    /// The body completed successfully.
    Completed { duration: Duration },
    /// The body signalled failure.
    Failed { error: String },
    /// A prior sibling's failure short-circuited the enclosing sequence; the
    /// body was never started.
    Aborted,
}

/// Outcome recorded for one leaf of the plan.
#[derive(Debug, Clone)]
pub struct LeafOutcome {
    /// Position of the leaf within the plan.
    pub path: NodePath,
    /// The leaf's task name (empty for anonymous bodies).
    pub name: TaskName,
    /// Final state.
    pub status: LeafStatus,
}

/// Settled result of one direct child of a parallel group.
#[derive(Debug, Clone)]
pub struct ChildOutcome {
    /// Index of the child in declaration order.
    pub index: usize,
    /// The child's task name, or `"sequence"` / `"parallel"` for groups.
    pub label: String,
    /// `Ok` if the whole subtree completed, otherwise its error.
    pub result: Result<(), RunError>,
}

/// Errors surfaced by running a plan.
///
/// A leaf failure propagates unchanged up through sequence nodes (first
/// failure wins, remaining siblings never start). Parallel nodes aggregate:
/// they report only after every child has settled, carrying all child
/// outcomes.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// A task body signalled failure.
    #[error("task '{name}' at {path} failed: {message}")]
    TaskBody {
        path: NodePath,
        name: TaskName,
        message: String,
    },

    /// One or more parallel children failed while the rest completed.
    #[error("{failed} of {total} parallel tasks at {path} failed")]
    PartialParallelFailure {
        path: NodePath,
        total: usize,
        failed: usize,
        outcomes: Vec<ChildOutcome>,
    },
}

impl RunError {
    /// Path of the node the error is attributed to.
    pub fn path(&self) -> &NodePath {
        match self {
            RunError::TaskBody { path, .. } => path,
            RunError::PartialParallelFailure { path, .. } => path,
        }
    }

    /// Descend to the first-failing leaf (declaration order for parallel
    /// groups, which have no deterministic completion order).
    pub fn first_failure(&self) -> &RunError {
        match self {
            RunError::TaskBody { .. } => self,
            RunError::PartialParallelFailure { outcomes, .. } => outcomes
                .iter()
                .find_map(|outcome| outcome.result.as_ref().err())
                .map(RunError::first_failure)
                .unwrap_or(self),
        }
    }
}

/// Result of one plan run.
///
/// Runs are independent: executing the same plan twice produces two unrelated
/// reports, apart from whatever side effects the bodies perform.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Identifier of this run.
    pub run_id: RunId,
    /// The name the plan was run under.
    pub target: String,
    /// Total duration of the run.
    pub duration: Duration,
    /// Outcome of every leaf that was reached (completed, failed, or aborted).
    pub leaves: Vec<LeafOutcome>,
    /// The first failure, if any.
    pub error: Option<RunError>,
}

impl RunReport {
    /// Whether every leaf completed with no failure.
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Number of leaves that completed.
    pub fn completed_count(&self) -> usize {
        self.leaves
            .iter()
            .filter(|l| matches!(l.status, LeafStatus::Completed { .. }))
            .count()
    }

    /// Number of leaves that failed.
    pub fn failed_count(&self) -> usize {
        self.leaves
            .iter()
            .filter(|l| matches!(l.status, LeafStatus::Failed { .. }))
            .count()
    }

    /// Number of leaves that were never started.
    pub fn aborted_count(&self) -> usize {
        self.leaves
            .iter()
            .filter(|l| matches!(l.status, LeafStatus::Aborted))
            .count()
    }

    /// Outcome of the first leaf with the given task name.
    pub fn outcome(&self, name: &str) -> Option<&LeafOutcome> {
        self.leaves.iter().find(|l| l.name.as_str() == name)
    }
}
