//! Core identifier types for the pipeline.
//!
//! These types provide type-safe identifiers for tasks, runs, and positions
//! within an execution plan.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name of a task in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskName(String);

/// Unique identifier for a plan run (execution instance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl TaskName {
    /// Create a new TaskName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name is empty (anonymous inline tasks).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl RunId {
    /// Generate a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RunId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One step on the way from a plan root to a node: the child index within the
/// parent group, plus the task name when the child is a named leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathStep {
    /// Index of the child within its parent group.
    pub index: usize,
    /// Task name, for leaf children with a non-empty name.
    pub label: Option<String>,
}

/// Position of a node within an execution plan.
///
/// Paths attribute outcomes and failures to a specific node: the root is the
/// empty path, and each step descends into one child of a sequence or parallel
/// group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    /// The root path (the plan itself).
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Derive the path of the child at `index`, labelled when it is a named leaf.
    pub fn child(&self, index: usize, label: Option<&str>) -> Self {
        let mut steps = self.0.clone();
        steps.push(PathStep {
            index,
            label: label.map(|l| l.to_string()),
        });
        Self(steps)
    }

    /// The steps from the root to this node.
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Label of the final step, when it has one.
    pub fn leaf_label(&self) -> Option<&str> {
        self.0.last().and_then(|s| s.label.as_deref())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, ".");
        }
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            match &step.label {
                Some(label) => write!(f, "{}", label)?,
                None => write!(f, "#{}", step.index)?,
            }
        }
        Ok(())
    }
}
