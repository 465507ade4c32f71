//! Core task-graph model.
//!
//! This module defines the unit of work (`Task`), the composed execution plan
//! (`Plan`), and the named registry plans are composed against.

pub mod plan;
pub mod registry;
pub mod task;
pub mod types;

pub use plan::{Plan, PlanItem};
pub use registry::{Registry, RegistryError};
pub use task::{FnTask, Task, TaskError};
pub use types::{NodePath, PathStep, RunId, TaskName};
