//! atelier - a small task-graph build pipeline for static sites.
//!
//! Named tasks are registered into a [`Registry`], composed into sequential
//! and parallel plans, executed by a [`PlanRunner`], and optionally re-run on
//! filesystem changes through a [`Watcher`] while a [`PreviewServer`]
//! live-reloads connected browsers.

pub mod config;
pub mod core;
pub mod events;
pub mod execution;
pub mod pipeline;
pub mod serve;
pub mod testing;
pub mod watch;

pub use crate::config::{ConfigError, SiteConfig, ToolCommand};
pub use crate::core::plan::{Plan, PlanItem};
pub use crate::core::registry::{Registry, RegistryError};
pub use crate::core::task::{FnTask, Task, TaskError};
pub use crate::core::types::{NodePath, PathStep, RunId, TaskName};
pub use crate::events::{Event, EventBus, EventHandler};
pub use crate::execution::{ChildOutcome, LeafOutcome, LeafStatus, PlanRunner, RunError, RunReport};
pub use crate::pipeline::{build_registry, watch_bindings, CleanTask, CopyTask, ToolTask};
pub use crate::serve::{
    PreviewServer, ReloadHandle, ReloadKind, ReloadTask, ServeError, ServerOptions,
};
pub use crate::watch::{PathFilter, WatchBinding, WatchError, WatchGuard, Watcher};
