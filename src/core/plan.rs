//! Execution plans: composed trees of tasks.
//!
//! A plan is built once at composition time and is immutable afterwards.
//! Leaves are task bodies; internal nodes are ordered sequences or parallel
//! groups. Cloning a plan is cheap since leaves are shared `Arc`s.

use std::sync::Arc;

use super::task::Task;
use super::types::TaskName;

/// A resolved, immutable execution plan.
#[derive(Clone)]
pub enum Plan {
    /// A single task body.
    Leaf(Arc<dyn Task>),
    /// Children run strictly one at a time, in declared order.
    Sequence(Vec<Plan>),
    /// Children all start essentially at once; the group settles only after
    /// every child has settled.
    Parallel(Vec<Plan>),
}

impl Plan {
    /// Build a leaf from a shared task.
    pub fn leaf(task: Arc<dyn Task>) -> Self {
        Plan::Leaf(task)
    }

    /// Build a leaf from an owned task.
    pub fn task(task: impl Task + 'static) -> Self {
        Plan::Leaf(Arc::new(task))
    }

    /// Build a sequence of already-resolved plans.
    pub fn sequence(children: Vec<Plan>) -> Self {
        Plan::Sequence(children)
    }

    /// Build a parallel group of already-resolved plans.
    pub fn parallel(children: Vec<Plan>) -> Self {
        Plan::Parallel(children)
    }

    /// The label used for this node in paths: the task name for named leaves,
    /// nothing for anonymous leaves and groups.
    pub fn label(&self) -> Option<&str> {
        match self {
            Plan::Leaf(task) => {
                let name = task.name();
                if name.is_empty() { None } else { Some(name) }
            }
            Plan::Sequence(_) | Plan::Parallel(_) => None,
        }
    }

    /// Number of leaves in the plan.
    pub fn leaf_count(&self) -> usize {
        match self {
            Plan::Leaf(_) => 1,
            Plan::Sequence(children) | Plan::Parallel(children) => {
                children.iter().map(Plan::leaf_count).sum()
            }
        }
    }

    /// Names of all named leaves, in declaration order.
    pub fn leaf_names(&self) -> Vec<TaskName> {
        fn collect(plan: &Plan, out: &mut Vec<TaskName>) {
            match plan {
                Plan::Leaf(task) => {
                    if !task.name().is_empty() {
                        out.push(TaskName::new(task.name()));
                    }
                }
                Plan::Sequence(children) | Plan::Parallel(children) => {
                    for child in children {
                        collect(child, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }
}

/// An item handed to plan composition.
///
/// Composition accepts registered task names, inline bodies, and nested
/// composed plans interchangeably; all three are resolved to a concrete
/// [`Plan`] at composition time, never at run time.
pub enum PlanItem {
    /// Reference to a registered task, resolved against the registry.
    Named(TaskName),
    /// An inline task body.
    Inline(Arc<dyn Task>),
    /// A previously composed plan.
    Composed(Plan),
}

impl PlanItem {
    /// Reference a registered task by name.
    pub fn named(name: impl Into<TaskName>) -> Self {
        PlanItem::Named(name.into())
    }

    /// Wrap an owned task body.
    pub fn inline(task: impl Task + 'static) -> Self {
        PlanItem::Inline(Arc::new(task))
    }
}

impl From<&str> for PlanItem {
    fn from(name: &str) -> Self {
        PlanItem::Named(TaskName::new(name))
    }
}

impl From<String> for PlanItem {
    fn from(name: String) -> Self {
        PlanItem::Named(TaskName::new(name))
    }
}

impl From<TaskName> for PlanItem {
    fn from(name: TaskName) -> Self {
        PlanItem::Named(name)
    }
}

impl From<Plan> for PlanItem {
    fn from(plan: Plan) -> Self {
        PlanItem::Composed(plan)
    }
}

impl From<Arc<dyn Task>> for PlanItem {
    fn from(task: Arc<dyn Task>) -> Self {
        PlanItem::Inline(task)
    }
}
