//! Named task registry and plan composition.
//!
//! A `Registry` maps task names to resolved plans. It is an owned value, not
//! process-global state: independent registries (and therefore independent
//! executors) can coexist, which keeps tests hermetic.
//!
//! Registering a name that already exists is rejected with
//! [`RegistryError::DuplicateTask`]; there is no silent overwrite.

use std::collections::HashMap;

use thiserror::Error;

use super::plan::{Plan, PlanItem};
use super::types::TaskName;

/// Errors that can occur when registering or composing tasks.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Attempted to register a name that already exists.
    #[error("task already registered: {0}")]
    DuplicateTask(TaskName),

    /// A composition referenced a name that is not registered.
    #[error("unknown task: {0}")]
    UnknownTask(TaskName),

    /// Registration with an empty name.
    #[error("task name must not be empty")]
    EmptyName,
}

/// Registry of named plans.
#[derive(Default)]
pub struct Registry {
    plans: HashMap<TaskName, Plan>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            plans: HashMap::new(),
        }
    }

    /// Associate a name with a task body or a previously composed plan.
    ///
    /// `Named` items are resolved immediately, so a registration can alias an
    /// existing entry. Fails with [`RegistryError::DuplicateTask`] if the name
    /// is taken and [`RegistryError::EmptyName`] if it is empty. No other side
    /// effects.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        item: impl Into<PlanItem>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.plans.contains_key(&name) {
            return Err(RegistryError::DuplicateTask(name));
        }
        let plan = self.resolve_item(item.into())?;
        self.plans.insert(name, plan);
        Ok(())
    }

    /// Resolve a registered name to its plan.
    pub fn resolve(&self, name: &str) -> Result<Plan, RegistryError> {
        self.plans
            .get(&TaskName::new(name))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTask(TaskName::new(name)))
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.plans.contains_key(&TaskName::new(name))
    }

    /// All registered names, unordered.
    pub fn names(&self) -> Vec<&TaskName> {
        self.plans.keys().collect()
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Build a `Sequence` plan from an ordered list of items.
    ///
    /// Pure: returns a new plan and executes nothing. `Named` items are
    /// resolved now; composition fails on unknown names.
    pub fn sequence(
        &self,
        items: impl IntoIterator<Item = PlanItem>,
    ) -> Result<Plan, RegistryError> {
        Ok(Plan::sequence(self.resolve_items(items)?))
    }

    /// Build a `Parallel` plan from a list of items. Pure, like [`Registry::sequence`].
    pub fn parallel(
        &self,
        items: impl IntoIterator<Item = PlanItem>,
    ) -> Result<Plan, RegistryError> {
        Ok(Plan::parallel(self.resolve_items(items)?))
    }

    fn resolve_items(
        &self,
        items: impl IntoIterator<Item = PlanItem>,
    ) -> Result<Vec<Plan>, RegistryError> {
        items
            .into_iter()
            .map(|item| self.resolve_item(item))
            .collect()
    }

    fn resolve_item(&self, item: PlanItem) -> Result<Plan, RegistryError> {
        match item {
            PlanItem::Named(name) => self
                .plans
                .get(&name)
                .cloned()
                .ok_or(RegistryError::UnknownTask(name)),
            PlanItem::Inline(task) => Ok(Plan::leaf(task)),
            PlanItem::Composed(plan) => Ok(plan),
        }
    }
}
