//! Plan execution engine.
//!
//! The `PlanRunner` walks an execution plan to completion:
//!
//! - sequence children run strictly one at a time, and a failure aborts the
//!   sequence immediately (later siblings are never started),
//! - parallel children are all spawned essentially at once, and the group
//!   settles only after every child has settled; started siblings are never
//!   cancelled,
//! - leaf errors propagate unchanged through sequences and are aggregated at
//!   parallel nodes.
//!
//! Runs hold no state beyond the currently active nodes and the collected
//! outcomes, so a plan may be run any number of times, concurrently or not.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info_span, Instrument};

use crate::core::plan::Plan;
use crate::core::task::Task;
use crate::core::types::{NodePath, RunId, TaskName};
use crate::events::{Event, EventBus};

use super::report::{ChildOutcome, LeafOutcome, LeafStatus, RunError, RunReport};

/// Executor for running composed plans.
pub struct PlanRunner {
    events: Arc<EventBus>,
    max_concurrency: Option<usize>,
}

impl PlanRunner {
    /// Create a runner with a fresh event bus and no concurrency cap.
    pub fn new() -> Self {
        Self {
            events: Arc::new(EventBus::new()),
            max_concurrency: None,
        }
    }

    /// Create a runner emitting to an existing event bus.
    pub fn with_events(events: Arc<EventBus>) -> Self {
        Self {
            events,
            max_concurrency: None,
        }
    }

    /// Cap the number of leaf bodies in flight at once.
    ///
    /// The cap delays starts; it never changes settlement semantics.
    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency);
        self
    }

    /// The event bus this runner emits to.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Execute a plan to completion and report the outcome.
    ///
    /// `target` is the name the run is reported under (usually the registered
    /// task name).
    pub async fn run(&self, target: impl Into<String>, plan: &Plan) -> RunReport {
        let target = target.into();
        let run_id = RunId::new();

        debug!(plan = %target, leaves = plan.leaf_count(), "starting plan run");
        self.events
            .emit(Event::run_started(run_id.clone(), target.clone()))
            .await;

        let start = Instant::now();
        let state = Arc::new(RunState {
            run_id: run_id.clone(),
            events: Arc::clone(&self.events),
            outcomes: Mutex::new(Vec::new()),
            limit: self
                .max_concurrency
                .map(|n| Arc::new(Semaphore::new(n))),
        });

        let span = info_span!("plan_run", run = %run_id, plan = %target);
        let result = run_node(Arc::clone(&state), plan.clone(), NodePath::root())
            .instrument(span)
            .await;
        let duration = start.elapsed();

        let leaves = {
            let mut outcomes = state.outcomes.lock().await;
            std::mem::take(&mut *outcomes)
        };
        let error = result.err();

        self.events
            .emit(Event::run_completed(
                run_id.clone(),
                target.clone(),
                error.is_none(),
                duration,
            ))
            .await;

        debug!(
            plan = %target,
            success = error.is_none(),
            duration_ms = %duration.as_millis(),
            completed = leaves
                .iter()
                .filter(|l| matches!(l.status, LeafStatus::Completed { .. }))
                .count(),
            "plan run finished"
        );

        RunReport {
            run_id,
            target,
            duration,
            leaves,
            error,
        }
    }
}

impl Default for PlanRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state of one run.
struct RunState {
    run_id: RunId,
    events: Arc<EventBus>,
    outcomes: Mutex<Vec<LeafOutcome>>,
    limit: Option<Arc<Semaphore>>,
}

impl RunState {
    async fn record(&self, outcome: LeafOutcome) {
        self.outcomes.lock().await.push(outcome);
    }

    /// Record every leaf under `plan` as aborted (never started).
    async fn record_aborted(&self, plan: &Plan, path: NodePath) {
        let mut leaves = Vec::new();
        collect_leaves(plan, path, &mut leaves);
        let mut outcomes = self.outcomes.lock().await;
        for (path, name) in leaves {
            outcomes.push(LeafOutcome {
                path,
                name,
                status: LeafStatus::Aborted,
            });
        }
    }
}

fn collect_leaves(plan: &Plan, path: NodePath, out: &mut Vec<(NodePath, TaskName)>) {
    match plan {
        Plan::Leaf(task) => out.push((path, TaskName::new(task.name()))),
        Plan::Sequence(children) | Plan::Parallel(children) => {
            for (index, child) in children.iter().enumerate() {
                collect_leaves(child, path.child(index, child.label()), out);
            }
        }
    }
}

fn child_label(plan: &Plan) -> String {
    match plan {
        Plan::Leaf(task) => task.name().to_string(),
        Plan::Sequence(_) => "sequence".to_string(),
        Plan::Parallel(_) => "parallel".to_string(),
    }
}

/// Run one plan node. Boxed for recursion across spawned subtasks.
fn run_node(
    state: Arc<RunState>,
    plan: Plan,
    path: NodePath,
) -> Pin<Box<dyn Future<Output = Result<(), RunError>> + Send>> {
    Box::pin(async move {
        match plan {
            Plan::Leaf(task) => run_leaf(state, task, path).await,

            Plan::Sequence(children) => {
                let mut iter = children.into_iter().enumerate();
                while let Some((index, child)) = iter.next() {
                    let child_path = path.child(index, child.label());
                    if let Err(err) = run_node(Arc::clone(&state), child, child_path).await {
                        // Short-circuit: remaining siblings never start.
                        for (rest_index, rest) in iter {
                            state
                                .record_aborted(&rest, path.child(rest_index, rest.label()))
                                .await;
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }

            Plan::Parallel(children) => {
                let total = children.len();
                let mut handles = Vec::with_capacity(total);
                for (index, child) in children.into_iter().enumerate() {
                    let label = child_label(&child);
                    let child_path = path.child(index, child.label());
                    handles.push((
                        index,
                        label,
                        tokio::spawn(run_node(Arc::clone(&state), child, child_path)),
                    ));
                }

                // Settle every child before reporting; a failure never
                // cancels started siblings.
                let mut outcomes = Vec::with_capacity(total);
                let mut failed = 0usize;
                for (index, label, handle) in handles {
                    let result = match handle.await {
                        Ok(result) => result,
                        Err(join_err) => Err(RunError::TaskBody {
                            path: path.child(index, None),
                            name: TaskName::new(&label),
                            message: format!("task panicked: {join_err}"),
                        }),
                    };
                    if result.is_err() {
                        failed += 1;
                    }
                    outcomes.push(ChildOutcome {
                        index,
                        label,
                        result,
                    });
                }

                if failed == 0 {
                    Ok(())
                } else {
                    Err(RunError::PartialParallelFailure {
                        path,
                        total,
                        failed,
                        outcomes,
                    })
                }
            }
        }
    })
}

async fn run_leaf(
    state: Arc<RunState>,
    task: Arc<dyn Task>,
    path: NodePath,
) -> Result<(), RunError> {
    let _permit = match &state.limit {
        Some(semaphore) => Some(
            Arc::clone(semaphore)
                .acquire_owned()
                .await
                .expect("semaphore closed"),
        ),
        None => None,
    };

    let name = TaskName::new(task.name());
    state
        .events
        .emit(Event::task_started(
            state.run_id.clone(),
            name.clone(),
            path.clone(),
        ))
        .await;

    let start = Instant::now();
    match task.run().await {
        Ok(()) => {
            let duration = start.elapsed();
            state
                .record(LeafOutcome {
                    path: path.clone(),
                    name: name.clone(),
                    status: LeafStatus::Completed { duration },
                })
                .await;
            state
                .events
                .emit(Event::task_completed(
                    state.run_id.clone(),
                    name,
                    path,
                    duration,
                ))
                .await;
            Ok(())
        }
        Err(err) => {
            let message = err.to_string();
            state
                .record(LeafOutcome {
                    path: path.clone(),
                    name: name.clone(),
                    status: LeafStatus::Failed {
                        error: message.clone(),
                    },
                })
                .await;
            state
                .events
                .emit(Event::task_failed(
                    state.run_id.clone(),
                    name.clone(),
                    path.clone(),
                    message.clone(),
                ))
                .await;
            Err(RunError::TaskBody {
                path,
                name,
                message,
            })
        }
    }
}
