//! Plan execution integration tests.
//!
//! Exercises the orchestration guarantees end to end: sequence
//! short-circuiting, parallel settlement, rerun independence, and
//! registry-driven composition.

use std::sync::Arc;
use std::time::{Duration, Instant};

use atelier::testing::{Journal, ProbeTask};
use atelier::{LeafStatus, Plan, PlanItem, PlanRunner, Registry, RunError};

#[tokio::test]
async fn sequence_failure_stops_later_leaves() {
    let runner = PlanRunner::new();

    // Five leaves, the third fails.
    let probes: Vec<Arc<ProbeTask>> = (0..5)
        .map(|i| {
            let task = ProbeTask::new(format!("t{i}"));
            Arc::new(if i == 2 { task.failing("boom") } else { task })
        })
        .collect();
    let plan = Plan::sequence(
        probes
            .iter()
            .map(|p| Plan::leaf(Arc::clone(p) as Arc<dyn atelier::Task>))
            .collect(),
    );

    let report = runner.run("seq", &plan).await;

    assert!(!report.success());
    // Leaves before the failure completed.
    assert_eq!(probes[0].completions(), 1);
    assert_eq!(probes[1].completions(), 1);
    // Leaves after the failure never started.
    assert_eq!(probes[3].starts(), 0);
    assert_eq!(probes[4].starts(), 0);

    assert_eq!(report.completed_count(), 2);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.aborted_count(), 2);

    match report.error.unwrap() {
        RunError::TaskBody { name, .. } => assert_eq!(name.as_str(), "t2"),
        other => panic!("expected leaf failure, got {other:?}"),
    }
}

#[tokio::test]
async fn parallel_failure_still_starts_and_settles_every_leaf() {
    let runner = PlanRunner::new();

    let a = Arc::new(ProbeTask::new("a").slow(Duration::from_millis(30)));
    let b = Arc::new(ProbeTask::new("b").failing("optimizer crashed"));
    let c = Arc::new(ProbeTask::new("c").slow(Duration::from_millis(60)));

    let plan = Plan::parallel(vec![
        Plan::leaf(Arc::clone(&a) as Arc<dyn atelier::Task>),
        Plan::leaf(Arc::clone(&b) as Arc<dyn atelier::Task>),
        Plan::leaf(Arc::clone(&c) as Arc<dyn atelier::Task>),
    ]);

    let start = Instant::now();
    let report = runner.run("par", &plan).await;
    let elapsed = start.elapsed();

    // Every leaf was started, and the group waited for the slowest sibling
    // even though another had long since failed.
    assert_eq!(a.starts(), 1);
    assert_eq!(b.starts(), 1);
    assert_eq!(c.starts(), 1);
    assert_eq!(c.completions(), 1);
    assert!(
        elapsed >= Duration::from_millis(55),
        "group reported before all children settled: {elapsed:?}"
    );

    match report.error.unwrap() {
        RunError::PartialParallelFailure {
            total,
            failed,
            outcomes,
            ..
        } => {
            assert_eq!(total, 3);
            assert_eq!(failed, 1);
            assert_eq!(outcomes.len(), 3);
            assert!(outcomes[0].result.is_ok());
            assert!(outcomes[2].result.is_ok());
            let err = outcomes[1].result.as_ref().unwrap_err();
            assert!(err.to_string().contains("optimizer crashed"));
        }
        other => panic!("expected parallel aggregation, got {other:?}"),
    }
}

#[tokio::test]
async fn sequence_of_two_attributes_failure_to_second() {
    let runner = PlanRunner::new();
    let a = Arc::new(ProbeTask::new("a"));

    let plan = Plan::sequence(vec![
        Plan::leaf(Arc::clone(&a) as Arc<dyn atelier::Task>),
        Plan::task(ProbeTask::new("b").failing("boom")),
    ]);

    let report = runner.run("seq", &plan).await;

    // A's completion marker was recorded.
    assert_eq!(a.completions(), 1);
    assert!(matches!(
        report.outcome("a").unwrap().status,
        LeafStatus::Completed { .. }
    ));
    assert!(matches!(
        report.outcome("b").unwrap().status,
        LeafStatus::Failed { .. }
    ));
    assert_eq!(report.aborted_count(), 0);

    match report.error.unwrap() {
        RunError::TaskBody { name, path, .. } => {
            assert_eq!(name.as_str(), "b");
            assert_eq!(path.to_string(), "b");
        }
        other => panic!("expected leaf failure, got {other:?}"),
    }
}

#[tokio::test]
async fn running_same_plan_twice_is_independent() {
    let runner = PlanRunner::new();
    let probe = Arc::new(ProbeTask::new("idempotent"));
    let plan = Plan::sequence(vec![
        Plan::leaf(Arc::clone(&probe) as Arc<dyn atelier::Task>),
        Plan::parallel(vec![
            Plan::task(ProbeTask::new("x")),
            Plan::task(ProbeTask::new("y")),
        ]),
    ]);

    let first = runner.run("again", &plan).await;
    let second = runner.run("again", &plan).await;

    assert!(first.success());
    assert!(second.success());
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(probe.completions(), 2);
    assert_eq!(first.completed_count(), 3);
    assert_eq!(second.completed_count(), 3);
}

#[tokio::test]
async fn registered_task_referenced_by_name_runs_once_in_position() {
    let mut registry = Registry::new();
    let journal = Journal::new();
    let styles = Arc::new(
        ProbeTask::new("styles").with_journal(&journal),
    );
    registry
        .register("styles", PlanItem::Inline(Arc::clone(&styles) as Arc<dyn atelier::Task>))
        .unwrap();

    let plan = registry
        .sequence([
            PlanItem::inline(ProbeTask::new("clean").with_journal(&journal)),
            PlanItem::named("styles"),
            PlanItem::inline(ProbeTask::new("templates").with_journal(&journal)),
        ])
        .unwrap();

    let runner = PlanRunner::new();
    let report = runner.run("build", &plan).await;

    assert!(report.success());
    assert_eq!(styles.completions(), 1);
    assert_eq!(
        journal.entries(),
        vec![
            "start:clean",
            "done:clean",
            "start:styles",
            "done:styles",
            "start:templates",
            "done:templates",
        ]
    );
}

#[tokio::test]
async fn independent_executors_do_not_share_registrations() {
    let mut first = Registry::new();
    let mut second = Registry::new();

    first
        .register("only:first", PlanItem::inline(ProbeTask::new("only:first")))
        .unwrap();
    second
        .register("only:second", PlanItem::inline(ProbeTask::new("only:second")))
        .unwrap();

    assert!(first.resolve("only:second").is_err());
    assert!(second.resolve("only:first").is_err());

    // Both registries drive plans through their own runners concurrently.
    let runner_a = PlanRunner::new();
    let runner_b = PlanRunner::new();
    let plan_a = first.resolve("only:first").unwrap();
    let plan_b = second.resolve("only:second").unwrap();
    let (ra, rb) = tokio::join!(
        runner_a.run("a", &plan_a),
        runner_b.run("b", &plan_b),
    );
    assert!(ra.success());
    assert!(rb.success());
}

#[tokio::test]
async fn deep_nesting_preserves_ordering_guarantees() {
    let runner = PlanRunner::new();
    let journal = Journal::new();

    // sequence(a, parallel(b, sequence(c, d)), e): a strictly before the
    // group, e strictly after every nested leaf.
    let plan = Plan::sequence(vec![
        Plan::task(ProbeTask::new("a").with_journal(&journal)),
        Plan::parallel(vec![
            Plan::task(
                ProbeTask::new("b")
                    .with_journal(&journal)
                    .slow(Duration::from_millis(20)),
            ),
            Plan::sequence(vec![
                Plan::task(ProbeTask::new("c").with_journal(&journal)),
                Plan::task(ProbeTask::new("d").with_journal(&journal)),
            ]),
        ]),
        Plan::task(ProbeTask::new("e").with_journal(&journal)),
    ]);

    let report = runner.run("nested", &plan).await;
    assert!(report.success());

    let entries = journal.entries();
    let position = |entry: &str| {
        entries
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("missing journal entry {entry}"))
    };

    assert_eq!(position("start:a"), 0);
    assert!(position("done:a") < position("start:b"));
    assert!(position("done:a") < position("start:c"));
    assert!(position("done:c") < position("start:d"));
    assert!(position("done:b") < position("start:e"));
    assert!(position("done:d") < position("start:e"));
}
