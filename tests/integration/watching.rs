//! Watch-mode integration tests over a real filesystem notifier.
//!
//! These drive the public `Watcher` API against a temp tree. Polling with
//! generous timeouts keeps them robust against notifier latency.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use atelier::testing::ProbeTask;
use atelier::{PathFilter, Plan, PlanRunner, WatchBinding, Watcher};
use tokio::time::sleep;

/// Poll until `condition` holds, panicking after `timeout`.
async fn wait_until(what: &str, timeout: Duration, condition: impl Fn() -> bool) {
    let start = tokio::time::Instant::now();
    loop {
        if condition() {
            return;
        }
        if start.elapsed() > timeout {
            panic!("Timeout waiting for {what}");
        }
        sleep(Duration::from_millis(20)).await;
    }
}

fn touch(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn filesystem_change_triggers_bound_plan() {
    let dir = tempfile::tempdir().unwrap();
    let styles_dir = dir.path().join("styles");
    std::fs::create_dir_all(&styles_dir).unwrap();

    let probe = Arc::new(ProbeTask::new("rebuild"));
    let runner = Arc::new(PlanRunner::new());

    let mut watcher = Watcher::new(Arc::clone(&runner));
    watcher.bind(WatchBinding::new(
        "watch:styles",
        vec![PathFilter::new(&styles_dir, ["scss"])],
        Plan::leaf(Arc::clone(&probe) as Arc<dyn atelier::Task>),
    ));
    let guard = watcher.start().unwrap();

    // Give the notifier a moment to arm.
    sleep(Duration::from_millis(200)).await;
    touch(&styles_dir.join("main.scss"), "body {}");

    wait_until("watched plan to run", Duration::from_secs(5), || {
        probe.starts() >= 1
    })
    .await;

    drop(guard);
}

#[tokio::test]
async fn non_matching_change_does_not_trigger() {
    let dir = tempfile::tempdir().unwrap();
    let styles_dir = dir.path().join("styles");
    std::fs::create_dir_all(&styles_dir).unwrap();

    let probe = Arc::new(ProbeTask::new("rebuild"));
    let runner = Arc::new(PlanRunner::new());

    let mut watcher = Watcher::new(Arc::clone(&runner));
    watcher.bind(WatchBinding::new(
        "watch:styles",
        vec![PathFilter::new(&styles_dir, ["scss"])],
        Plan::leaf(Arc::clone(&probe) as Arc<dyn atelier::Task>),
    ));
    let guard = watcher.start().unwrap();

    sleep(Duration::from_millis(200)).await;
    touch(&styles_dir.join("readme.txt"), "not a stylesheet");
    sleep(Duration::from_millis(500)).await;

    assert_eq!(probe.starts(), 0);
    drop(guard);
}

#[tokio::test]
async fn failing_rebuild_keeps_watching() {
    let dir = tempfile::tempdir().unwrap();
    let pages_dir = dir.path().join("pages");
    std::fs::create_dir_all(&pages_dir).unwrap();

    let probe = Arc::new(ProbeTask::new("templates").failing("unexpected indent"));
    let runner = Arc::new(PlanRunner::new());

    let mut watcher = Watcher::new(Arc::clone(&runner));
    watcher.bind(WatchBinding::new(
        "watch:templates",
        vec![PathFilter::new(&pages_dir, ["pug"])],
        Plan::leaf(Arc::clone(&probe) as Arc<dyn atelier::Task>),
    ));
    let guard = watcher.start().unwrap();

    sleep(Duration::from_millis(200)).await;
    touch(&pages_dir.join("index.pug"), "h1 hello");
    wait_until("first failing run", Duration::from_secs(5), || {
        probe.starts() >= 1
    })
    .await;

    // The binding survived the failure and reacts to the next change.
    sleep(Duration::from_millis(200)).await;
    touch(&pages_dir.join("index.pug"), "h1 hello again");
    wait_until("second failing run", Duration::from_secs(5), || {
        probe.starts() >= 2
    })
    .await;

    drop(guard);
}

#[tokio::test]
async fn two_bindings_trigger_independently() {
    let dir = tempfile::tempdir().unwrap();
    let styles_dir = dir.path().join("styles");
    let scripts_dir = dir.path().join("scripts");
    std::fs::create_dir_all(&styles_dir).unwrap();
    std::fs::create_dir_all(&scripts_dir).unwrap();

    let styles_probe = Arc::new(ProbeTask::new("styles"));
    let scripts_probe = Arc::new(ProbeTask::new("scripts"));
    let runner = Arc::new(PlanRunner::new());

    let mut watcher = Watcher::new(Arc::clone(&runner));
    watcher.bind(WatchBinding::new(
        "watch:styles",
        vec![PathFilter::new(&styles_dir, ["scss"])],
        Plan::leaf(Arc::clone(&styles_probe) as Arc<dyn atelier::Task>),
    ));
    watcher.bind(WatchBinding::new(
        "watch:scripts",
        vec![PathFilter::new(&scripts_dir, ["js"])],
        Plan::leaf(Arc::clone(&scripts_probe) as Arc<dyn atelier::Task>),
    ));
    let guard = watcher.start().unwrap();

    sleep(Duration::from_millis(200)).await;
    touch(&scripts_dir.join("app.js"), "console.log(1)");

    wait_until("scripts rebuild", Duration::from_secs(5), || {
        scripts_probe.starts() >= 1
    })
    .await;

    // A quiet binding stays quiet.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(styles_probe.starts(), 0);

    drop(guard);
}
