//! Filesystem watching: re-run plans when source files change.
//!
//! A [`WatchBinding`] associates a set of path filters with a plan. Bindings
//! are created at startup, never mutated, and torn down when the
//! [`WatchGuard`] is dropped.
//!
//! Re-run policy: at most one run of a binding is in flight at a time. Events
//! arriving while a run is in flight coalesce into exactly one follow-up run
//! covering everything batched during the run. Each binding's channel has
//! capacity one: the slot is the single pending re-run, and further events
//! land in it or are dropped. A failed run is reported and the binding stays
//! live for the next event.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::plan::Plan;
use crate::events::Event;
use crate::execution::PlanRunner;

/// Errors that can occur while setting up watching.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The underlying filesystem notifier failed.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Filesystem error while resolving watch roots.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Watcher started with no bindings.
    #[error("no watch bindings registered")]
    NoBindings,
}

/// A path filter: a directory subtree (or a single file) plus an extension
/// set.
///
/// Every pattern the pipeline watches is of this shape, so no glob engine is
/// involved: a filter matches files under `root` whose extension is in
/// `extensions` (any extension when the set is empty).
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
    exact: bool,
}

impl PathFilter {
    /// Match files under `root` (recursively) with one of the extensions.
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.into().to_ascii_lowercase())
                .collect(),
            recursive: true,
            exact: false,
        }
    }

    /// Match exactly one file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            root: path.into(),
            extensions: Vec::new(),
            recursive: false,
            exact: true,
        }
    }

    /// Restrict matching to direct children of the root.
    pub fn shallow(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// The filter's root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a path qualifies under this filter.
    pub fn matches(&self, path: &Path) -> bool {
        if self.exact {
            return path == self.root;
        }
        if !path.starts_with(&self.root) {
            return false;
        }
        if !self.recursive && path.parent() != Some(self.root.as_path()) {
            return false;
        }
        self.matches_extension(path)
    }

    /// Whether the path's extension is in the filter's set (an empty set
    /// matches anything).
    pub fn matches_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions.iter().any(|ext| *ext == e)
            })
            .unwrap_or(false)
    }

    /// Enumerate the files currently matching this filter, sorted.
    pub fn scan(&self) -> Vec<PathBuf> {
        if self.exact {
            return if self.root.is_file() {
                vec![self.root.clone()]
            } else {
                Vec::new()
            };
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.matches_extension(path))
            .collect();
        files.sort();
        files
    }

    /// The same filter with its root canonicalized, for matching the absolute
    /// paths the notifier reports.
    fn canonicalized(&self) -> std::io::Result<Self> {
        Ok(Self {
            root: std::fs::canonicalize(&self.root)?,
            extensions: self.extensions.clone(),
            recursive: self.recursive,
            exact: self.exact,
        })
    }
}

/// A standing association between path filters and a plan to re-run.
pub struct WatchBinding {
    /// Name the binding's runs are reported under.
    pub name: String,
    /// Filters deciding which filesystem events qualify.
    pub filters: Vec<PathFilter>,
    /// The plan to re-run on qualifying changes.
    pub plan: Plan,
}

impl WatchBinding {
    /// Create a binding.
    pub fn new(name: impl Into<String>, filters: Vec<PathFilter>, plan: Plan) -> Self {
        Self {
            name: name.into(),
            filters,
            plan,
        }
    }
}

/// Spawns and owns the per-binding rebuild loops.
pub struct Watcher {
    runner: Arc<PlanRunner>,
    bindings: Vec<WatchBinding>,
}

/// Keeps the filesystem watcher and the binding loops alive.
///
/// Dropping the guard stops watching: the notifier is torn down, the binding
/// channels close, and the loops drain and exit.
pub struct WatchGuard {
    _watcher: RecommendedWatcher,
    handles: Vec<JoinHandle<()>>,
}

impl WatchGuard {
    /// Wait for all binding loops to finish (after the notifier is gone).
    pub async fn join(self) {
        drop(self._watcher);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

impl Watcher {
    /// Create a watcher driving plans through the given runner.
    pub fn new(runner: Arc<PlanRunner>) -> Self {
        Self {
            runner,
            bindings: Vec::new(),
        }
    }

    /// Register a binding.
    pub fn bind(&mut self, binding: WatchBinding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    /// The registered bindings.
    pub fn bindings(&self) -> &[WatchBinding] {
        &self.bindings
    }

    /// Start watching: spawn one rebuild loop per binding and subscribe the
    /// binding roots to the filesystem notifier.
    pub fn start(self) -> Result<WatchGuard, WatchError> {
        if self.bindings.is_empty() {
            return Err(WatchError::NoBindings);
        }

        let mut matchers: Vec<(Vec<PathFilter>, mpsc::Sender<()>)> = Vec::new();
        let mut roots: BTreeSet<PathBuf> = BTreeSet::new();
        let mut handles = Vec::new();

        for binding in self.bindings {
            let (tx, rx) = mpsc::channel(1);

            let mut canonical = Vec::new();
            for filter in &binding.filters {
                match filter.canonicalized() {
                    Ok(resolved) => {
                        roots.insert(resolved.root.clone());
                        canonical.push(resolved);
                    }
                    Err(err) => {
                        warn!(
                            binding = %binding.name,
                            root = %filter.root.display(),
                            error = %err,
                            "watch root unavailable, skipping"
                        );
                    }
                }
            }
            matchers.push((canonical, tx));

            handles.push(tokio::spawn(run_binding(
                binding.name,
                binding.plan,
                rx,
                Arc::clone(&self.runner),
            )));
        }

        let mut watcher = notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(_) => return,
                };
                if !matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for (filters, tx) in &matchers {
                    if event
                        .paths
                        .iter()
                        .any(|path| filters.iter().any(|filter| filter.matches(path)))
                    {
                        // Full slot means a re-run is already pending; the
                        // event coalesces into it.
                        let _ = tx.try_send(());
                    }
                }
            },
        )?;

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }
        debug!(roots = roots.len(), "filesystem watcher started");

        Ok(WatchGuard {
            _watcher: watcher,
            handles,
        })
    }
}

/// One binding's rebuild loop.
///
/// Runs the plan once per wakeup, then drains the pending slot: events that
/// arrived mid-run trigger exactly one follow-up run.
async fn run_binding(
    name: String,
    plan: Plan,
    mut rx: mpsc::Receiver<()>,
    runner: Arc<PlanRunner>,
) {
    while rx.recv().await.is_some() {
        loop {
            runner
                .events()
                .emit(Event::watch_triggered(name.clone()))
                .await;

            let report = runner.run(name.as_str(), &plan).await;
            match &report.error {
                Some(error) => {
                    warn!(binding = %name, error = %error, "watched rebuild failed")
                }
                None => debug!(binding = %name, "watched rebuild finished"),
            }

            if rx.try_recv().is_err() {
                break;
            }
        }
    }
    debug!(binding = %name, "watch binding closed");
}
