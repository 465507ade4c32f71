//! atelier - a small task-graph build pipeline for static sites.
//!
//! Usage:
//!   atelier build            Build the site into the output directory
//!   atelier serve            Build, then watch and serve with live reload
//!   atelier run <task>       Run a single named task
//!   atelier list             List the registered tasks

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use atelier::{
    build_registry, config, watch_bindings, Event, EventBus, EventHandler, PlanRunner,
    PreviewServer, Watcher,
};
use tracing::{debug, error, info, warn};

/// atelier - a small task-graph build pipeline for static sites
#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the site configuration file
    #[arg(short, long, default_value = "atelier.yaml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site into the output directory
    Build,

    /// Build, then watch the source tree and serve a live-reloading preview
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single named task
    Run {
        /// Task name (see `atelier list`)
        #[arg(value_name = "TASK")]
        task: String,
    },

    /// List the registered tasks
    List,
}

/// Event handler that prints run and task activity.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::RunStarted { target, run_id, .. } => {
                info!("Run '{}' started ({})", target, run_id);
            }
            Event::RunCompleted {
                target,
                success,
                duration,
                run_id,
                ..
            } => {
                if *success {
                    info!("Run '{}' finished in {:?} ({})", target, duration, run_id);
                } else {
                    error!("Run '{}' failed after {:?} ({})", target, duration, run_id);
                }
            }
            Event::TaskStarted { name, .. } => {
                info!("  Task '{}' started", name);
            }
            Event::TaskCompleted { name, duration, .. } => {
                info!("  Task '{}' completed in {:?}", name, duration);
            }
            Event::TaskFailed { name, error, .. } => {
                warn!("  Task '{}' failed: {}", name, error);
            }
            Event::WatchTriggered { binding, .. } => {
                info!("Change detected, running '{}'", binding);
            }
        }
    }
}

async fn logging_runner() -> Arc<PlanRunner> {
    let events = Arc::new(EventBus::new());
    events.register(Arc::new(LoggingHandler)).await;
    Arc::new(PlanRunner::with_events(events))
}

/// Run one registered task (the `build` and `run` commands).
async fn run_task(config_path: PathBuf, task: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_or_default(&config_path)?;
    let registry = build_registry(&config, None)?;
    let plan = registry.resolve(task)?;

    let runner = logging_runner().await;
    let report = runner.run(task, &plan).await;

    if let Some(err) = &report.error {
        error!("{}", err.first_failure());
        return Err(format!("task '{task}' failed").into());
    }
    Ok(())
}

/// Build once, then watch and serve with live reload.
async fn serve_site(
    config_path: PathBuf,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config::load_or_default(&config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let server = PreviewServer::new(config.server.clone(), config.output_dir.clone());
    let reload = server.reload_handle();
    let registry = build_registry(&config, Some(&reload))?;
    let runner = logging_runner().await;

    // Initial build. A failure is reported but does not stop serve mode;
    // the next source change gets another chance.
    let plan = registry.resolve("build")?;
    let report = runner.run("build", &plan).await;
    if let Some(err) = &report.error {
        error!("initial build failed: {}", err.first_failure());
    }

    let mut watcher = Watcher::new(Arc::clone(&runner));
    for binding in watch_bindings(&config, &registry)? {
        debug!(binding = %binding.name, "registering watch binding");
        watcher.bind(binding);
    }
    let guard = watcher.start()?;

    info!("watching for changes, press Ctrl-C to stop");
    tokio::select! {
        result = server.serve() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }

    drop(guard);
    Ok(())
}

/// List all registered tasks with their leaf counts.
fn list_tasks(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_or_default(&config_path)?;
    let registry = build_registry(&config, None)?;

    let mut names = registry.names();
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    println!("Tasks ({}):", names.len());
    for name in names {
        let plan = registry.resolve(name.as_str())?;
        let leaves = plan.leaf_count();
        if leaves == 1 {
            println!("  {}", name);
        } else {
            println!("  {} ({} tasks)", name, leaves);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build => {
            run_task(cli.config, "build").await?;
        }
        Commands::Serve { port } => {
            serve_site(cli.config, port).await?;
        }
        Commands::Run { task } => {
            run_task(cli.config, &task).await?;
        }
        Commands::List => {
            list_tasks(cli.config)?;
        }
    }

    Ok(())
}
