//! The static-site task graph.
//!
//! This module wires the configured tools and asset categories into the
//! command surface of the pipeline:
//!
//! ```text
//! build = sequence(clean, assets, scripts, styles, templates)
//! assets = parallel(copy:fonts, copy:favicons, images:copy, copy:video)
//! images:copy = parallel(svg:copy, bitmap:copy)
//! images:min = parallel(svg:min, bitmap:min)        (manual, not in build)
//! styles = sequence(styles:compile, styles:minify)
//! ```
//!
//! In serve mode each asset category also gets a watch binding whose plan
//! ends with a reload task, so browsers are notified strictly after the
//! rebuild completes.

mod fsops;
mod tool;

pub use fsops::{CleanTask, CopyTask};
pub use tool::{ToolTask, ToolTaskBuilder};

use std::path::Path;

use crate::config::{CopySpec, SiteConfig};
use crate::core::plan::{Plan, PlanItem};
use crate::core::registry::{Registry, RegistryError};
use crate::serve::{ReloadHandle, ReloadTask};
use crate::watch::{PathFilter, WatchBinding};

const BITMAP_EXTENSIONS: [&str; 4] = ["gif", "jpg", "jpeg", "png"];

/// Build the registry of pipeline tasks from a site configuration.
///
/// With a reload handle, `reload` and `reload:styles` notification tasks are
/// registered as well (serve mode).
pub fn build_registry(
    config: &SiteConfig,
    reload: Option<&ReloadHandle>,
) -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    let source = &config.source_dir;
    let output = &config.output_dir;

    registry.register("clean", PlanItem::inline(CleanTask::new("clean", output)))?;

    register_copy(&mut registry, "copy:fonts", &config.assets.fonts, config)?;
    register_copy(&mut registry, "copy:favicons", &config.assets.favicons, config)?;
    register_copy(&mut registry, "copy:video", &config.assets.video, config)?;
    register_copy(&mut registry, "svg:copy", &config.assets.svg, config)?;
    register_copy(&mut registry, "bitmap:copy", &config.assets.bitmaps, config)?;

    registry.register(
        "svg:min",
        PlanItem::inline(
            ToolTask::from_command("svg:min", &config.images.svg)
                .input(PathFilter::new(&config.images.raw_dir, ["svg"]))
                .dest(&config.images.dest)
                .build(),
        ),
    )?;
    registry.register(
        "bitmap:min",
        PlanItem::inline(
            ToolTask::from_command("bitmap:min", &config.images.bitmap)
                .input(PathFilter::new(&config.images.raw_dir, BITMAP_EXTENSIONS))
                .dest(&config.images.dest)
                .build(),
        ),
    )?;

    let mut scripts = ToolTask::from_command("scripts", &config.scripts.minify)
        .dest(output.join(&config.scripts.dest));
    for dir in &config.scripts.sources {
        scripts = scripts.input(PathFilter::new(source.join(dir), ["js"]));
    }
    registry.register("scripts", PlanItem::inline(scripts.build()))?;

    let entry = source.join(&config.styles.entry);
    let css_dest = output.join(&config.styles.dest);
    let compile = ToolTask::from_command("styles:compile", &config.styles.compile)
        .input(PathFilter::file(&entry))
        .dest(&css_dest)
        .build();
    let minify = ToolTask::from_command("styles:minify", &config.styles.minify)
        .input(PathFilter::file(&entry))
        .dest(&css_dest)
        .build();
    registry.register(
        "styles",
        Plan::sequence(vec![Plan::task(compile), Plan::task(minify)]),
    )?;

    registry.register(
        "templates",
        PlanItem::inline(
            ToolTask::from_command("templates", &config.templates.compile)
                .input(PathFilter::new(source.join(&config.templates.pages), ["pug"]))
                .dest(output.join(&config.templates.dest))
                .build(),
        ),
    )?;

    let images_copy = registry.parallel([
        PlanItem::named("svg:copy"),
        PlanItem::named("bitmap:copy"),
    ])?;
    registry.register("images:copy", images_copy)?;

    let images_min = registry.parallel([
        PlanItem::named("svg:min"),
        PlanItem::named("bitmap:min"),
    ])?;
    registry.register("images:min", images_min)?;

    let assets = registry.parallel([
        PlanItem::named("copy:fonts"),
        PlanItem::named("copy:favicons"),
        PlanItem::named("images:copy"),
        PlanItem::named("copy:video"),
    ])?;
    registry.register("assets", assets)?;

    let build = registry.sequence([
        PlanItem::named("clean"),
        PlanItem::named("assets"),
        PlanItem::named("scripts"),
        PlanItem::named("styles"),
        PlanItem::named("templates"),
    ])?;
    registry.register("build", build)?;

    if let Some(reload) = reload {
        registry.register("reload", PlanItem::inline(ReloadTask::full(reload)))?;
        registry.register(
            "reload:styles",
            PlanItem::inline(ReloadTask::styles(reload)),
        )?;
    }

    Ok(registry)
}

/// Build the watch bindings for serve mode.
///
/// Requires the registry to have been built with a reload handle: every
/// binding's plan ends with a reload notification.
pub fn watch_bindings(
    config: &SiteConfig,
    registry: &Registry,
) -> Result<Vec<WatchBinding>, RegistryError> {
    let source = &config.source_dir;

    let bindings = vec![
        WatchBinding::new(
            "watch:styles",
            vec![PathFilter::new(source, ["scss", "sass"])],
            registry.sequence([
                PlanItem::named("styles"),
                PlanItem::named("reload:styles"),
            ])?,
        ),
        WatchBinding::new(
            "watch:templates",
            vec![PathFilter::new(source, ["pug"])],
            registry.sequence([PlanItem::named("templates"), PlanItem::named("reload")])?,
        ),
        WatchBinding::new(
            "watch:scripts",
            config
                .scripts
                .sources
                .iter()
                .map(|dir| PathFilter::new(source.join(dir), ["js"]))
                .collect(),
            registry.sequence([PlanItem::named("scripts"), PlanItem::named("reload")])?,
        ),
        WatchBinding::new(
            "watch:svg",
            copy_filters(&config.assets.svg, source),
            registry.sequence([PlanItem::named("svg:copy"), PlanItem::named("reload")])?,
        ),
        WatchBinding::new(
            "watch:bitmaps",
            copy_filters(&config.assets.bitmaps, source),
            registry.sequence([PlanItem::named("bitmap:copy"), PlanItem::named("reload")])?,
        ),
    ];

    Ok(bindings)
}

fn register_copy(
    registry: &mut Registry,
    name: &str,
    spec: &CopySpec,
    config: &SiteConfig,
) -> Result<(), RegistryError> {
    let mut task = CopyTask::new(
        name,
        copy_filters(spec, &config.source_dir),
        config.output_dir.join(&spec.dest),
    );
    if spec.flatten {
        task = task.flatten();
    }
    registry.register(name, PlanItem::inline(task))
}

fn copy_filters(spec: &CopySpec, source_dir: &Path) -> Vec<PathFilter> {
    spec.sources
        .iter()
        .map(|dir| {
            PathFilter::new(
                source_dir.join(dir),
                spec.extensions.iter().map(String::as_str),
            )
        })
        .collect()
}
