//! Pipeline integration tests: the configured task graph against a real
//! source tree.

use std::path::Path;

use atelier::{build_registry, PlanRunner, ReloadHandle, ReloadKind, SiteConfig};

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"x").unwrap();
}

/// A config whose external tools are stubbed with `sh`, rooted in a temp
/// tree, so the full graph can run without real compilers installed.
fn stub_config(root: &Path) -> SiteConfig {
    let mut config = SiteConfig::default();
    config.source_dir = root.join("app");
    config.output_dir = root.join("dist");
    config.images.raw_dir = root.join("img-raw");
    config.images.dest = root.join("img-optimized");

    let sh_touch = |marker: &str| {
        atelier::ToolCommand::new(
            "sh",
            ["-c", &format!("mkdir -p {{dest}} && touch {{dest}}/{marker}")[..]],
        )
    };
    config.styles.compile = sh_touch("main.css");
    config.styles.minify = sh_touch("main.min.css");
    config.scripts.minify = sh_touch("main.min.js");
    config.templates.compile = sh_touch("index.html");
    config.images.svg = sh_touch("optimized.svg");
    config.images.bitmap = sh_touch("optimized.png");
    config
}

#[tokio::test]
async fn build_produces_output_tree() {
    let dir = tempfile::tempdir().unwrap();
    let config = stub_config(dir.path());
    let app = &config.source_dir;

    // A minimal source tree covering every category.
    touch(&app.join("base/main.scss"));
    touch(&app.join("pages/index.pug"));
    touch(&app.join("scripts/app.js"));
    touch(&app.join("global/fonts/body.woff2"));
    touch(&app.join("global/favicons/icon.png"));
    touch(&app.join("global/svg/logo.svg"));
    touch(&app.join("global/bitmaps/photo.jpg"));
    touch(&app.join("components/hero/video/intro.mp4"));

    // Stale output that clean must remove.
    touch(&config.output_dir.join("stale.txt"));

    let registry = build_registry(&config, None).unwrap();
    let runner = PlanRunner::new();
    let plan = registry.resolve("build").unwrap();
    let report = runner.run("build", &plan).await;

    assert!(
        report.success(),
        "build failed: {:?}",
        report.error.map(|e| e.to_string())
    );

    let out = &config.output_dir;
    assert!(!out.join("stale.txt").exists());
    assert!(out.join("fonts/body.woff2").is_file());
    assert!(out.join("favicons/icon.png").is_file());
    assert!(out.join("img/logo.svg").is_file());
    assert!(out.join("img/photo.jpg").is_file());
    assert!(out.join("video/intro.mp4").is_file());
    assert!(out.join("css/main.css").is_file());
    assert!(out.join("css/main.min.css").is_file());
    assert!(out.join("js/main.min.js").is_file());
    assert!(out.join("index.html").is_file());
}

#[tokio::test]
async fn failing_compiler_fails_build_but_assets_already_copied() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config(dir.path());
    config.scripts.minify =
        atelier::ToolCommand::new("sh", ["-c", "echo minify exploded >&2; exit 1"]);

    let app = config.source_dir.clone();
    touch(&app.join("base/main.scss"));
    touch(&app.join("scripts/app.js"));
    touch(&app.join("global/fonts/body.woff2"));

    let registry = build_registry(&config, None).unwrap();
    let runner = PlanRunner::new();
    let plan = registry.resolve("build").unwrap();
    let report = runner.run("build", &plan).await;

    assert!(!report.success());
    // The failing leaf is attributed with the tool's stderr.
    let error = report.error.as_ref().unwrap();
    let failure = error.first_failure().to_string();
    assert!(failure.contains("scripts"), "unexpected failure: {failure}");
    assert!(failure.contains("minify exploded"));

    // clean and the asset copies (earlier in the sequence) already ran;
    // styles and templates (later) never started.
    assert!(config.output_dir.join("fonts/body.woff2").is_file());
    assert!(!config.output_dir.join("css").exists());
    assert_eq!(report.aborted_count(), 3); // styles:compile, styles:minify, templates
}

#[tokio::test]
async fn image_optimization_runs_outside_build() {
    let dir = tempfile::tempdir().unwrap();
    let config = stub_config(dir.path());
    touch(&config.images.raw_dir.join("logo.svg"));
    touch(&config.images.raw_dir.join("photo.png"));

    let registry = build_registry(&config, None).unwrap();
    let runner = PlanRunner::new();
    let plan = registry.resolve("images:min").unwrap();
    let report = runner.run("images:min", &plan).await;

    assert!(report.success());
    assert!(config.images.dest.join("optimized.svg").is_file());
    assert!(config.images.dest.join("optimized.png").is_file());
}

#[tokio::test]
async fn optimizers_skip_when_no_raw_images_exist() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config(dir.path());
    // Would explode if spawned; it must not be.
    config.images.svg = atelier::ToolCommand::new("sh", ["-c", "exit 9"]);
    config.images.bitmap = atelier::ToolCommand::new("sh", ["-c", "exit 9"]);

    let registry = build_registry(&config, None).unwrap();
    let runner = PlanRunner::new();
    let plan = registry.resolve("images:min").unwrap();
    let report = runner.run("images:min", &plan).await;

    assert!(report.success());
}

#[tokio::test]
async fn watch_plan_notifies_browsers_after_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let config = stub_config(dir.path());
    touch(&config.source_dir.join("base/main.scss"));

    let reload = ReloadHandle::new();
    let mut rx = reload.subscribe();
    let registry = build_registry(&config, Some(&reload)).unwrap();

    let bindings = atelier::watch_bindings(&config, &registry).unwrap();
    let styles = bindings
        .iter()
        .find(|b| b.name == "watch:styles")
        .expect("styles binding");

    let runner = PlanRunner::new();
    let report = runner.run("watch:styles", &styles.plan).await;
    assert!(report.success());

    // The rebuild completed, then the notification was pushed.
    assert_eq!(rx.try_recv().unwrap(), ReloadKind::Styles);
}
