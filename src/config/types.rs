//! Configuration type definitions.
//!
//! The site configuration (`atelier.yaml`) describes the source and output
//! trees, the per-category asset patterns, and the external tool command
//! lines the pipeline delegates to. Every field has a default mirroring the
//! conventional `app/` → `dist/` layout, so a missing or sparse file works.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::serve::ServerOptions;

/// Command line of an external tool (compiler, minifier, optimizer).
///
/// `args` form the full argv. Two placeholders are substituted at run time:
/// `{src}` expands to the scanned input files, and `{dest}` is replaced with
/// the task's destination directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Executable to run.
    pub program: String,
    /// Arguments, possibly containing `{src}` / `{dest}` placeholders.
    #[serde(default)]
    pub args: Vec<String>,
    /// Optional timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ToolCommand {
    /// Create a command.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(|a| a.into()).collect(),
            timeout_secs: None,
        }
    }
}

/// Site configuration (`atelier.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Source tree root.
    pub source_dir: PathBuf,
    /// Build output root.
    pub output_dir: PathBuf,
    /// Stylesheet compilation.
    pub styles: StylesConfig,
    /// Template rendering.
    pub templates: TemplatesConfig,
    /// Script bundling/minification.
    pub scripts: ScriptsConfig,
    /// Image optimization (manual tasks, not part of `build`).
    pub images: ImagesConfig,
    /// Static asset copies.
    pub assets: AssetsConfig,
    /// Preview server.
    pub server: ServerOptions,
}

/// Stylesheet compilation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    /// Root stylesheet, relative to `source_dir`.
    pub entry: PathBuf,
    /// Destination subdirectory under `output_dir`.
    pub dest: PathBuf,
    /// Compiler producing the readable stylesheet.
    pub compile: ToolCommand,
    /// Compiler pass producing the minified copy under a renamed file.
    pub minify: ToolCommand,
}

/// Template rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory of page templates, relative to `source_dir`.
    pub pages: PathBuf,
    /// Destination subdirectory under `output_dir`.
    pub dest: PathBuf,
    /// Renderer command.
    pub compile: ToolCommand,
}

/// Script minification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Script source directories, relative to `source_dir`.
    pub sources: Vec<PathBuf>,
    /// Destination subdirectory under `output_dir`.
    pub dest: PathBuf,
    /// Minifier command.
    pub minify: ToolCommand,
}

/// Image optimization configuration.
///
/// Optimization reads raw originals from a directory outside the source tree
/// and writes optimized copies next to it; the per-pass toggles live in the
/// optimizer commands themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Directory of raw originals, relative to the project root.
    pub raw_dir: PathBuf,
    /// Directory optimized copies are written to.
    pub dest: PathBuf,
    /// Vector optimizer command.
    pub svg: ToolCommand,
    /// Raster optimizer command.
    pub bitmap: ToolCommand,
}

/// One category of files copied into the output tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopySpec {
    /// Source directories, relative to `source_dir`.
    pub sources: Vec<PathBuf>,
    /// File extensions to include (empty = all files).
    pub extensions: Vec<String>,
    /// Destination subdirectory under `output_dir`.
    pub dest: PathBuf,
    /// Drop the source directory structure and copy into a flat directory.
    pub flatten: bool,
}

/// Static asset copy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub fonts: CopySpec,
    pub favicons: CopySpec,
    pub video: CopySpec,
    pub svg: CopySpec,
    pub bitmaps: CopySpec,
}

const BITMAP_EXTENSIONS: [&str; 4] = ["gif", "jpg", "jpeg", "png"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(|s| PathBuf::from(*s)).collect()
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: PathBuf::from("base/main.scss"),
            dest: PathBuf::from("css"),
            compile: ToolCommand::new(
                "sass",
                ["--no-source-map", "{src}", "{dest}/main.css"],
            ),
            minify: ToolCommand::new(
                "sass",
                [
                    "--no-source-map",
                    "--style=compressed",
                    "{src}",
                    "{dest}/main.min.css",
                ],
            ),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            pages: PathBuf::from("pages"),
            dest: PathBuf::from("."),
            compile: ToolCommand::new("pug", ["{src}", "--out", "{dest}"]),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            sources: paths(&["scripts", "vendors", "vendors_customized"]),
            dest: PathBuf::from("js"),
            minify: ToolCommand::new(
                "terser",
                ["{src}", "--compress", "--mangle", "--output", "{dest}/main.min.js"],
            ),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("img-raw"),
            dest: PathBuf::from("img-optimized"),
            svg: ToolCommand::new("svgo", ["{src}", "--output", "{dest}"]),
            bitmap: ToolCommand::new("imagemin", ["{src}", "--out-dir={dest}"]),
        }
    }
}

impl Default for CopySpec {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            extensions: Vec::new(),
            dest: PathBuf::new(),
            flatten: false,
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            fonts: CopySpec {
                sources: paths(&["global/fonts"]),
                extensions: strings(&["woff", "woff2"]),
                dest: PathBuf::from("fonts"),
                flatten: false,
            },
            favicons: CopySpec {
                sources: paths(&["global/favicons"]),
                extensions: Vec::new(),
                dest: PathBuf::from("favicons"),
                flatten: false,
            },
            video: CopySpec {
                sources: paths(&["global/video", "components"]),
                extensions: strings(&["mp4"]),
                dest: PathBuf::from("video"),
                flatten: true,
            },
            svg: CopySpec {
                sources: paths(&["global/svg", "components"]),
                extensions: strings(&["svg"]),
                dest: PathBuf::from("img"),
                flatten: true,
            },
            bitmaps: CopySpec {
                sources: paths(&["global/bitmaps", "components"]),
                extensions: strings(&BITMAP_EXTENSIONS),
                dest: PathBuf::from("img"),
                flatten: true,
            },
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("app"),
            output_dir: PathBuf::from("dist"),
            styles: StylesConfig::default(),
            templates: TemplatesConfig::default(),
            scripts: ScriptsConfig::default(),
            images: ImagesConfig::default(),
            assets: AssetsConfig::default(),
            server: ServerOptions::default(),
        }
    }
}
