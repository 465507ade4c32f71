//! Configuration loading and parsing.
//!
//! This module provides YAML-based configuration for the site layout,
//! external tool command lines, and the preview server.

mod loader;
mod types;

pub use loader::{load, load_or_default, ConfigError};
pub use types::{
    AssetsConfig, CopySpec, ImagesConfig, ScriptsConfig, SiteConfig, StylesConfig,
    TemplatesConfig, ToolCommand,
};
