//! Configuration loading and validation.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use super::types::{SiteConfig, ToolCommand};

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not read the file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid YAML for a site configuration.
    #[error("parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration is structurally valid but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Load a site configuration from a YAML file.
pub fn load(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: SiteConfig = serde_yaml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Load a site configuration, falling back to the conventional defaults when
/// the file does not exist.
pub fn load_or_default(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using conventional layout");
        return Ok(SiteConfig::default());
    }
    load(path)
}

fn validate(config: &SiteConfig) -> Result<(), ConfigError> {
    if config.source_dir.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "source_dir must not be empty".to_string(),
        ));
    }
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "output_dir must not be empty".to_string(),
        ));
    }
    if config.output_dir == config.source_dir {
        return Err(ConfigError::Invalid(
            "output_dir must differ from source_dir".to_string(),
        ));
    }

    let tools = [
        ("styles.compile", &config.styles.compile),
        ("styles.minify", &config.styles.minify),
        ("templates.compile", &config.templates.compile),
        ("scripts.minify", &config.scripts.minify),
        ("images.svg", &config.images.svg),
        ("images.bitmap", &config.images.bitmap),
    ];
    for (name, tool) in tools {
        validate_tool(name, tool)?;
    }

    Ok(())
}

fn validate_tool(name: &str, tool: &ToolCommand) -> Result<(), ConfigError> {
    if tool.program.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{name}: program must not be empty"
        )));
    }
    Ok(())
}
