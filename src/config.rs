// src/config.rs

//! `Site.toml` loading and validation.
//!
//! ```toml
//! [site]
//! source = "content"
//! dest = "dist"
//!
//! [site.data]
//! title = "My Site"
//!
//! [build]
//! runtimes = true
//!
//! [watch]
//! patterns = ["content/**/*.md", "templates/**/*"]
//! exclude = ["content/drafts/**"]
//! tasks = ["default"]
//! rebuild = "queued"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::{Error, Result};
use crate::watch::RebuildPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub build: BuildSection,
    pub watch: WatchSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Source directory, relative to the project root.
    pub source: String,
    /// Output directory, relative to the project root.
    pub dest: String,
    /// Site-wide template data, merged below locals and per-file data.
    pub data: toml::Table,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            source: "content".to_string(),
            dest: "dist".to_string(),
            data: toml::Table::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    /// Log per-task runtimes through the event bus.
    pub runtimes: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
    /// Tasks rebuilt per change notification.
    pub tasks: Vec<String>,
    pub rebuild: RebuildPolicy,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            exclude: Vec::new(),
            tasks: vec!["default".to_string()],
            rebuild: RebuildPolicy::default(),
        }
    }
}

/// Deserialize a config file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
    let config: SiteConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load and validate; the entry point the application uses.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let config = load_from_path(path)?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &SiteConfig) -> Result<()> {
    if config.site.source.is_empty() {
        return Err(Error::Config("site.source must not be empty".to_string()));
    }
    if config.site.dest.is_empty() {
        return Err(Error::Config("site.dest must not be empty".to_string()));
    }
    if config.watch.tasks.is_empty() {
        return Err(Error::Config(
            "watch.tasks must name at least one task".to_string(),
        ));
    }
    Ok(())
}

/// Default config location relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Site.toml")
}

/// Convert `[site.data]` into the JSON object the render layer merges.
pub(crate) fn data_to_json(data: &toml::Table) -> Result<Map<String, Value>> {
    let value = serde_json::to_value(data)
        .map_err(|err| Error::Config(format!("site.data is not valid template data: {err}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Config(format!(
            "site.data must be a table, got {other}"
        ))),
    }
}
