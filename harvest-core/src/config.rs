//! Configuration management for harvest
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (optionally from a `.env` file)
//! 3. Config file (~/.config/harvest/config.toml)
//! 4. Default values

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cutoff::Cutoff;
use crate::secrets::Credentials;
use crate::{Error, Result};

/// Environment variable holding the cutoff timestamp
pub const CUTOFF_ENV: &str = "BEFORE_DATE";
/// Environment variable holding the folder-name filter
pub const FILTER_ENV: &str = "PACKAGE_INFIX";
/// Environment variable holding the output root
pub const OUTPUT_ROOT_ENV: &str = "MOVING_DIR";
/// Environment variable holding the source table path
pub const SOURCES_ENV: &str = "HARVEST_SOURCES";
/// Environment variable holding the clone root
pub const CLONE_ROOT_ENV: &str = "HARVEST_CLONE_ROOT";
/// Environment variable holding the manifest path
pub const MANIFEST_ENV: &str = "HARVEST_MANIFEST";

/// Where repositories come from and where they are cloned
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// CSV table of repositories
    pub path: PathBuf,
    /// Directory that receives one clone per row
    pub clone_root: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("repos.csv"),
            clone_root: PathBuf::from("repo"),
        }
    }
}

/// What to collect from each clone and where to put it
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Substring a directory name must contain to be collected
    pub filter: Option<String>,
    /// Consolidated output directory
    pub output_root: Option<PathBuf>,
    /// Manifest of collected package names
    pub manifest: PathBuf,
    /// Directories searched inside each clone, relative to the clone root.
    /// An empty path is the clone root itself.
    pub search_roots: Vec<PathBuf>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            filter: None,
            output_root: None,
            manifest: PathBuf::from("TestedPackages.txt"),
            search_roots: default_search_roots(),
        }
    }
}

/// Rewinding clones to an earlier point in history
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// `YYYY-MM-DD HH:MM:SS` (UTC); unset or blank disables rewinding
    pub cutoff: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub collect: CollectConfig,
    pub history: HistoryConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sources: Option<PathBuf>,
    pub clone_root: Option<PathBuf>,
    pub filter: Option<String>,
    pub output_root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub cutoff: Option<String>,
    pub search_roots: Vec<PathBuf>,
}

/// Validated, process-wide settings shared read-only by every worker and the
/// collector
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Credentials,
    pub cutoff: Option<Cutoff>,
    pub filter: String,
    pub output_root: PathBuf,
    pub manifest_path: PathBuf,
    pub sources_path: PathBuf,
    pub clone_root: PathBuf,
    pub search_roots: Vec<PathBuf>,
}

/// The clone root itself, then the conventional Java source layout
pub fn default_search_roots() -> Vec<PathBuf> {
    vec![PathBuf::new(), PathBuf::from("src/main/java/com")]
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/harvest/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("harvest").join("config.toml"))
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        // A blank BEFORE_DATE explicitly disables the cutoff
        if let Some(cutoff) = var(CUTOFF_ENV) {
            self.history.cutoff = Some(cutoff);
        }
        if let Some(filter) = non_empty(FILTER_ENV) {
            self.collect.filter = Some(filter);
        }
        if let Some(output) = non_empty(OUTPUT_ROOT_ENV) {
            self.collect.output_root = Some(PathBuf::from(output));
        }
        if let Some(sources) = non_empty(SOURCES_ENV) {
            self.sources.path = PathBuf::from(sources);
        }
        if let Some(clone_root) = non_empty(CLONE_ROOT_ENV) {
            self.sources.clone_root = PathBuf::from(clone_root);
        }
        if let Some(manifest) = non_empty(MANIFEST_ENV) {
            self.collect.manifest = PathBuf::from(manifest);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(path) = overrides.sources {
            self.sources.path = path;
        }
        if let Some(root) = overrides.clone_root {
            self.sources.clone_root = root;
        }
        if let Some(filter) = overrides.filter {
            self.collect.filter = Some(filter);
        }
        if let Some(output) = overrides.output_root {
            self.collect.output_root = Some(output);
        }
        if let Some(manifest) = overrides.manifest {
            self.collect.manifest = manifest;
        }
        if let Some(cutoff) = overrides.cutoff {
            self.history.cutoff = Some(cutoff);
        }
        if !overrides.search_roots.is_empty() {
            self.collect.search_roots = overrides.search_roots;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides().with_cli_overrides(overrides))
    }

    /// Validate the configuration and bind it to credentials
    ///
    /// Missing required settings and an unparseable cutoff are fatal.
    pub fn resolve(&self, credentials: Credentials) -> Result<RunConfig> {
        let filter = self
            .collect
            .filter
            .clone()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Missing package filter. Set {} or collect.filter",
                    FILTER_ENV
                ))
            })?;

        let output_root = self
            .collect
            .output_root
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Missing output root. Set {} or collect.output_root",
                    OUTPUT_ROOT_ENV
                ))
            })?;

        let cutoff = Cutoff::parse_optional(self.history.cutoff.as_deref())?;

        for root in &self.collect.search_roots {
            let escapes = root
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
            if escapes {
                return Err(Error::Config(format!(
                    "Search root '{}' must be relative to the clone directory",
                    root.display()
                )));
            }
        }

        if self.collect.search_roots.is_empty() {
            return Err(Error::Config(
                "collect.search_roots must name at least one directory".to_string(),
            ));
        }

        Ok(RunConfig {
            credentials,
            cutoff,
            filter,
            output_root,
            manifest_path: self.collect.manifest.clone(),
            sources_path: self.sources.path.clone(),
            clone_root: self.sources.clone_root.clone(),
            search_roots: self.collect.search_roots.clone(),
        })
    }
}
