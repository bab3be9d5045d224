use anyhow::{Context, Result};
use modelcheck::CheckOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "modelcheck.toml";

/// Project context for modelcheck runs
pub struct ProjectContext {
    /// Directory relative paths in the config are resolved against
    pub project_root: PathBuf,
    /// Path to the config file, when one was found
    pub config_path: Option<PathBuf>,
    /// Loaded configuration (defaults when no file exists)
    pub config: ModelcheckConfig,
}

/// Configuration stored in modelcheck.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelcheckConfig {
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub checks: CheckOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    /// EDMX mapping description
    pub mapping: Option<PathBuf>,
    /// JSON model snapshot, used when no mapping is given
    pub snapshot: Option<PathBuf>,
    /// Entity set patterns to leave out of the model
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// JSON live-schema snapshot
    pub snapshot: Option<PathBuf>,
    /// Schema namespace filter
    pub schema: Option<String>,
}

impl ProjectContext {
    /// Find and load project context from current directory or ancestors
    pub fn find() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::find_from(&current_dir)
    }

    /// Find project context starting from the given directory.
    ///
    /// Without a config file the start directory becomes the project root.
    pub fn find_from(start: &Path) -> Result<Self> {
        match Self::find_config(start) {
            Some(config_path) => Self::from_config_path(config_path),
            None => Ok(Self {
                project_root: start.to_path_buf(),
                config_path: None,
                config: ModelcheckConfig::default(),
            }),
        }
    }

    fn from_config_path(config_path: PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: ModelcheckConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        let project_root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            project_root,
            config_path: Some(config_path),
            config,
        })
    }

    /// Walk up from `start` looking for modelcheck.toml, stopping at the
    /// directory holding Cargo.toml.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            let candidate = current.join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if current.join("Cargo.toml").exists() || !current.pop() {
                return None;
            }
        }
    }

    /// Resolve a path from the config file against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
