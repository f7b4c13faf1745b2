//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/clonemerge/clonemerge.toml`
//! 3. Local config: a file named by the caller
//! 4. Environment variables: `CLONEMERGE_*` prefix, `__` between nested keys

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::BOUNDARY_RESOLUTION;

/// Tree comparison settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MergeSettings {
    /// Tolerance in bases for breakpoint equality
    pub boundary_resolution: u64,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            boundary_resolution: BOUNDARY_RESOLUTION,
        }
    }
}

/// Raw merge settings for intermediate parsing (None = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawMergeSettings {
    pub boundary_resolution: Option<u64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store_path: Option<PathBuf>,
    pub merge: RawMergeSettings,
}

/// Unified configuration for clonemerge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// TOML object store (default: `<data dir>/clonemerge/store.toml`)
    pub store_path: PathBuf,
    pub merge: MergeSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            merge: MergeSettings::default(),
        }
    }
}

fn default_store_path() -> PathBuf {
    ProjectDirs::from("", "", "clonemerge")
        .map(|dirs| dirs.data_dir().join("store.toml"))
        .unwrap_or_else(|| PathBuf::from("clonemerge-store.toml"))
}

/// Get the XDG config directory for clonemerge.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "clonemerge").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("clonemerge.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store_path: overlay
                .store_path
                .clone()
                .unwrap_or_else(|| self.store_path.clone()),
            merge: MergeSettings {
                boundary_resolution: overlay
                    .merge
                    .boundary_resolution
                    .unwrap_or(self.merge.boundary_resolution),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_config` - Optional config file applied over the global one;
    ///   skipped when it does not exist
    pub fn load(local_config: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("loading global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        // 3. Local config
        if let Some(local) = local_config {
            if local.exists() {
                debug!("loading local config {}", local.display());
                current = current.merge_with(&load_raw_settings(local)?);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths()?;
        Ok(current)
    }

    /// Apply CLONEMERGE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("CLONEMERGE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store_path") {
            settings.store_path = PathBuf::from(val);
        }
        match config.get::<u64>("merge.boundary_resolution") {
            Ok(val) => settings.merge.boundary_resolution = val,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(config_err(e)),
        }

        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the store path.
    fn expand_paths(&mut self) -> Result<(), ApplicationError> {
        let raw = self.store_path.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&raw).map_err(|e| ApplicationError::Config {
            message: format!("expand store_path {}: {}", raw, e),
        })?;
        self.store_path = PathBuf::from(expanded.as_ref());
        Ok(())
    }
}
