//! Configuration System
//!
//! Hierarchical configuration: defaults, then `config/config.toml` under the
//! workspace root, then `config/{CADENCE_ENV}.toml`, then `CADENCE_*`
//! environment variables.

use crate::error::EngineError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CadenceConfig {
    /// Task store settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Generation pass settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the sled database backing the task store
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".cadence/tasks.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    /// Abort a pass when a per-template existence check fails, instead of
    /// recording the failure and continuing with the rest of the batch.
    #[serde(default)]
    pub fail_fast: bool,
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace root.
    ///
    /// Precedence: `config/config.toml` (base), then `config/{CADENCE_ENV}.toml`
    /// (env-specific, `development` by default), then `CADENCE_*` environment
    /// variables (e.g. `CADENCE_STORAGE__PATH`).
    pub fn load(workspace_root: &Path) -> Result<CadenceConfig, EngineError> {
        let config_dir = workspace_root.join("config");
        let env_name = std::env::var("CADENCE_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder();

        let base_path = config_dir.join("config.toml");
        if base_path.exists() {
            builder = builder.add_source(File::from(base_path).required(false));
        }

        let env_path = config_dir.join(format!("{}.toml", env_name));
        if env_path.exists() {
            builder = builder.add_source(File::from(env_path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("CADENCE").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from an explicit file, still honoring `CADENCE_*`
    /// environment overrides.
    pub fn load_from_file(path: &Path) -> Result<CadenceConfig, EngineError> {
        let config = Config::builder()
            .add_source(File::from(path.to_path_buf()))
            .add_source(Environment::with_prefix("CADENCE").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CadenceConfig::default();
        assert_eq!(config.storage.path, PathBuf::from(".cadence/tasks.db"));
        assert!(!config.generation.fail_fast);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn load_from_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cadence.toml");
        std::fs::write(
            &path,
            r#"
[storage]
path = "/var/lib/cadence/tasks.db"

[generation]
fail_fast = true

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/cadence/tasks.db"));
        assert!(config.generation.fail_fast);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn load_without_files_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ConfigLoader::load(dir.path()).unwrap();
        assert_eq!(config.storage.path, PathBuf::from(".cadence/tasks.db"));
    }
}
