use super::types::GlobalConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATHS: &[&str] = &["./dircrawler.toml", "./config/dircrawler.toml"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the default locations, falling back to built-in defaults
    pub fn load() -> Result<GlobalConfig> {
        Self::load_with_custom_path(None)
    }

    /// Load configuration with a custom path
    ///
    /// A custom path that does not exist is an error; the default locations are optional.
    pub fn load_with_custom_path(custom_path: Option<&Path>) -> Result<GlobalConfig> {
        if let Some(path) = custom_path {
            return Self::load_from_file(path)
                .with_context(|| format!("Failed to load config from custom path: {:?}", path));
        }

        for path in Self::candidate_paths() {
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from: {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {:#}", path, e);
                        continue;
                    }
                }
            }
        }

        tracing::debug!("No configuration file found, using default settings");
        Ok(GlobalConfig::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect();
        if let Some(dirs) = ProjectDirs::from("io", "dircrawler", "dircrawler") {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        paths
    }

    fn load_from_file(path: &Path) -> Result<GlobalConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: GlobalConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {:?}", path))?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    fn validate_config(config: &GlobalConfig) -> Result<()> {
        if config.scan.threads == 0 {
            anyhow::bail!("scan.threads must be greater than 0");
        }

        if config.scan.timeout_secs == 0 {
            anyhow::bail!("scan.timeout_secs must be greater than 0");
        }

        if config.scan.status_codes.trim().is_empty() {
            anyhow::bail!("scan.status_codes cannot be empty");
        }

        Ok(())
    }
}
