use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

use super::types::Config;
use super::validation::Validate;
use super::APP_DIR_NAME;

pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Loader for `<config dir>/tungsten-console/config.toml`.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_DIR_NAME);

        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(Self { config_path: config_dir.join("config.toml") })
    }

    /// Loader for an explicit file path.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self { config_path: path.as_ref().to_path_buf() }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn load_or_create(&self) -> Result<Config> {
        if !self.config_path.exists() {
            let default_config = Config::default();
            self.save(&default_config)?;
            Ok(default_config)
        } else {
            self.load_and_normalize()
        }
    }

    fn load_and_normalize(&self) -> Result<Config> {
        let content = fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        let mut config: Config = match toml::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                let backup_path = self.config_path.with_extension("toml.backup");
                fs::write(&backup_path, &content).context("Failed to write backup")?;

                error!(
                    "Config file corrupted: {}. Backup saved to {:?}. Using defaults.",
                    e, backup_path
                );

                let default = Config::default();
                self.save(&default)?;
                return Ok(default);
            }
        };

        config.validate();

        let current_toml = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        if content.trim() != current_toml.trim() {
            self.save(&config)?;
        }

        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, toml_string).context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::at(dir.path().join("config.toml"));

        let config = loader.load_or_create().unwrap();
        assert!(loader.config_path().exists());
        assert_eq!(config.http.port, 8181);
        assert_eq!(config.console.log_history_capacity, -1);
    }

    #[test]
    fn test_partial_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[http]\nport = 9000\n\n[console]\nlog_history_capacity = 250\n").unwrap();

        let config = ConfigLoader::at(&path).load_or_create().unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.http.ip, "0.0.0.0");
        assert_eq!(config.console.log_history_capacity, 250);
        assert!(config.capture.errors);
        assert!(!config.capture.debug);
    }

    #[test]
    fn test_corrupted_file_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is [not toml").unwrap();

        let config = ConfigLoader::at(&path).load_or_create().unwrap();
        assert_eq!(config.http.port, 8181);
        assert!(path.with_extension("toml.backup").exists());
    }
}
