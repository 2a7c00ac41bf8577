use crate::core::config::data::{path_display, Config};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur when loading, saving or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {}: {source}", path_display(path))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config at {}: {source}", path_display(path))]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Failed to write config at {}: {source}", path_display(path))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No API key found. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("Could not determine the platform configuration directory")]
    NoProjectDirs,
}

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("org", "parlance", "parlance").ok_or(ConfigError::NoProjectDirs)
}

impl Config {
    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    pub fn load() -> Result<Config, ConfigError> {
        Self::load_from_path(&Self::config_path()?)
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };
        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_err)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(write_err)?;

        temp_file.write_all(contents.as_bytes()).map_err(write_err)?;
        temp_file.as_file_mut().sync_all().map_err(write_err)?;
        temp_file
            .persist(config_path)
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::config_path()?)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Configured data directory, or the platform data dir.
    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Read the API key from the environment variable named by `api_key_env`.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        Self::api_key_from(self.api_key_env(), |name| std::env::var(name).ok())
    }

    pub(crate) fn api_key_from(
        var_name: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        lookup(var_name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(var_name.to_string()))
    }
}
