//! itmpl configuration handling.
//! The configuration is a JSON document stored in the per-user application
//! directory; a missing file means every option has its default value.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{APP_NAME, CONFIG_FILE};
use crate::error::{Error, Result};

/// Returns the per-user application directory, e.g. `~/.config/itmpl`.
pub fn app_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    app_dir().join(CONFIG_FILE)
}

fn default_extra_templates_dir() -> PathBuf {
    app_dir().join("templates")
}

/// itmpl configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the user's own templates
    #[serde(default = "default_extra_templates_dir")]
    pub extra_templates_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self { extra_templates_dir: default_extra_templates_dir() }
    }
}

/// Names of the configuration options, as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigOption {
    #[value(name = "extra_templates_dir")]
    ExtraTemplatesDir,
}

impl std::fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigOption::ExtraTemplatesDir => write!(f, "extra_templates_dir"),
        }
    }
}

impl Config {
    /// Returns the value of `option` as displayed to the user.
    pub fn get(&self, option: ConfigOption) -> String {
        match option {
            ConfigOption::ExtraTemplatesDir => self.extra_templates_dir.display().to_string(),
        }
    }

    /// Sets `option` from its command line representation.
    ///
    /// # Errors
    /// * `Error::ConfigError` if `value` is not valid for `option`
    pub fn set(&mut self, option: ConfigOption, value: &str) -> Result<()> {
        match option {
            ConfigOption::ExtraTemplatesDir => {
                let path = PathBuf::from(value);
                if !path.is_dir() {
                    return Err(Error::ConfigError(format!(
                        "{value} is not a valid directory for {option}"
                    )));
                }
                self.extra_templates_dir = path;
            }
        }
        Ok(())
    }
}

/// Reads the configuration file, falling back to the defaults if it is missing.
///
/// # Errors
/// * `Error::ConfigError` if the file is not a valid configuration document
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No configuration file at '{}', using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::ConfigError(format!("invalid configuration '{}': {e}", path.display())))
}

/// Writes `config` to `path`, replacing any previous content.
pub fn write_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| Error::ConfigError(e.to_string()))?;
    fs::write(path, content)?;
    Ok(())
}
