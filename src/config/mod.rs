//! Configuration management module
//!
//! Handles the data directory location, autosave timing and import limits.

use crate::templates::autosave::DEFAULT_DELAY;
use crate::templates::validate::ImportLimits;
use anyhow::{anyhow, Result};
use chrono::Utc;
use colored::*;
use dirs::{config_dir, data_dir};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::warn;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "PROMPT_TEMPLATES_DATA_DIR";

const APP_DIR: &str = "prompt-templates";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the template store
    pub data_dir: PathBuf,
    /// Quiet period before form edits are persisted
    pub autosave_delay_ms: u64,
    /// Limits applied to imported share links
    pub import_limits: ImportLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: get_default_data_dir(),
            autosave_delay_ms: DEFAULT_DELAY.as_millis() as u64,
            import_limits: ImportLimits::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, applying the environment override
    pub async fn load() -> Result<Self> {
        let mut config = Self::load_from(&get_config_file_path()).await?;
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    /// Load configuration from a specific file.
    ///
    /// A missing file yields defaults. An unreadable or malformed file is moved
    /// aside as `config.json.corrupt-<timestamp>` and defaults are used, so
    /// `config reset` and every other command keep working.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                set_aside(path).await;
                return Ok(Self::default());
            }
        };

        match serde_json::from_str::<Config>(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Invalid config file {}: {}, using defaults", path.display(), e);
                set_aside(path).await;
                Ok(Self::default())
            }
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        self.save_to(&get_config_file_path()).await
    }

    /// Save configuration to a specific file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Point the store at another directory and persist the choice
    pub async fn set_data_dir(&mut self, dir: PathBuf) -> Result<()> {
        if dir.as_os_str().is_empty() {
            return Err(anyhow!("Data directory cannot be empty"));
        }
        self.data_dir = dir;
        self.save().await
    }

    /// Autosave quiet period
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("📋 Current Configuration:");
        println!("  Config File: {}", get_config_file_path().display());
        println!("  Data Directory: {}", self.data_dir.display().to_string().bright_cyan());
        println!("  Autosave Delay: {} ms", self.autosave_delay_ms);
        let limits = &self.import_limits;
        println!("  Import Limits:");
        println!("    templates: {}, fields: {}, options: {}", limits.max_templates, limits.max_fields, limits.max_options);
        println!(
            "    id: {}, name: {}, description: {}, body: {}",
            limits.max_id_length, limits.max_name_length, limits.max_description_length, limits.max_template_length
        );
        println!(
            "    field key: {}, label: {}, default: {}, option: {}",
            limits.max_field_key_length,
            limits.max_field_label_length,
            limits.max_field_default_length,
            limits.max_option_length
        );
    }

    /// Reset configuration to defaults
    pub async fn reset(&mut self) -> Result<()> {
        *self = Self::default();

        // Remove config file if it exists
        let config_path = get_config_file_path();
        if config_path.exists() {
            fs::remove_file(&config_path).await?;
        }

        Ok(())
    }
}

/// Rename a bad config file so the next save starts clean
async fn set_aside(path: &Path) {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let mut target = path.as_os_str().to_owned();
    target.push(format!(".corrupt-{stamp}"));
    match fs::rename(path, &target).await {
        Ok(()) => warn!("Moved bad config file to {}", Path::new(&target).display()),
        Err(e) => warn!("Failed to move bad config file aside: {}", e),
    }
}

/// Get the configuration directory path
fn get_config_dir() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Get the configuration file path
fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

/// Default location of the template store
fn get_default_data_dir() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
