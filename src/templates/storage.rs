//! Template storage functionality
//!
//! Persists the whole [`AppState`] as one JSON file in the data directory.

use super::{default_state, AppState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Name of the state file inside the data directory
pub const DATA_FILE_NAME: &str = "templates.json";

/// Load/save contract for the full application state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state, falling back to defaults when nothing usable is stored
    async fn load(&self) -> Result<AppState>;

    /// Persist the full state
    async fn save(&self, state: &AppState) -> Result<()>;
}

/// File-backed state store
#[derive(Debug, Clone)]
pub struct TemplateStorage {
    data_dir: PathBuf,
    data_file: PathBuf,
}

impl TemplateStorage {
    /// Open a store rooted at `data_dir`, creating the directory if needed
    pub async fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        let data_file = data_dir.join(DATA_FILE_NAME);

        Ok(Self { data_dir, data_file })
    }

    /// Path of the state file
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    async fn quarantine(&self) {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let target = self
            .data_dir
            .join(format!("{DATA_FILE_NAME}.corrupt-{stamp}"));
        match fs::rename(&self.data_file, &target).await {
            Ok(()) => warn!("Moved corrupt state file to {}", target.display()),
            Err(e) => warn!("Failed to move corrupt state file aside: {}", e),
        }
    }
}

#[async_trait]
impl StateStore for TemplateStorage {
    /// Load the stored state.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// moved aside as `templates.json.corrupt-<timestamp>` before the defaults
    /// are written. Neither case is an error.
    async fn load(&self) -> Result<AppState> {
        match fs::read_to_string(&self.data_file).await {
            Ok(content) => match serde_json::from_str::<AppState>(&content) {
                Ok(state) => return Ok(state),
                Err(e) => {
                    warn!("State file {} is corrupt: {}", self.data_file.display(), e);
                    self.quarantine().await;
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, using defaults", self.data_file.display());
            }
            Err(e) => {
                warn!("Failed to read state file {}: {}", self.data_file.display(), e);
                self.quarantine().await;
            }
        }

        let state = default_state();
        if let Err(e) = self.save(&state).await {
            warn!("Failed to write default state: {:#}", e);
        }
        Ok(state)
    }

    /// Persist the state by writing a temporary file and renaming it over the
    /// target, falling back to a direct write if that fails
    async fn save(&self, state: &AppState) -> Result<()> {
        fs::create_dir_all(&self.data_dir).await?;
        let content = serde_json::to_string_pretty(state)?;
        let temp = self
            .data_dir
            .join(format!("{DATA_FILE_NAME}.{}.tmp", Uuid::new_v4()));

        let atomic = async {
            fs::write(&temp, &content).await?;
            fs::rename(&temp, &self.data_file).await
        };
        if let Err(e) = atomic.await {
            warn!("Atomic save failed ({}), writing {} directly", e, self.data_file.display());
            let _ = fs::remove_file(&temp).await;
            fs::write(&self.data_file, &content)
                .await
                .with_context(|| format!("Failed to write {}", self.data_file.display()))?;
        }

        debug!("Saved {} templates", state.templates.len());
        Ok(())
    }
}
