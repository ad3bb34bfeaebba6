//! services/api/src/adapters/theme_store.rs
//!
//! Persists the theme preference as a small JSON file. This is the only state
//! that outlives a session.

use async_trait::async_trait;
use docsensei_core::domain::Theme;
use docsensei_core::ports::{PortError, PortResult, PreferenceStore};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Clone)]
pub struct FileThemeStore {
    path: PathBuf,
}

impl FileThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Serialize, Deserialize)]
struct ThemeRecord {
    theme: String,
}

#[async_trait]
impl PreferenceStore for FileThemeStore {
    async fn load_theme(&self) -> PortResult<Option<Theme>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        match serde_json::from_str::<ThemeRecord>(&raw) {
            Ok(record) => Ok(Some(Theme::from_label(&record.theme))),
            Err(e) => {
                warn!(
                    "Ignoring unreadable theme file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    async fn save_theme(&self, theme: Theme) -> PortResult<()> {
        let record = ThemeRecord {
            theme: theme.as_str().to_string(),
        };
        let json =
            serde_json::to_string(&record).map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        info!("Saved theme preference '{}'", theme);
        Ok(())
    }
}
