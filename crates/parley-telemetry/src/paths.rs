//! Path resolution for saved history and configuration

use crate::TelemetryError;
use std::path::PathBuf;

/// Overrides the data directory (defaults to `~/.parley`)
pub const HOME_ENV: &str = "PARLEY_HOME";

/// Resolves standard paths under the parley data directory
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self, TelemetryError> {
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self {
                root: PathBuf::from(root),
            });
        }

        let home = dirs::home_dir().ok_or(TelemetryError::NoHome)?;
        Ok(Self {
            root: home.join(".parley"),
        })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.root.join("history")
    }

    /// History file for one UI surface
    pub fn history_file(&self, panel_id: &str) -> PathBuf {
        let name = panel_id.replace(['/', '\\', '.'], "-");
        self.history_dir().join(format!("{name}.jsonl"))
    }
}
