use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Application settings, read from `settings.json` in the config dir.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Commits fetched per page of the history list
    pub commit_page_size: usize,
    /// Refresh working-copy panels when files change on disk
    pub watch_filesystem: bool,
    /// Overrides the default log filter (PRISM_LOG / RUST_LOG still win)
    pub log_filter: Option<String>,
}

/// Default number of commits per page
pub const DEFAULT_COMMIT_PAGE_SIZE: usize = 50;

impl Default for Config {
    fn default() -> Self {
        Self {
            commit_page_size: DEFAULT_COMMIT_PAGE_SIZE,
            watch_filesystem: true,
            log_filter: None,
        }
    }
}

impl Config {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("prism-layout"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("settings.json"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Read settings from `path`. On first run (no file yet) the defaults
    /// are written out so there is a file to edit.
    pub fn load_from(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path);
                return config;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read settings");
                return Self::default();
            }
        };
        let mut config: Self = serde_json::from_str(&data).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Self::default()
        });
        if config.commit_page_size == 0 {
            config.commit_page_size = DEFAULT_COMMIT_PAGE_SIZE;
        }
        config
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::warn!("Failed to create config dir: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    tracing::warn!("Failed to save config: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to serialize config: {e}"),
        }
    }
}
