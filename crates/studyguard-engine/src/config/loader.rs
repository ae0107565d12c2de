use super::schema::StudyGuardConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Files consulted when no path is given, first match wins.
    pub fn search_path() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./studyguard.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".studyguard").join("config.yaml"));
        }
        paths
    }

    /// Load `path` when given, otherwise the first file on the search path,
    /// otherwise built-in defaults.
    pub async fn load(path: Option<&Path>) -> Result<StudyGuardConfig, ConfigError> {
        if let Some(path) = path {
            return Self::load_from(path).await;
        }

        for candidate in Self::search_path() {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                debug!("Using config {}", candidate.display());
                return Self::load_from(&candidate).await;
            }
        }

        debug!("No config file found, using defaults");
        Ok(StudyGuardConfig::default())
    }

    /// An empty file is the same as no file.
    pub async fn load_from(path: &Path) -> Result<StudyGuardConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(StudyGuardConfig::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }
}
