//! Configuration: API credentials and selection defaults, stored as YAML in
//! the platform config directory with `PLATTER_*` environment overrides.

use std::path::{Path, PathBuf};

use platter_common::SelectionSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const CONFIG_DIR: &str = "platter";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_true() -> bool {
    true
}

/// Discogs credentials: the registered consumer pair plus the access token
/// obtained through the OAuth handshake.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscogsConfig {
    #[serde(default)]
    pub consumer_key: String,
    #[serde(default)]
    pub consumer_secret: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_token_secret: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Last.fm credentials: API key/shared secret plus the session key from
/// `auth.getsession`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LastfmConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub shared_secret: String,
    #[serde(default)]
    pub session_key: Option<String>,
}

/// Track selection defaults applied when a queued release loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_true")]
    pub select_all_tracks_per_release: bool,
    #[serde(default)]
    pub select_subtracks_by_default: bool,
    #[serde(default = "default_true")]
    pub show_features: bool,
    #[serde(default)]
    pub select_features_by_default: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            select_all_tracks_per_release: true,
            select_subtracks_by_default: false,
            show_features: true,
            select_features_by_default: false,
        }
    }
}

impl SelectionConfig {
    pub fn to_settings(&self) -> SelectionSettings {
        SelectionSettings {
            select_all_tracks_per_release: self.select_all_tracks_per_release,
            select_subtracks_by_default: self.select_subtracks_by_default,
            show_features: self.show_features,
            select_features_by_default: self.select_features_by_default,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discogs: DiscogsConfig,
    #[serde(default)]
    pub lastfm: LastfmConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
}

impl Config {
    /// Path of the config file in the platform config directory.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Config("no config directory on this platform".to_string()))?;
        Ok(dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the config file, falling back to defaults when it doesn't exist,
    /// then apply `PLATTER_*` environment overrides. A `.env` file is picked
    /// up in dev.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            info!("no config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Serialization(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml =
            serde_yaml::to_string(self).map_err(|e| ConfigError::Serialization(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("PLATTER_DISCOGS_CONSUMER_KEY") {
            self.discogs.consumer_key = v;
        }
        if let Ok(v) = std::env::var("PLATTER_DISCOGS_CONSUMER_SECRET") {
            self.discogs.consumer_secret = v;
        }
        if let Ok(v) = std::env::var("PLATTER_LASTFM_API_KEY") {
            self.lastfm.api_key = v;
        }
        if let Ok(v) = std::env::var("PLATTER_LASTFM_SHARED_SECRET") {
            self.lastfm.shared_secret = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = Config::default();
        config.discogs.consumer_key = "ck".to_string();
        config.discogs.username = Some("collector".to_string());
        config.lastfm.api_key = "lk".to_string();
        config.lastfm.session_key = Some("sk".to_string());
        config.selection.select_subtracks_by_default = true;

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.discogs.consumer_key, "ck");
        assert_eq!(loaded.discogs.username.as_deref(), Some("collector"));
        assert_eq!(loaded.lastfm.session_key.as_deref(), Some("sk"));
        assert!(loaded.selection.select_subtracks_by_default);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "discogs:\n  consumer_key: only-this\n").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.discogs.consumer_key, "only-this");
        assert!(loaded.selection.select_all_tracks_per_release);
        assert!(loaded.selection.show_features);
        assert!(loaded.lastfm.api_key.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn selection_config_maps_to_settings() {
        let config = SelectionConfig {
            select_all_tracks_per_release: false,
            select_subtracks_by_default: true,
            show_features: false,
            select_features_by_default: true,
        };
        let settings = config.to_settings();
        assert!(!settings.select_all_tracks_per_release);
        assert!(settings.select_subtracks_by_default);
        assert!(!settings.show_features);
        assert!(settings.select_features_by_default);
    }
}
