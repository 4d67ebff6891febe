use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::app::Theme;

/// Client configuration, loaded from vidshare.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiSection,
    pub storage: StorageSection,
    pub ui: UiSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Root of the REST API; endpoint paths are appended to it.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// JSON file holding the persisted identity, token and theme.
    pub path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: "vidshare-storage.json".into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UiSection {
    /// Used until the user picks a theme.
    pub default_theme: Theme,
}

impl ClientConfig {
    /// Load config from a TOML file. Falls back to defaults if the file doesn't exist.
    /// Environment variables override TOML values.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VIDSHARE_API_URL") {
            self.api.base_url = v;
        }
        if let Ok(v) = std::env::var("VIDSHARE_TIMEOUT_SECS")
            && let Ok(secs) = v.parse()
        {
            self.api.timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("VIDSHARE_STORAGE_PATH") {
            self.storage.path = v;
        }
        if let Ok(v) = std::env::var("VIDSHARE_THEME")
            && let Some(theme) = Theme::parse(&v)
        {
            self.ui.default_theme = theme;
        }
    }
}
