use serde::Deserialize;
use tracing::warn;

use crate::storage::{LocalStorage, THEME_KEY};

/// Colour scheme preference, persisted under the theme key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

/// The saved preference, or `fallback` when nothing usable is stored.
pub fn load_theme(storage: &dyn LocalStorage, fallback: Theme) -> Theme {
    storage
        .get(THEME_KEY)
        .and_then(|v| Theme::parse(&v))
        .unwrap_or(fallback)
}

pub fn save_theme(storage: &dyn LocalStorage, theme: Theme) {
    if let Err(e) = storage.set(THEME_KEY, theme.as_str()) {
        warn!(error = %e, "failed to persist theme preference");
    }
}
