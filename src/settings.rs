use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::API_BASE_URL;
use crate::error::SettingsError;
use crate::fetcher::{Endpoints, Envelope};
use crate::filter::DEFAULT_RANGE_DAYS;
use crate::marker::MarkerStyle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub envelope: Envelope,
    pub markers: MarkerStyle,
    pub per_page: Option<u32>,
    pub default_range_days: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: API_BASE_URL.to_string(),
            envelope: Envelope::default(),
            markers: MarkerStyle::default(),
            per_page: None,
            default_range_days: DEFAULT_RANGE_DAYS,
        }
    }
}

impl Settings {
    pub fn config_file_path() -> Result<PathBuf, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(dir.join("newsmap").join("config.toml"))
    }

    /// Settings from the user config file, or the built-in defaults when the
    /// file is absent or unreadable.
    pub fn load() -> Self {
        match Self::config_file_path().and_then(|path| Self::load_from(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::with_base(&self.api_base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = Settings::from_toml_str(
            r##"
            api_base_url = "http://localhost:5000"
            per_page = 25

            [markers]
            max_radius = 20.0
            selected_color = "#ff0000"
            "##,
        )
        .unwrap();

        assert_eq!(settings.endpoints().news, "http://localhost:5000/news");
        assert_eq!(settings.envelope, Envelope::Feeds);
        assert_eq!(settings.per_page, Some(25));
        assert_eq!(settings.default_range_days, DEFAULT_RANGE_DAYS);
        assert_eq!(settings.markers.max_radius, 20.0);
        assert_eq!(settings.markers.min_radius, 5.0);
        assert_eq!(settings.markers.selected_color, "#ff0000");
    }

    #[test]
    fn flat_envelope_is_selectable() {
        let settings = Settings::from_toml_str(r#"envelope = "news""#).unwrap();
        assert_eq!(settings.envelope, Envelope::News);

        let err = Settings::from_toml_str(r#"envelope = "rows""#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(Settings::from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let err = Settings::from_toml_str("per_page = \"many\"").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("newsmap_settings_does_not_exist.toml");
        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }
}
