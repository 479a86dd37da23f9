//! Application settings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use preamp_mux::PreampConfig;
use serde::{Deserialize, Serialize};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Name shown for the simulated board
    #[serde(default = "default_board_id")]
    pub board_id: String,
    /// Run `init` before accepting commands
    #[serde(default = "default_true")]
    pub init_on_start: bool,
    /// Print every preamp event as it happens
    #[serde(default = "default_true")]
    pub show_events: bool,
    /// Preamp configuration
    #[serde(default)]
    pub preamp: PreampConfig,
}

fn default_board_id() -> String {
    "preamp".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            board_id: default_board_id(),
            init_on_start: true,
            show_events: true,
            preamp: PreampConfig::default(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for zonemux
    /// Uses $XDG_CONFIG_HOME/zonemux, falls back to ~/.config/zonemux
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("zonemux"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("zonemux"))
    }

    /// Default settings file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings
    ///
    /// An explicit path must exist and parse. Without one, the default file is
    /// used if present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::read(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path)?,
                _ => Self::default(),
            },
        };

        settings
            .preamp
            .validate()
            .context("Invalid preamp configuration")?;
        Ok(settings)
    }

    fn read(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    /// Save settings to `path`, or the default location
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path().context("Could not determine settings path")?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("zonemux-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"board_id": "den", "preamp": {"default_source": 2}}"#)
                .unwrap();
        assert_eq!(settings.board_id, "den");
        assert!(settings.init_on_start);
        assert_eq!(settings.preamp.default_source, 2);
        assert_eq!(settings.preamp.unit_address, preamp_regs::DEFAULT_UNIT_ADDRESS);
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path("roundtrip.json");
        let settings = Settings {
            board_id: "kitchen".into(),
            show_events: false,
            ..Default::default()
        };

        let written = settings.save(Some(&path)).unwrap();
        assert_eq!(written, path);
        assert_eq!(Settings::load(Some(&path)).unwrap(), settings);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = temp_path("does-not-exist.json");
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_invalid_preamp_config_is_rejected() {
        let path = temp_path("bad-source.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"preamp": {"default_source": 9}}"#).unwrap();

        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("default source 9"));

        let _ = std::fs::remove_file(&path);
    }
}
