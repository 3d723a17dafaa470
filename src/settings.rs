//! Feature toggles and run policy read from `config/settings.json`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Settings file location relative to the mod root.
pub const SETTINGS_RELATIVE_PATH: &str = "config/settings.json";

const ENV_STRICT_MODE: &str = "COMPAT_STRICT_MODE";
const ENV_DEBUG: &str = "COMPAT_DEBUG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    #[serde(alias = "EnableWeaponsCompat")]
    pub enable_weapons_compat: bool,
    #[serde(alias = "EnableAmmoCompat")]
    pub enable_ammo_compat: bool,
    #[serde(alias = "EnablePlatesCompat")]
    pub enable_plates_compat: bool,
    #[serde(alias = "EnableStimBuffs")]
    pub enable_stim_buffs: bool,
    /// Verbose summaries and per-item diagnostics.
    #[serde(alias = "Debug")]
    pub debug: bool,
    /// Escalate recoverable per-item failures into run-aborting errors.
    #[serde(alias = "StrictMode")]
    pub strict_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_weapons_compat: true,
            enable_ammo_compat: true,
            enable_plates_compat: true,
            enable_stim_buffs: true,
            debug: false,
            strict_mode: false,
        }
    }
}

impl Settings {
    pub fn default_path(mod_root: &Path) -> PathBuf {
        mod_root.join(SETTINGS_RELATIVE_PATH)
    }

    /// Parse a settings document; unknown keys are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing settings {}", path.display()))
    }

    /// Load `path`, falling back to defaults when it is missing or broken.
    ///
    /// Environment overrides are applied on top either way.
    pub fn load_or_default(path: &Path) -> Self {
        let mut settings = if path.is_file() {
            match Self::load(path) {
                Ok(settings) => settings,
                Err(err) => {
                    warn!(error = %format!("{err:#}"), "failed to load settings, using defaults");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        settings.apply_env_overrides();
        settings
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(strict) = env_flag(ENV_STRICT_MODE) {
            self.strict_mode = strict;
        }
        if let Some(debug) = env_flag(ENV_DEBUG) {
            self.debug = debug;
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    parse_flag(&raw)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_enable_every_feature() {
        let settings = Settings::default();
        assert!(settings.enable_ammo_compat);
        assert!(settings.enable_plates_compat);
        assert!(settings.enable_weapons_compat);
        assert!(settings.enable_stim_buffs);
        assert!(!settings.debug);
        assert!(!settings.strict_mode);
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"EnablePlatesCompat": false, "debug": true}"#).unwrap();
        assert!(!settings.enable_plates_compat);
        assert!(settings.debug);
        assert!(settings.enable_ammo_compat);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Settings::load(file.path()).is_err());
        let loaded = Settings::load_or_default(file.path());
        assert!(loaded.enable_ammo_compat);
    }

    #[test]
    fn parses_flag_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
