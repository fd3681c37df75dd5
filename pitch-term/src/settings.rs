//! # Settings Module
//!
//! Persists the user's reference pitch, last capture source and engine
//! sizes between runs as a small JSON file.

use anyhow::{Context, Result};
use log::warn;
use pitch_core::EngineConfig;
use pitch_core::tuning::DEFAULT_REFERENCE_HZ;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::SourceKind;

/// Settings remembered between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Reference pitch for A4 in Hz.
    pub reference_pitch: f32,
    /// The capture source used last time.
    pub last_source: Option<SourceKind>,
    /// Custom capture command for the `command` source.
    pub capture_command: Option<String>,
    pub engine: EngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reference_pitch: DEFAULT_REFERENCE_HZ,
            last_source: None,
            capture_command: None,
            engine: EngineConfig::default(),
        }
    }
}

/// Default location: `<config dir>/pitchscope/settings.json`.
pub fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pitchscope").join("settings.json"))
}

impl Settings {
    /// Loads settings from `path`.
    ///
    /// A missing file yields the defaults; an unreadable or corrupt one does
    /// too, with a warning.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(mut settings) => {
                settings.ensure_valid_engine();
                settings
            }
            Err(e) => {
                warn!("Ignoring settings file {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = serde_json::from_str(&content).context("parsing settings JSON")?;
        Ok(settings)
    }

    /// Replaces an engine configuration that could not drive a session with
    /// the defaults, so a bad value never outlives the run that set it.
    pub fn ensure_valid_engine(&mut self) {
        if let Err(e) = self.engine.validate() {
            warn!("{}; using default engine settings", e);
            self.engine = EngineConfig::default();
        }
    }

    /// Writes the settings to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("pitchscope-test-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = Settings::load(&temp_path("missing"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("round");
        let settings = Settings {
            reference_pitch: 442.0,
            last_source: Some(SourceKind::Command),
            capture_command: Some("arecord -q -t raw -f S16_LE -c 1 -r {rate}".into()),
            engine: EngineConfig {
                band_count: 24,
                ..EngineConfig::default()
            },
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path), settings);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_engine_config_loads_as_defaults() {
        let path = temp_path("bad-engine");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{ "reference_pitch": 442.0, "engine": { "band_count": 1 } }"#,
        )
        .unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.engine, EngineConfig::default());
        assert_eq!(settings.reference_pitch, 442.0);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_override_is_replaced_before_saving() {
        let path = temp_path("bad-override");
        let mut settings = Settings::default();
        settings.engine.band_count = 1;
        settings.ensure_valid_engine();
        assert_eq!(settings.engine.band_count, EngineConfig::default().band_count);

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).engine, EngineConfig::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{ "reference_pitch": 432.0 }"#).unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.reference_pitch, 432.0);
        assert_eq!(settings.engine, EngineConfig::default());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
