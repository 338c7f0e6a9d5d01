// src/core/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use tracing::{info, warn};

use super::config_loader::ConfigPaths;

pub const THRESHOLD_RANGE: RangeInclusive<i32> = 40..=100;
pub const TRANSPARENCY_RANGE: RangeInclusive<u8> = 30..=90;
pub const UPDATE_INTERVALS: [f64; 3] = [0.5, 1.0, 2.0];

const DEFAULT_THRESHOLD: i32 = 70;
const DEFAULT_INTERVAL: f64 = 1.0;
const DEFAULT_TRANSPARENCY: u8 = 60;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("update interval {0}s is not one of 0.5, 1.0 or 2.0")]
    InvalidInterval(f64),
}

/// Maps an interval in seconds onto one of the supported sampling periods.
pub fn validate_interval(secs: f64) -> Result<Duration, ConfigError> {
    UPDATE_INTERVALS
        .iter()
        .find(|&&allowed| (allowed - secs).abs() < 1e-9)
        .map(|&allowed| Duration::from_secs_f64(allowed))
        .ok_or(ConfigError::InvalidInterval(secs))
}

pub fn clamp_threshold(celsius: i32) -> i32 {
    celsius.clamp(*THRESHOLD_RANGE.start(), *THRESHOLD_RANGE.end())
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

// Settings shared with the overlay. The sampling core only reads
// `warning_threshold` and `update_interval`; everything else is carried so
// the file round-trips.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub warning_threshold: i32,
    pub update_interval: f64,
    pub transparency: u8,
    pub text_size: TextSize,
    pub always_on_top: bool,
    pub start_with_windows: bool,
    pub position_locked: bool,
    pub widget_visible: bool,
    pub first_run: bool,
    // None means centred on the primary screen
    pub position: Option<Position>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            warning_threshold: DEFAULT_THRESHOLD,
            update_interval: DEFAULT_INTERVAL,
            transparency: DEFAULT_TRANSPARENCY,
            text_size: TextSize::default(),
            always_on_top: true,
            start_with_windows: false,
            position_locked: false,
            widget_visible: true,
            first_run: true,
            position: None,
        }
    }
}

impl Config {
    // Loads the packaged default and overlays the user file. Never fails:
    // unreadable files are logged and the previous values are kept.
    pub fn load() -> Self {
        let paths = ConfigPaths::discover();
        info!(system = ?paths.system, user = ?paths.user, "Loading configuration paths");
        Self::load_from(&paths)
    }

    pub fn load_from(paths: &ConfigPaths) -> Self {
        let mut cfg = Config::default();

        for path in [&paths.system, &paths.user] {
            if !path.exists() {
                info!(path = ?path, "No config file; keeping current values");
                continue;
            }
            match Self::read_file(path) {
                Ok(loaded) => {
                    info!(path = ?path, "Overlaying configuration");
                    cfg = loaded;
                }
                Err(e) => warn!(path = ?path, error = %format!("{e:#}"), "Ignoring unreadable config"),
            }
        }

        cfg.sanitize();
        info!(?cfg, "Configuration loaded");
        cfg
    }

    fn read_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Reading config at {path:?}"))?;
        toml::from_str(&text).with_context(|| format!("Parsing config at {path:?}"))
    }

    // Clamp or replace anything the overlay could not have written itself.
    pub fn sanitize(&mut self) {
        let threshold = clamp_threshold(self.warning_threshold);
        if threshold != self.warning_threshold {
            warn!(
                configured = self.warning_threshold,
                used = threshold,
                "warning_threshold out of range"
            );
            self.warning_threshold = threshold;
        }
        self.transparency = self
            .transparency
            .clamp(*TRANSPARENCY_RANGE.start(), *TRANSPARENCY_RANGE.end());
        if let Err(e) = validate_interval(self.update_interval) {
            warn!(error = %e, used = DEFAULT_INTERVAL, "Invalid update_interval");
            self.update_interval = DEFAULT_INTERVAL;
        }
    }

    pub fn interval(&self) -> Duration {
        validate_interval(self.update_interval)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_INTERVAL))
    }

    // Writes the user file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&ConfigPaths::discover().user)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating config directory at {parent:?}"))?;
        }
        let text = toml::to_string_pretty(self).context("Serializing config")?;
        fs::write(path, text).with_context(|| format!("Writing config to {path:?}"))?;
        info!(path = ?path, "Configuration saved");
        Ok(())
    }

    // Convenience for the overlay: a save failure is never fatal.
    pub fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            warn!(error = %format!("{e:#}"), "Could not save configuration");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(td: &TempDir) -> ConfigPaths {
        ConfigPaths {
            system: td.path().join("default.toml"),
            user: td.path().join("user").join("config.toml"),
        }
    }

    #[test]
    fn interval_whitelist() {
        assert_eq!(validate_interval(0.5), Ok(Duration::from_millis(500)));
        assert_eq!(validate_interval(2.0), Ok(Duration::from_secs(2)));
        assert_eq!(
            validate_interval(1.5),
            Err(ConfigError::InvalidInterval(1.5))
        );
    }

    #[test]
    fn missing_files_give_defaults() {
        let td = TempDir::new().unwrap();
        assert_eq!(Config::load_from(&paths(&td)), Config::default());
    }

    #[test]
    fn user_file_overrides_system_default() {
        let td = TempDir::new().unwrap();
        let p = paths(&td);
        fs::write(&p.system, "warning_threshold = 80\nupdate_interval = 2.0\n").unwrap();
        fs::create_dir_all(p.user.parent().unwrap()).unwrap();
        fs::write(&p.user, "warning_threshold = 65\n").unwrap();

        let cfg = Config::load_from(&p);
        assert_eq!(cfg.warning_threshold, 65);
        // the user file replaces the whole default, missing keys included
        assert_eq!(cfg.update_interval, 1.0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let td = TempDir::new().unwrap();
        let p = paths(&td);
        fs::write(
            &p.system,
            "warning_threshold = 120\ntransparency = 5\nupdate_interval = 3.0\n",
        )
        .unwrap();

        let cfg = Config::load_from(&p);
        assert_eq!(cfg.warning_threshold, 100);
        assert_eq!(cfg.transparency, 30);
        assert_eq!(cfg.update_interval, 1.0);
    }

    #[test]
    fn corrupt_file_keeps_previous_values() {
        let td = TempDir::new().unwrap();
        let p = paths(&td);
        fs::write(&p.system, "warning_threshold = 75\n").unwrap();
        fs::create_dir_all(p.user.parent().unwrap()).unwrap();
        fs::write(&p.user, "warning_threshold = [not toml").unwrap();

        assert_eq!(Config::load_from(&p).warning_threshold, 75);
    }

    #[test]
    fn save_then_load() {
        let td = TempDir::new().unwrap();
        let p = paths(&td);
        let cfg = Config {
            warning_threshold: 82,
            update_interval: 0.5,
            text_size: TextSize::Large,
            position: Some(Position { x: 40, y: -12 }),
            first_run: false,
            ..Config::default()
        };
        cfg.save_to(&p.user).unwrap();
        assert_eq!(Config::load_from(&p), cfg);
        assert_eq!(cfg.interval(), Duration::from_millis(500));
    }
}
