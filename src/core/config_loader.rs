// src/core/config_loader.rs

use directories::BaseDirs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "cputemp-widget";

/// Where configuration is read from: a packaged default and a per-user file
/// that overrides it and receives every save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub system: PathBuf,
    pub user: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Self {
        ConfigPaths {
            system: system_default(),
            user: user_config(),
        }
    }
}

fn system_default() -> PathBuf {
    // 1. Next to the binary, as installed
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    let installed = exe_dir.join("default.toml");
    if installed.exists() {
        return installed;
    }

    // 2. Development fallback: the crate's own config/default.toml
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    let fallback = manifest.join("config").join("default.toml");
    if fallback.exists() { fallback } else { installed }
}

fn user_config() -> PathBuf {
    // CPUTEMP_CONFIG wins so a second instance can run against a scratch file
    if let Some(path) = std::env::var_os("CPUTEMP_CONFIG") {
        return PathBuf::from(path);
    }
    // %APPDATA%\cputemp-widget\config.toml on Windows, XDG elsewhere
    BaseDirs::new()
        .map(|d| d.config_dir().join(APP_DIR).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config").join("config.toml"))
}
