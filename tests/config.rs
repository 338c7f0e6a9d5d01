// tests/config.rs

use std::fs;

use cputemp_widget::Config;
use cputemp_widget::core::config::TextSize;
use cputemp_widget::core::config_loader::ConfigPaths;
use cputemp_widget::core::settings::Settings;
use tempfile::TempDir;

#[test]
fn packaged_default_parses_to_defaults() {
    let td = TempDir::new().unwrap();
    let paths = ConfigPaths {
        system: std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("config")
            .join("default.toml"),
        user: td.path().join("config.toml"),
    };
    assert_eq!(Config::load_from(&paths), Config::default());
}

#[test]
fn saved_user_file_drives_settings() {
    let td = TempDir::new().unwrap();
    let paths = ConfigPaths {
        system: td.path().join("default.toml"),
        user: td.path().join("nested").join("config.toml"),
    };
    let cfg = Config {
        warning_threshold: 88,
        update_interval: 2.0,
        text_size: TextSize::Small,
        ..Config::default()
    };
    cfg.save_to(&paths.user).unwrap();

    let loaded = Config::load_from(&paths);
    assert_eq!(loaded, cfg);
    let settings = Settings::from_config(&loaded);
    assert_eq!(settings.threshold(), 88);
    assert_eq!(settings.interval().as_secs_f64(), 2.0);
}

#[test]
fn garbage_everywhere_still_loads() {
    let td = TempDir::new().unwrap();
    let paths = ConfigPaths {
        system: td.path().join("default.toml"),
        user: td.path().join("config.toml"),
    };
    fs::write(&paths.system, "\u{0}\u{1}not toml at all").unwrap();
    fs::write(&paths.user, "update_interval = \"fast\"").unwrap();
    assert_eq!(Config::load_from(&paths), Config::default());
}
