// src/core/sensors/thermal_zone_backend.rs
//! ACPI thermal zones as exposed by the OS itself.
//!
//! On Windows this is `MSAcpi_ThermalZoneTemperature` (tenths of a Kelvin,
//! usually admin-only). Elsewhere the sysfs `thermal_zone*` directories are
//! used, reported in millidegrees Celsius.

use super::temperature_backend::{SensorError, SourceKind, TemperatureBackend};

/// Converts a raw ACPI reading in tenths of a Kelvin to Celsius.
pub fn decikelvin_to_celsius(raw: u32) -> f64 {
    f64::from(raw) / 10.0 - 273.15
}

// Zones report all sorts of junk (e.g. 2732 = 0°C when unpopulated), so only
// the open interval (0, 150) is accepted.
pub fn accept_zone_celsius(celsius: f64) -> Option<f64> {
    if celsius.is_finite() && celsius > 0.0 && celsius < 150.0 {
        Some(celsius)
    } else {
        None
    }
}

#[cfg(windows)]
mod imp {
    use super::*;
    use serde::Deserialize;
    use tracing::debug;

    #[derive(Deserialize, Debug)]
    #[serde(rename = "MSAcpi_ThermalZoneTemperature")]
    #[serde(rename_all = "PascalCase")]
    struct ThermalZoneRow {
        current_temperature: u32,
    }

    pub struct ThermalZoneBackend {
        connection: Option<wmi::WMIConnection>,
    }

    impl ThermalZoneBackend {
        pub fn new() -> Self {
            ThermalZoneBackend { connection: None }
        }

        fn query(connection: &wmi::WMIConnection) -> Result<f64, SensorError> {
            let kind = SourceKind::OsThermalZone;
            let zones: Vec<ThermalZoneRow> =
                connection.query().map_err(|e| SensorError::query(kind, e))?;
            zones
                .iter()
                .find(|z| z.current_temperature > 0)
                .and_then(|z| accept_zone_celsius(decikelvin_to_celsius(z.current_temperature)))
                .ok_or(SensorError::NoValidReading(kind))
        }
    }

    impl TemperatureBackend for ThermalZoneBackend {
        fn kind(&self) -> SourceKind {
            SourceKind::OsThermalZone
        }

        fn probe(&mut self) -> Result<(), SensorError> {
            if self.connection.is_some() {
                return Ok(());
            }
            let kind = self.kind();
            let connection = wmi::WMIConnection::with_namespace_path("root\\WMI")
                .map_err(|e| SensorError::unavailable(kind, e))?;
            // Access denied shows up here rather than at connect time.
            Self::query(&connection).map_err(|e| SensorError::unavailable(kind, e))?;
            debug!("Bound ACPI thermal zone namespace");
            self.connection = Some(connection);
            Ok(())
        }

        fn read(&mut self) -> Result<f64, SensorError> {
            let connection = self
                .connection
                .as_ref()
                .ok_or(SensorError::NotInitialized(self.kind()))?;
            Self::query(connection)
        }

        fn shutdown(&mut self) {
            self.connection = None;
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tracing::debug;

    // Zone types that name the processor package, most specific first.
    const CPU_ZONE_TYPES: [&str; 3] = ["x86_pkg_temp", "cpu", "soc"];

    fn thermal_base() -> PathBuf {
        std::env::var_os("SYS_THERMAL_BASE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/sys/class/thermal"))
    }

    fn discover(base: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
        let mut zones = Vec::new();
        for entry in fs::read_dir(base)? {
            let dir = entry?.path();
            let name = dir.file_name().and_then(|s| s.to_str()).unwrap_or("");
            if !name.starts_with("thermal_zone") {
                continue;
            }
            let zone_type = fs::read_to_string(dir.join("type"))
                .map(|s| s.trim_end().to_owned())
                .unwrap_or_else(|_| name.to_owned());
            let temp_path = dir.join("temp");
            if temp_path.exists() {
                zones.push((zone_type, temp_path));
            }
        }
        zones.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(zones)
    }

    fn rank(zone_type: &str) -> usize {
        let lower = zone_type.to_lowercase();
        CPU_ZONE_TYPES
            .iter()
            .position(|t| lower.contains(t))
            .unwrap_or(CPU_ZONE_TYPES.len())
    }

    pub struct ThermalZoneBackend {
        base: PathBuf,
        zones: Vec<(String, PathBuf)>,
    }

    impl ThermalZoneBackend {
        pub fn new() -> Self {
            Self::with_base(thermal_base())
        }

        pub fn with_base(base: impl Into<PathBuf>) -> Self {
            ThermalZoneBackend {
                base: base.into(),
                zones: Vec::new(),
            }
        }

        fn read_zone(path: &Path) -> Option<f64> {
            let raw = fs::read_to_string(path).ok()?;
            let milli: f64 = raw.trim_end().parse().ok()?;
            accept_zone_celsius(milli / 1_000.0)
        }
    }

    impl TemperatureBackend for ThermalZoneBackend {
        fn kind(&self) -> SourceKind {
            SourceKind::OsThermalZone
        }

        fn probe(&mut self) -> Result<(), SensorError> {
            if !self.zones.is_empty() {
                return Ok(());
            }
            let kind = self.kind();
            let mut zones = discover(&self.base).map_err(|e| {
                SensorError::unavailable(kind, format!("{}: {e}", self.base.display()))
            })?;
            if zones.is_empty() {
                return Err(SensorError::unavailable(
                    kind,
                    format!("no thermal zones under {}", self.base.display()),
                ));
            }
            zones.sort_by_key(|(zone_type, _)| rank(zone_type));
            debug!(zones = ?zones, "Discovered thermal zones");
            self.zones = zones;
            Ok(())
        }

        fn read(&mut self) -> Result<f64, SensorError> {
            let kind = self.kind();
            if self.zones.is_empty() {
                return Err(SensorError::NotInitialized(kind));
            }
            self.zones
                .iter()
                .find_map(|(_, path)| Self::read_zone(path))
                .ok_or(SensorError::NoValidReading(kind))
        }

        fn shutdown(&mut self) {
            self.zones.clear();
        }
    }
}

pub use imp::ThermalZoneBackend;

impl Default for ThermalZoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decikelvin_conversion() {
        assert!((decikelvin_to_celsius(3232) - 50.05).abs() < 1e-9);
        assert!((decikelvin_to_celsius(2732) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn zone_acceptance_is_open_interval() {
        assert_eq!(accept_zone_celsius(0.0), None);
        assert_eq!(accept_zone_celsius(150.0), None);
        assert_eq!(accept_zone_celsius(-10.0), None);
        assert_eq!(accept_zone_celsius(42.5), Some(42.5));
    }

    #[cfg(not(windows))]
    mod sysfs {
        use super::super::*;
        use std::fs;
        use tempfile::TempDir;

        fn make_zone(base: &TempDir, zone: &str, sensor_type: &str, temp: i64) {
            let dir = base.path().join(zone);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("type"), sensor_type).unwrap();
            fs::write(dir.join("temp"), format!("{temp}")).unwrap();
        }

        #[test]
        fn prefers_package_zone() {
            let td = TempDir::new().unwrap();
            make_zone(&td, "thermal_zone0", "acpitz", 30000);
            make_zone(&td, "thermal_zone1", "x86_pkg_temp", 42000);

            let mut backend = ThermalZoneBackend::with_base(td.path());
            backend.probe().unwrap();
            assert!((backend.read().unwrap() - 42.0).abs() < 1e-6);
        }

        #[test]
        fn skips_implausible_zone() {
            let td = TempDir::new().unwrap();
            make_zone(&td, "thermal_zone0", "x86_pkg_temp", 0);
            make_zone(&td, "thermal_zone1", "acpitz", 35500);

            let mut backend = ThermalZoneBackend::with_base(td.path());
            backend.probe().unwrap();
            assert!((backend.read().unwrap() - 35.5).abs() < 1e-6);
        }

        #[test]
        fn empty_directory_is_unavailable() {
            let td = TempDir::new().unwrap();
            fs::create_dir_all(td.path().join("cooling_device0")).unwrap();

            let mut backend = ThermalZoneBackend::with_base(td.path());
            assert!(matches!(
                backend.probe(),
                Err(SensorError::Unavailable { .. })
            ));
        }

        #[test]
        fn shutdown_releases_zones() {
            let td = TempDir::new().unwrap();
            make_zone(&td, "thermal_zone0", "acpitz", 30000);

            let mut backend = ThermalZoneBackend::with_base(td.path());
            backend.probe().unwrap();
            backend.shutdown();
            backend.shutdown();
            assert!(matches!(
                backend.read(),
                Err(SensorError::NotInitialized(SourceKind::OsThermalZone))
            ));
        }
    }
}
