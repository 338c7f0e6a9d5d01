// src/core/sensors/wmi_backend.rs

use serde::Deserialize;
#[cfg(windows)]
use tracing::debug;

use super::selection::{CpuCandidates, looks_like_cpu};
use super::temperature_backend::{SensorError, SourceKind, TemperatureBackend};

/// Third-party monitoring daemons that publish a `Sensor` class over WMI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareMonitorVendor {
    LibreHardwareMonitor,
    OpenHardwareMonitor,
}

impl HardwareMonitorVendor {
    pub fn namespace(self) -> &'static str {
        match self {
            HardwareMonitorVendor::LibreHardwareMonitor => "root\\LibreHardwareMonitor",
            HardwareMonitorVendor::OpenHardwareMonitor => "root\\OpenHardwareMonitor",
        }
    }

    pub fn kind(self) -> SourceKind {
        match self {
            HardwareMonitorVendor::LibreHardwareMonitor => SourceKind::VendorWmiA,
            HardwareMonitorVendor::OpenHardwareMonitor => SourceKind::VendorWmiB,
        }
    }
}

// One row of the daemon's `Sensor` class. Every column is optional because
// the daemons leave them null while hardware is still being enumerated.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct WmiSensorRow {
    pub name: Option<String>,
    pub sensor_type: Option<String>,
    pub value: Option<f32>,
    pub parent: Option<String>,
}

pub fn cpu_temperature_from_rows(rows: &[WmiSensorRow]) -> Option<f64> {
    let mut candidates = CpuCandidates::new();
    for row in rows {
        if row.sensor_type.as_deref() != Some("Temperature") {
            continue;
        }
        let Some(value) = row.value else { continue };
        let name = row.name.as_deref().unwrap_or("");
        let parent = row.parent.as_deref().unwrap_or("");
        if looks_like_cpu(name, parent) {
            candidates.offer(name, f64::from(value));
        }
    }
    candidates.resolve()
}

pub struct WmiSensorBackend {
    vendor: HardwareMonitorVendor,
    #[cfg(windows)]
    connection: Option<wmi::WMIConnection>,
}

impl WmiSensorBackend {
    pub fn new(vendor: HardwareMonitorVendor) -> Self {
        WmiSensorBackend {
            vendor,
            #[cfg(windows)]
            connection: None,
        }
    }
}

#[cfg(windows)]
impl TemperatureBackend for WmiSensorBackend {
    fn kind(&self) -> SourceKind {
        self.vendor.kind()
    }

    fn probe(&mut self) -> Result<(), SensorError> {
        if self.connection.is_some() {
            return Ok(());
        }
        let kind = self.kind();
        let namespace = self.vendor.namespace();
        let connection = wmi::WMIConnection::with_namespace_path(namespace)
            .map_err(|e| SensorError::unavailable(kind, e))?;

        // The namespace lingers after the daemon exits; an empty Sensor
        // class means nobody is publishing.
        let rows: Vec<WmiSensorRow> = connection
            .raw_query("SELECT Name, SensorType, Value, Parent FROM Sensor")
            .map_err(|e| SensorError::unavailable(kind, e))?;
        if rows.is_empty() {
            return Err(SensorError::unavailable(
                kind,
                format!("{namespace} exposes no sensors"),
            ));
        }
        debug!(namespace, sensors = rows.len(), "Bound hardware monitor namespace");
        self.connection = Some(connection);
        Ok(())
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        let kind = self.kind();
        let connection = self
            .connection
            .as_ref()
            .ok_or(SensorError::NotInitialized(kind))?;
        let rows: Vec<WmiSensorRow> = connection
            .raw_query(
                "SELECT Name, SensorType, Value, Parent FROM Sensor WHERE SensorType = 'Temperature'",
            )
            .map_err(|e| SensorError::query(kind, e))?;
        cpu_temperature_from_rows(&rows).ok_or(SensorError::NoValidReading(kind))
    }

    fn shutdown(&mut self) {
        self.connection = None;
    }
}

#[cfg(not(windows))]
impl TemperatureBackend for WmiSensorBackend {
    fn kind(&self) -> SourceKind {
        self.vendor.kind()
    }

    fn probe(&mut self) -> Result<(), SensorError> {
        Err(SensorError::Unsupported(self.kind()))
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        Err(SensorError::NotInitialized(self.kind()))
    }

    fn shutdown(&mut self) {}
}
