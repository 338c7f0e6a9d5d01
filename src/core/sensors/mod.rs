// src/core/sensors/mod.rs
//! CPU temperature sources, one backend per telemetry channel.

pub mod native_backend;
pub mod selection;
pub mod simulated_backend;
pub mod temperature_backend;
pub mod thermal_zone_backend;
pub mod wmi_backend;

pub use native_backend::NativeLibraryBackend;
pub use simulated_backend::SimulatedBackend;
pub use temperature_backend::{SensorError, SourceKind, TemperatureBackend, TemperatureSample};
pub use thermal_zone_backend::ThermalZoneBackend;
pub use wmi_backend::{HardwareMonitorVendor, WmiSensorBackend};

// The real backends of a session plus the source used when none of them work.
pub struct BackendSet {
    pub real: Vec<Box<dyn TemperatureBackend>>,
    pub fallback: Box<dyn TemperatureBackend>,
}

impl BackendSet {
    pub fn new(real: Vec<Box<dyn TemperatureBackend>>) -> Self {
        Self::with_fallback(real, Box::new(SimulatedBackend::new()))
    }

    pub fn with_fallback(
        real: Vec<Box<dyn TemperatureBackend>>,
        fallback: Box<dyn TemperatureBackend>,
    ) -> Self {
        BackendSet { real, fallback }
    }

    /// Every backend this platform knows about, in priority order.
    pub fn platform_default() -> Self {
        Self::new(vec![
            Box::new(NativeLibraryBackend::new()),
            Box::new(WmiSensorBackend::new(
                HardwareMonitorVendor::LibreHardwareMonitor,
            )),
            Box::new(WmiSensorBackend::new(
                HardwareMonitorVendor::OpenHardwareMonitor,
            )),
            Box::new(ThermalZoneBackend::new()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_default_is_in_priority_order() {
        let set = BackendSet::platform_default();
        let kinds: Vec<_> = set.real.iter().map(|b| b.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                SourceKind::NativeLibrary,
                SourceKind::VendorWmiA,
                SourceKind::VendorWmiB,
                SourceKind::OsThermalZone,
            ]
        );
        assert_eq!(set.fallback.kind(), SourceKind::Simulated);
    }
}
