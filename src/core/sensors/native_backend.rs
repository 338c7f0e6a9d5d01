// src/core/sensors/native_backend.rs

use sysinfo::Components;
use tracing::debug;

use super::selection::{CpuCandidates, is_cpu_label};
use super::temperature_backend::{SensorError, SourceKind, TemperatureBackend};

// Reads CPU temperatures in-process through sysinfo's component list.
// Unsupported on Windows, where sysinfo only lists the ACPI "Computer" zone
// and the thermal zone backend covers that already.
pub struct NativeLibraryBackend {
    components: Option<Components>,
}

impl NativeLibraryBackend {
    pub fn new() -> Self {
        NativeLibraryBackend { components: None }
    }
}

impl Default for NativeLibraryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds `(label, temperature)` pairs into candidates, skipping non-CPU
/// components and components that did not report a value.
pub fn cpu_candidates<'a, I>(readings: I) -> CpuCandidates
where
    I: IntoIterator<Item = (&'a str, Option<f32>)>,
{
    let mut candidates = CpuCandidates::new();
    for (label, temp) in readings {
        if !is_cpu_label(label) {
            continue;
        }
        if let Some(t) = temp {
            candidates.offer(label, f64::from(t));
        }
    }
    candidates
}

impl TemperatureBackend for NativeLibraryBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::NativeLibrary
    }

    fn probe(&mut self) -> Result<(), SensorError> {
        if cfg!(windows) {
            return Err(SensorError::Unsupported(self.kind()));
        }
        if self.components.is_some() {
            return Ok(());
        }
        let components = Components::new_with_refreshed_list();
        let cpu_sensors = components
            .iter()
            .filter(|c| is_cpu_label(c.label()))
            .count();
        debug!(
            total = components.iter().count(),
            cpu_sensors, "Enumerated hardware components"
        );
        if cpu_sensors == 0 {
            return Err(SensorError::unavailable(
                self.kind(),
                "no CPU temperature components",
            ));
        }
        self.components = Some(components);
        Ok(())
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        let kind = self.kind();
        let components = self
            .components
            .as_mut()
            .ok_or(SensorError::NotInitialized(kind))?;
        components.refresh(true);

        cpu_candidates(components.iter().map(|c| (c.label(), c.temperature())))
            .resolve()
            .ok_or(SensorError::NoValidReading(kind))
    }

    fn shutdown(&mut self) {
        self.components = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_style_labels() {
        let readings = [
            ("coretemp Package id 0", Some(51.0)),
            ("coretemp Core 0", Some(48.0)),
            ("coretemp Core 1", Some(49.0)),
            ("nvme Composite", Some(38.0)),
        ];
        assert_eq!(cpu_candidates(readings).resolve(), Some(51.0));
    }

    #[test]
    fn amd_tctl_is_package() {
        let readings = [("k10temp Tccd1", Some(40.0)), ("k10temp Tctl", Some(63.5))];
        assert_eq!(cpu_candidates(readings).resolve(), Some(63.5));
    }

    #[test]
    fn missing_values_are_skipped() {
        let readings = [("coretemp Package id 0", None), ("coretemp Core 0", Some(47.0))];
        assert_eq!(cpu_candidates(readings).resolve(), Some(47.0));
    }

    #[test]
    fn no_cpu_components() {
        let readings = [("acpitz temp1", Some(27.8)), ("nvme Composite", Some(38.0))];
        assert_eq!(cpu_candidates(readings).resolve(), None);
    }

    #[test]
    fn gpu_temperature_is_not_reported_as_cpu() {
        let readings = [("amdgpu edge", Some(81.0)), ("nvme Composite", Some(38.0))];
        assert_eq!(cpu_candidates(readings).resolve(), None);

        let readings = [("amdgpu edge", Some(81.0)), ("k10temp Tctl", Some(55.0))];
        assert_eq!(cpu_candidates(readings).resolve(), Some(55.0));
    }

    #[cfg(windows)]
    #[test]
    fn unsupported_on_windows() {
        let mut backend = NativeLibraryBackend::new();
        assert!(matches!(
            backend.probe(),
            Err(SensorError::Unsupported(SourceKind::NativeLibrary))
        ));
    }

    #[test]
    fn read_before_probe_fails() {
        let mut backend = NativeLibraryBackend::new();
        assert!(matches!(
            backend.read(),
            Err(SensorError::NotInitialized(SourceKind::NativeLibrary))
        ));
        backend.shutdown();
        backend.shutdown();
    }
}
