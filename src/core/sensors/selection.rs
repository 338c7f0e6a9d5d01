// src/core/sensors/selection.rs
//! Shared rules for turning a bag of named sensor readings into one CPU
//! temperature: which sensors count as CPU sensors, which raw values are
//! plausible, and which sensor wins.

/// Readings at or below this are discarded.
pub const MIN_PLAUSIBLE_CELSIUS: f64 = 0.0;
/// Readings above this are discarded.
pub const MAX_PLAUSIBLE_CELSIUS: f64 = 150.0;

const CPU_TOKENS: [&str; 5] = ["cpu", "intel", "amd", "processor", "core"];

// Kernel drivers / chip labels that only ever report processor temperatures.
const CPU_DRIVERS: [&str; 6] = [
    "coretemp",
    "k10temp",
    "zenpower",
    "cpu_thermal",
    "tctl",
    "tdie",
];

// Drivers whose labels trip the generic tokens ("amdgpu" contains "amd")
// but never report the processor.
const NON_CPU_DRIVERS: [&str; 6] = ["amdgpu", "radeon", "nouveau", "nvidia", "i915", "nvme"];

pub fn is_plausible(celsius: f64) -> bool {
    celsius.is_finite() && celsius > MIN_PLAUSIBLE_CELSIUS && celsius <= MAX_PLAUSIBLE_CELSIUS
}

/// Case-insensitive token match on a sensor name and its parent hardware.
pub fn looks_like_cpu(name: &str, parent: &str) -> bool {
    let name = name.to_lowercase();
    let parent = parent.to_lowercase();
    // "GPU Core" would otherwise pass on the core token
    if name.contains("gpu") || parent.contains("gpu") {
        return false;
    }
    CPU_TOKENS
        .iter()
        .any(|token| name.contains(token) || parent.contains(token))
}

/// Like [`looks_like_cpu`], but also recognises driver-prefixed labels such
/// as `k10temp Tctl` that carry no generic token.
pub fn is_cpu_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    if NON_CPU_DRIVERS.iter().any(|d| lower.contains(d)) {
        return false;
    }
    CPU_DRIVERS.iter().any(|d| lower.contains(d)) || looks_like_cpu(&lower, "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorRole {
    Package,
    Average,
    Max,
    Core,
    Other,
    // Headroom readings such as "Distance to TjMax", not temperatures
    Ignored,
}

impl SensorRole {
    pub fn classify(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("distance") {
            SensorRole::Ignored
        } else if name.contains("package") || name.contains("tctl") || name.contains("tdie") {
            SensorRole::Package
        } else if name.contains("average") {
            SensorRole::Average
        } else if name.contains("max") {
            SensorRole::Max
        } else if name.contains("core") {
            SensorRole::Core
        } else {
            SensorRole::Other
        }
    }
}

/// Collects plausible CPU readings and resolves them by preference:
/// package, then average, then max, then mean of the cores. Unclassified
/// CPU sensors are averaged only when nothing else is available.
#[derive(Debug, Default, Clone)]
pub struct CpuCandidates {
    package: Option<f64>,
    average: Option<f64>,
    max: Option<f64>,
    cores: Vec<f64>,
    other: Vec<f64>,
}

impl CpuCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    // Implausible values are dropped here, before they can shadow anything.
    pub fn offer(&mut self, name: &str, celsius: f64) {
        if !is_plausible(celsius) {
            return;
        }
        match SensorRole::classify(name) {
            SensorRole::Package => {
                self.package.get_or_insert(celsius);
            }
            SensorRole::Average => {
                self.average.get_or_insert(celsius);
            }
            SensorRole::Max => {
                self.max.get_or_insert(celsius);
            }
            SensorRole::Core => self.cores.push(celsius),
            SensorRole::Other => self.other.push(celsius),
            SensorRole::Ignored => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.package.is_none()
            && self.average.is_none()
            && self.max.is_none()
            && self.cores.is_empty()
            && self.other.is_empty()
    }

    pub fn resolve(&self) -> Option<f64> {
        self.package
            .or(self.average)
            .or(self.max)
            .or_else(|| mean(&self.cores))
            .or_else(|| mean(&self.other))
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
