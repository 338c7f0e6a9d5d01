// src/core/sensors/temperature_backend.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which telemetry source produced a reading.
///
/// Variants are declared in acquisition priority order, so the derived `Ord`
/// sorts the most preferred source first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    NativeLibrary,
    VendorWmiA,
    VendorWmiB,
    OsThermalZone,
    Simulated,
    #[default]
    None,
}

impl SourceKind {
    /// Short identifier shown next to the temperature.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::NativeLibrary => "native",
            SourceKind::VendorWmiA => "lhm-wmi",
            SourceKind::VendorWmiB => "ohm-wmi",
            SourceKind::OsThermalZone => "thermal-zone",
            SourceKind::Simulated => "simulated",
            SourceKind::None => "none",
        }
    }

    /// True for sources backed by actual hardware telemetry.
    pub fn is_real(self) -> bool {
        !matches!(self, SourceKind::Simulated | SourceKind::None)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("{0} is not supported on this platform")]
    Unsupported(SourceKind),

    #[error("{kind} unavailable: {reason}")]
    Unavailable { kind: SourceKind, reason: String },

    #[error("{0} was read before a successful probe")]
    NotInitialized(SourceKind),

    #[error("{0} reported no plausible CPU temperature")]
    NoValidReading(SourceKind),

    #[error("{kind} query failed: {reason}")]
    Query { kind: SourceKind, reason: String },
}

impl SensorError {
    pub fn unavailable(kind: SourceKind, reason: impl fmt::Display) -> Self {
        SensorError::Unavailable {
            kind,
            reason: reason.to_string(),
        }
    }

    pub fn query(kind: SourceKind, reason: impl fmt::Display) -> Self {
        SensorError::Query {
            kind,
            reason: reason.to_string(),
        }
    }
}

/// One tick's worth of output. `value == None` means the read failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureSample {
    pub value: Option<f64>,
    pub source: SourceKind,
    pub timestamp: DateTime<Utc>,
}

impl TemperatureSample {
    pub fn new(value: Option<f64>, source: SourceKind) -> Self {
        Self::at(value, source, Utc::now())
    }

    pub fn at(value: Option<f64>, source: SourceKind, timestamp: DateTime<Utc>) -> Self {
        TemperatureSample {
            value,
            source,
            timestamp,
        }
    }
}

// A single CPU temperature source.
//
// Backends are created and driven on the sampling worker only, so they are
// free to hold thread-affine handles (COM connections and the like).
pub trait TemperatureBackend {
    fn kind(&self) -> SourceKind;

    // Open whatever session the backend needs. Calling it again after a
    // success is a no-op.
    fn probe(&mut self) -> Result<(), SensorError>;

    // One reading in degrees Celsius.
    fn read(&mut self) -> Result<f64, SensorError>;

    // Release the session. Safe on a never-probed backend and safe to repeat.
    fn shutdown(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_follows_declaration() {
        let mut kinds = vec![
            SourceKind::Simulated,
            SourceKind::OsThermalZone,
            SourceKind::NativeLibrary,
            SourceKind::VendorWmiB,
            SourceKind::VendorWmiA,
        ];
        kinds.sort();
        assert_eq!(
            kinds,
            vec![
                SourceKind::NativeLibrary,
                SourceKind::VendorWmiA,
                SourceKind::VendorWmiB,
                SourceKind::OsThermalZone,
                SourceKind::Simulated,
            ]
        );
    }

    #[test]
    fn only_hardware_sources_are_real() {
        assert!(SourceKind::OsThermalZone.is_real());
        assert!(!SourceKind::Simulated.is_real());
        assert!(!SourceKind::None.is_real());
        assert_eq!(SourceKind::default(), SourceKind::None);
    }

    #[test]
    fn error_messages_name_the_source() {
        let err = SensorError::unavailable(SourceKind::VendorWmiA, "namespace missing");
        assert_eq!(err.to_string(), "lhm-wmi unavailable: namespace missing");
    }
}
