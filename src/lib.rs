// src/lib.rs
//! CPU temperature acquisition and sustained-heat warnings for a desktop
//! overlay.

pub mod core;

pub use crate::core::config::Config;
pub use crate::core::monitor::{Monitor, MonitorError, MonitorOptions};
pub use crate::core::publisher::{MonitorEvent, Observer, SampleUpdate};
pub use crate::core::sampling_loop::LoopState;
pub use crate::core::sensors::{SourceKind, TemperatureSample};
