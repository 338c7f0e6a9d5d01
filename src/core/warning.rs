// src/core/warning.rs
//! Hysteresis for the "sustained high temperature" alert.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::sensors::TemperatureSample;

/// Time a reading must stay at or above the threshold before it counts as
/// sustained.
pub const DEFAULT_DWELL_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WarningFlags {
    pub is_warning: bool,
    pub show_hot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WarningState {
    threshold: i32,
    dwell_secs: f64,
    above_since: Option<DateTime<Utc>>,
}

impl WarningState {
    pub fn new(threshold: i32) -> Self {
        Self::with_dwell(threshold, DEFAULT_DWELL_SECS)
    }

    pub fn with_dwell(threshold: i32, dwell_secs: f64) -> Self {
        WarningState {
            threshold,
            dwell_secs,
            above_since: None,
        }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    pub fn above_since(&self) -> Option<DateTime<Utc>> {
        self.above_since
    }

    // Any threshold change restarts the streak, even a no-op one.
    pub fn set_threshold(&mut self, threshold: i32) {
        self.threshold = threshold;
        self.above_since = None;
    }

    pub fn update(&mut self, sample: &TemperatureSample) -> WarningFlags {
        let is_warning = sample
            .value
            .is_some_and(|celsius| celsius >= f64::from(self.threshold));

        if !is_warning {
            // failed reads land here too and break the streak
            self.above_since = None;
            return WarningFlags::default();
        }

        let show_hot = match self.above_since {
            None => {
                self.above_since = Some(sample.timestamp);
                false
            }
            Some(since) => {
                let elapsed = sample.timestamp.signed_duration_since(since);
                elapsed.num_milliseconds() as f64 / 1_000.0 >= self.dwell_secs
            }
        };

        WarningFlags {
            is_warning,
            show_hot,
        }
    }
}
