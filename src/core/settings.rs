// src/core/settings.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::Duration;

use super::config::{Config, ConfigError, clamp_threshold, validate_interval};

// Live settings shared between the control side and the sampling worker.
// Plain atomics: the worker may see a value one cycle late, which is fine.
#[derive(Debug, Clone)]
pub struct Settings {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    interval_ms: AtomicU64,
    threshold: AtomicI32,
    // bumped on every set_threshold, so the worker notices repeats too
    threshold_epoch: AtomicU64,
}

impl Settings {
    pub fn new(interval_secs: f64, threshold: i32) -> Result<Self, ConfigError> {
        let interval = validate_interval(interval_secs)?;
        Ok(Settings {
            inner: Arc::new(Inner {
                interval_ms: AtomicU64::new(interval.as_millis() as u64),
                threshold: AtomicI32::new(clamp_threshold(threshold)),
                threshold_epoch: AtomicU64::new(0),
            }),
        })
    }

    pub fn from_config(config: &Config) -> Self {
        Settings {
            inner: Arc::new(Inner {
                interval_ms: AtomicU64::new(config.interval().as_millis() as u64),
                threshold: AtomicI32::new(clamp_threshold(config.warning_threshold)),
                threshold_epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.inner.interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_interval(&self, secs: f64) -> Result<(), ConfigError> {
        let interval = validate_interval(secs)?;
        self.inner
            .interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
        Ok(())
    }

    pub fn threshold(&self) -> i32 {
        self.inner.threshold.load(Ordering::Acquire)
    }

    // Returns the threshold actually applied after clamping.
    pub fn set_threshold(&self, celsius: i32) -> i32 {
        let applied = clamp_threshold(celsius);
        self.inner.threshold.store(applied, Ordering::Release);
        self.inner.threshold_epoch.fetch_add(1, Ordering::AcqRel);
        applied
    }

    pub fn threshold_epoch(&self) -> u64 {
        self.inner.threshold_epoch.load(Ordering::Acquire)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
