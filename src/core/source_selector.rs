// src/core/source_selector.rs

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::sensors::selection::is_plausible;
use super::sensors::{BackendSet, SensorError, SourceKind, TemperatureBackend};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorOptions {
    /// Consecutive read failures on a real source before re-selecting.
    pub failure_limit: u32,
    /// How often to retry the real sources while running on the fallback.
    /// `None` keeps the fallback for the rest of the session.
    pub reprobe_every: Option<Duration>,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        SelectorOptions {
            failure_limit: 3,
            reprobe_every: Some(Duration::from_secs(30)),
        }
    }
}

/// A change of active source, and the advisory to show if it was the first
/// time the session fell back to simulated readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: SourceKind,
    pub to: SourceKind,
    pub advisory: Option<String>,
}

pub fn advisory_message(elevated: bool) -> String {
    if elevated {
        "Using simulated temperature.\nNo hardware temperature sensor was found; \
         start LibreHardwareMonitor or OpenHardwareMonitor to enable real readings."
            .to_string()
    } else {
        "Using simulated temperature.\nHardware monitoring requires administrator privileges, \
         or a running LibreHardwareMonitor / OpenHardwareMonitor."
            .to_string()
    }
}

// Active source bookkeeping: an index into `real`, or the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    Unselected,
    Real(usize),
    Fallback,
}

pub struct SourceSelector {
    real: Vec<Box<dyn TemperatureBackend>>,
    fallback: Box<dyn TemperatureBackend>,
    active: Active,
    elevated: bool,
    advisory_sent: bool,
    consecutive_failures: u32,
    last_attempt: Option<Instant>,
    options: SelectorOptions,
}

impl SourceSelector {
    pub fn new(backends: BackendSet, elevated: bool, options: SelectorOptions) -> Self {
        let BackendSet { mut real, fallback } = backends;
        real.sort_by_key(|b| b.kind());
        SourceSelector {
            real,
            fallback,
            active: Active::Unselected,
            elevated,
            advisory_sent: false,
            consecutive_failures: 0,
            last_attempt: None,
            options,
        }
    }

    pub fn active_kind(&self) -> SourceKind {
        match self.active {
            Active::Unselected => SourceKind::None,
            Active::Real(i) => self.real[i].kind(),
            Active::Fallback => self.fallback.kind(),
        }
    }

    /// Initial selection. Tries every real backend in priority order and
    /// falls back to the simulated source when none of them delivers.
    pub fn select(&mut self, now: Instant) -> Transition {
        let from = self.active_kind();
        self.release_active();
        self.last_attempt = Some(now);

        match self.first_working(self.real.len()) {
            Some(index) => self.active = Active::Real(index),
            None => self.activate_fallback(),
        }
        let to = self.active_kind();
        info!(source = %to, "Selected temperature source");

        Transition {
            from,
            to,
            advisory: self.take_advisory(),
        }
    }

    /// Per-tick housekeeping: re-selects after repeated failures and, while
    /// on the fallback, periodically retries the real sources.
    pub fn maintain(&mut self, now: Instant) -> Option<Transition> {
        match self.active {
            Active::Unselected => Some(self.select(now)),
            Active::Real(_) if self.consecutive_failures >= self.options.failure_limit => {
                warn!(
                    source = %self.active_kind(),
                    failures = self.consecutive_failures,
                    "Temperature source keeps failing, re-probing"
                );
                Some(self.select(now))
            }
            Active::Real(_) => None,
            Active::Fallback => {
                let every = self.options.reprobe_every?;
                let due = self
                    .last_attempt
                    .is_none_or(|last| now.saturating_duration_since(last) >= every);
                if !due {
                    return None;
                }
                self.last_attempt = Some(now);
                let index = self.first_working(self.real.len())?;
                let from = self.active_kind();
                self.fallback.shutdown();
                self.active = Active::Real(index);
                info!(from = %from, to = %self.active_kind(), "Hardware temperature source became available");
                Some(Transition {
                    from,
                    to: self.active_kind(),
                    advisory: None,
                })
            }
        }
    }

    /// Reads the active source. Failures are counted but never retried here.
    pub fn read(&mut self) -> Result<f64, SensorError> {
        let result = match self.active {
            Active::Unselected => Err(SensorError::NotInitialized(SourceKind::None)),
            Active::Real(i) => {
                let backend = &mut self.real[i];
                let kind = backend.kind();
                backend.read().and_then(|v| {
                    if is_plausible(v) {
                        Ok(v)
                    } else {
                        Err(SensorError::NoValidReading(kind))
                    }
                })
            }
            Active::Fallback => self.fallback.read(),
        };
        match &result {
            Ok(_) => self.consecutive_failures = 0,
            Err(_) => self.consecutive_failures += 1,
        }
        result
    }

    pub fn shutdown(&mut self) {
        for backend in &mut self.real {
            backend.shutdown();
        }
        self.fallback.shutdown();
        self.active = Active::Unselected;
    }

    // Index of the first backend (among the first `limit`) whose probe and
    // first read both succeed. Every backend that did not make it is shut
    // down again.
    fn first_working(&mut self, limit: usize) -> Option<usize> {
        for (index, backend) in self.real.iter_mut().enumerate().take(limit) {
            let kind = backend.kind();
            let outcome = backend.probe().and_then(|()| backend.read()).and_then(|v| {
                if is_plausible(v) {
                    Ok(v)
                } else {
                    Err(SensorError::NoValidReading(kind))
                }
            });
            match outcome {
                Ok(celsius) => {
                    debug!(source = %kind, celsius, "Temperature source responded");
                    return Some(index);
                }
                Err(e) => {
                    debug!(source = %kind, error = %e, "Temperature source unusable");
                    backend.shutdown();
                }
            }
        }
        None
    }

    fn activate_fallback(&mut self) {
        // The simulated source cannot fail, but a custom fallback might.
        if let Err(e) = self.fallback.probe() {
            warn!(error = %e, "Fallback temperature source failed to start");
        }
        self.active = Active::Fallback;
    }

    fn release_active(&mut self) {
        match self.active {
            Active::Real(i) => self.real[i].shutdown(),
            Active::Fallback => self.fallback.shutdown(),
            Active::Unselected => {}
        }
        self.active = Active::Unselected;
        self.consecutive_failures = 0;
    }

    fn take_advisory(&mut self) -> Option<String> {
        if self.active != Active::Fallback || self.advisory_sent {
            return None;
        }
        self.advisory_sent = true;
        Some(advisory_message(self.elevated))
    }
}

impl Drop for SourceSelector {
    fn drop(&mut self) {
        self.shutdown();
    }
}
