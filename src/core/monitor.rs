// src/core/monitor.rs
//! Control surface for one monitoring session.
//!
//! A [`Monitor`] owns the sampling worker thread. Everything the worker
//! produces reaches the caller through channels, so none of these methods
//! ever waits on a sensor.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use super::config::{Config, ConfigError};
use super::privilege;
use super::publisher::{MonitorEvent, Observer, Publisher, SampleUpdate, Subscriptions, spawn_observer};
use super::sampling_loop::{LoopState, SamplingLoop};
use super::sensors::BackendSet;
use super::settings::Settings;
use super::source_selector::{SelectorOptions, SourceSelector};

type BackendFactory = Box<dyn FnOnce() -> BackendSet + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorOptions {
    pub selector: SelectorOptions,
    /// Events buffered per subscriber before it starts lagging.
    pub event_capacity: usize,
    /// Upper bound on how long `stop` waits for the worker.
    pub join_timeout: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions {
            selector: SelectorOptions::default(),
            event_capacity: 64,
            join_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("the monitor has already been started")]
    AlreadyStarted,

    #[error("could not spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

struct Worker {
    cancel: watch::Sender<bool>,
    // disconnects when the worker closure returns or unwinds
    done: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

pub struct Monitor {
    settings: Settings,
    options: MonitorOptions,
    // both are handed to the worker on start
    factory: Option<BackendFactory>,
    publisher: Option<Publisher>,
    subs: Subscriptions,
    worker: Option<Worker>,
}

impl Monitor {
    /// A monitor over every backend this platform supports.
    pub fn new(config: &Config) -> Self {
        Self::with_backends(
            Settings::from_config(config),
            MonitorOptions::default(),
            BackendSet::platform_default,
        )
    }

    /// `factory` runs on the worker thread, so the backends it builds never
    /// have to be `Send`.
    pub fn with_backends<F>(settings: Settings, options: MonitorOptions, factory: F) -> Self
    where
        F: FnOnce() -> BackendSet + Send + 'static,
    {
        let (publisher, subs) = Publisher::new(options.event_capacity);
        Monitor {
            settings,
            options,
            factory: Some(Box::new(factory)),
            publisher: Some(publisher),
            subs,
            worker: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.subs.subscribe()
    }

    pub fn latest(&self) -> Option<SampleUpdate> {
        self.subs.latest.borrow().clone()
    }

    pub fn state(&self) -> LoopState {
        *self.subs.state.borrow()
    }

    /// A receiver that wakes on every state change.
    pub fn watch_state(&self) -> watch::Receiver<LoopState> {
        self.subs.state.clone()
    }

    /// The simulated-source advisory, if this session issued one.
    pub fn advisory(&self) -> Option<String> {
        self.subs.advisory.borrow().clone()
    }

    /// Drives `observer` from its own relay thread for as long as the
    /// monitor lives. Attach before `start` to see the advisory.
    pub fn attach<O: Observer>(&self, observer: O) -> Result<(), MonitorError> {
        spawn_observer(self.subscribe(), observer)?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    pub fn start(&mut self) -> Result<(), MonitorError> {
        let (Some(factory), Some(publisher)) = (self.factory.take(), self.publisher.take()) else {
            return Err(MonitorError::AlreadyStarted);
        };

        let settings = self.settings.clone();
        let selector_options = self.options.selector;
        let elevated = privilege::is_elevated();
        let (cancel, cancel_rx) = watch::channel(false);
        let (done_tx, done) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("cputemp-sampler".into())
            .spawn(move || {
                let _done = done_tx;
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(error = %e, "Could not build sampler runtime");
                        publisher.set_state(LoopState::Stopped);
                        return;
                    }
                };
                let selector = SourceSelector::new(factory(), elevated, selector_options);
                runtime.block_on(SamplingLoop::new(selector, settings, publisher).run(cancel_rx));
            })?;

        info!(elevated, interval = ?self.settings.interval(), "Monitor started");
        self.worker = Some(Worker {
            cancel,
            done,
            handle,
        });
        Ok(())
    }

    /// Takes effect from the next sleep. Only 0.5, 1.0 and 2.0 are accepted.
    pub fn set_interval(&self, secs: f64) -> Result<(), ConfigError> {
        self.settings.set_interval(secs)?;
        info!(secs, "Update interval changed");
        Ok(())
    }

    /// Clamped to 40..=100; the applied value is returned. Always restarts
    /// the sustained-heat timer.
    pub fn set_threshold(&self, celsius: i32) -> i32 {
        let applied = self.settings.set_threshold(celsius);
        info!(requested = celsius, applied, "Warning threshold changed");
        applied
    }

    /// Cancels the worker and waits for it, at most `join_timeout`. Returns
    /// false if the worker had to be left behind.
    pub fn stop(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return true;
        };
        // Err means the worker already dropped its receiver
        let _ = worker.cancel.send(true);

        let timeout = self.options.join_timeout;
        if let Err(RecvTimeoutError::Timeout) = worker.done.recv_timeout(timeout) {
            warn!(?timeout, "Sampling worker did not stop in time, detaching");
            return false;
        }
        if worker.handle.join().is_err() {
            error!("Sampling worker panicked");
        }
        true
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sensors::{SensorError, SourceKind, TemperatureBackend};

    struct Fixed(f64);

    impl TemperatureBackend for Fixed {
        fn kind(&self) -> SourceKind {
            SourceKind::OsThermalZone
        }
        fn probe(&mut self) -> Result<(), SensorError> {
            Ok(())
        }
        fn read(&mut self) -> Result<f64, SensorError> {
            Ok(self.0)
        }
        fn shutdown(&mut self) {}
    }

    fn monitor() -> Monitor {
        Monitor::with_backends(Settings::default(), MonitorOptions::default(), || {
            BackendSet::new(vec![Box::new(Fixed(47.5))])
        })
    }

    #[test]
    fn idle_until_started() {
        let m = monitor();
        assert_eq!(m.state(), LoopState::Idle);
        assert!(m.latest().is_none());
        assert!(!m.is_running());
    }

    #[test]
    fn second_start_is_rejected() {
        let mut m = monitor();
        m.start().unwrap();
        assert!(matches!(m.start(), Err(MonitorError::AlreadyStarted)));
        assert!(m.stop());
        // a stopped session cannot be restarted either
        assert!(matches!(m.start(), Err(MonitorError::AlreadyStarted)));
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let mut m = monitor();
        assert!(m.stop());
        assert_eq!(m.state(), LoopState::Idle);
    }

    struct SlowToRelease;

    impl TemperatureBackend for SlowToRelease {
        fn kind(&self) -> SourceKind {
            SourceKind::NativeLibrary
        }
        fn probe(&mut self) -> Result<(), SensorError> {
            Ok(())
        }
        fn read(&mut self) -> Result<f64, SensorError> {
            Ok(50.0)
        }
        fn shutdown(&mut self) {
            thread::sleep(Duration::from_millis(400));
        }
    }

    #[test]
    fn stop_gives_up_after_join_timeout() {
        let options = MonitorOptions {
            join_timeout: Duration::from_millis(50),
            ..MonitorOptions::default()
        };
        let mut m = Monitor::with_backends(Settings::default(), options, || {
            BackendSet::new(vec![Box::new(SlowToRelease)])
        });
        let mut state = m.watch_state();
        m.start().unwrap();
        while *state.borrow_and_update() != LoopState::Running {
            thread::sleep(Duration::from_millis(5));
        }

        let asked = std::time::Instant::now();
        assert!(!m.stop());
        assert!(asked.elapsed() < Duration::from_millis(350));
    }

    #[test]
    fn stop_joins_a_prompt_worker() {
        let mut m = monitor();
        m.start().unwrap();
        assert!(m.stop());
        assert_eq!(m.state(), LoopState::Stopped);
        assert!(!m.is_running());
    }

    #[test]
    fn control_calls_validate_and_clamp() {
        let m = monitor();
        assert_eq!(m.set_interval(3.0), Err(ConfigError::InvalidInterval(3.0)));
        assert!(m.set_interval(2.0).is_ok());
        assert_eq!(m.settings().interval(), Duration::from_secs(2));
        assert_eq!(m.set_threshold(120), 100);
    }
}
