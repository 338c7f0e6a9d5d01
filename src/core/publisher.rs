// src/core/publisher.rs
//! The worker → observer boundary.
//!
//! The sampling worker owns a [`Publisher`]; everything it sends is
//! non-blocking. Observers either hold channel receivers directly or
//! implement [`Observer`] and get driven from a relay thread.

use serde::Serialize;
use std::thread::{self, JoinHandle};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use super::sampling_loop::LoopState;
use super::sensors::{SourceKind, TemperatureSample};
use super::warning::WarningFlags;

/// What observers receive once per tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleUpdate {
    pub sample: TemperatureSample,
    pub is_warning: bool,
    pub show_hot: bool,
}

impl SampleUpdate {
    pub fn new(sample: TemperatureSample, flags: WarningFlags) -> Self {
        SampleUpdate {
            sample,
            is_warning: flags.is_warning,
            show_hot: flags.show_hot,
        }
    }

    pub fn temperature(&self) -> Option<f64> {
        self.sample.value
    }

    pub fn active_source(&self) -> SourceKind {
        self.sample.source
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    Sample(SampleUpdate),
    Advisory(String),
    SourceChanged { from: SourceKind, to: SourceKind },
}

// Callback-style consumer. Called from a relay thread, never the worker.
pub trait Observer: Send + 'static {
    fn on_sample(&mut self, update: &SampleUpdate);

    fn on_advisory(&mut self, _message: &str) {}

    fn on_source_changed(&mut self, _from: SourceKind, _to: SourceKind) {}
}

pub struct Publisher {
    events: broadcast::Sender<MonitorEvent>,
    latest: watch::Sender<Option<SampleUpdate>>,
    advisory: watch::Sender<Option<String>>,
    state: watch::Sender<LoopState>,
}

/// The receiving ends handed to the control side.
#[derive(Clone)]
pub struct Subscriptions {
    pub events: broadcast::Sender<MonitorEvent>,
    pub latest: watch::Receiver<Option<SampleUpdate>>,
    pub advisory: watch::Receiver<Option<String>>,
    pub state: watch::Receiver<LoopState>,
}

impl Publisher {
    pub fn new(capacity: usize) -> (Self, Subscriptions) {
        let (events, _) = broadcast::channel(capacity);
        let (latest, latest_rx) = watch::channel(None);
        let (advisory, advisory_rx) = watch::channel(None);
        let (state, state_rx) = watch::channel(LoopState::Idle);
        let subs = Subscriptions {
            events: events.clone(),
            latest: latest_rx,
            advisory: advisory_rx,
            state: state_rx,
        };
        (
            Publisher {
                events,
                latest,
                advisory,
                state,
            },
            subs,
        )
    }

    pub fn publish_sample(&self, update: SampleUpdate) {
        self.latest.send_replace(Some(update.clone()));
        // Err only means nobody is subscribed right now
        let _ = self.events.send(MonitorEvent::Sample(update));
    }

    pub fn publish_advisory(&self, message: String) {
        self.advisory.send_replace(Some(message.clone()));
        let _ = self.events.send(MonitorEvent::Advisory(message));
    }

    pub fn publish_source_change(&self, from: SourceKind, to: SourceKind) {
        let _ = self.events.send(MonitorEvent::SourceChanged { from, to });
    }

    pub fn set_state(&self, state: LoopState) {
        debug!(?state, "Sampling loop state");
        self.state.send_replace(state);
    }
}

impl Subscriptions {
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }
}

// Drives an Observer from its own thread until the publishing side is gone.
pub fn spawn_observer<O: Observer>(
    mut rx: broadcast::Receiver<MonitorEvent>,
    mut observer: O,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("cputemp-observer".into())
        .spawn(move || {
            loop {
                match rx.blocking_recv() {
                    Ok(MonitorEvent::Sample(update)) => observer.on_sample(&update),
                    Ok(MonitorEvent::Advisory(message)) => observer.on_advisory(&message),
                    Ok(MonitorEvent::SourceChanged { from, to }) => {
                        observer.on_source_changed(from, to)
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Observer fell behind, skipping samples");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
}
