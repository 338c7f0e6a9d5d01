// src/core/sampling_loop.rs

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use super::publisher::{Publisher, SampleUpdate};
use super::sensors::{SourceKind, TemperatureSample};
use super::settings::Settings;
use super::source_selector::{SourceSelector, Transition};
use super::warning::WarningState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

// One monitoring session: select a source, then read → evaluate → publish →
// sleep until cancelled.
pub struct SamplingLoop {
    selector: SourceSelector,
    warning: WarningState,
    settings: Settings,
    publisher: Publisher,
    threshold_epoch: u64,
}

impl SamplingLoop {
    pub fn new(selector: SourceSelector, settings: Settings, publisher: Publisher) -> Self {
        SamplingLoop {
            warning: WarningState::new(settings.threshold()),
            threshold_epoch: settings.threshold_epoch(),
            selector,
            settings,
            publisher,
        }
    }

    /// Runs until `cancel` turns true or its sender is dropped.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        self.publisher.set_state(LoopState::Starting);
        let transition = self.selector.select(Instant::now().into_std());
        self.announce(transition);
        self.publisher.set_state(LoopState::Running);

        while !*cancel.borrow_and_update() {
            self.tick();

            // read per cycle, so a new interval applies from the next sleep
            let interval = self.settings.interval();
            tokio::select! {
                _ = sleep(interval) => {}
                changed = cancel.changed() => {
                    if changed.is_err() {
                        debug!("Cancellation handle dropped");
                    }
                    break;
                }
            }
        }

        self.publisher.set_state(LoopState::Stopping);
        self.selector.shutdown();
        info!("Sampling loop stopped");
        self.publisher.set_state(LoopState::Stopped);
    }

    fn tick(&mut self) {
        if let Some(transition) = self.selector.maintain(Instant::now().into_std()) {
            self.announce(transition);
        }

        let epoch = self.settings.threshold_epoch();
        if epoch != self.threshold_epoch {
            self.threshold_epoch = epoch;
            self.warning.set_threshold(self.settings.threshold());
        }

        let source = self.selector.active_kind();
        let value = match self.selector.read() {
            Ok(celsius) => Some(celsius),
            Err(e) => {
                debug!(source = %source, error = %e, "Temperature read failed");
                None
            }
        };

        let sample = TemperatureSample::new(value, source);
        let flags = self.warning.update(&sample);
        self.publisher.publish_sample(SampleUpdate::new(sample, flags));
    }

    fn announce(&self, transition: Transition) {
        if transition.from != transition.to && transition.from != SourceKind::None {
            self.publisher
                .publish_source_change(transition.from, transition.to);
        }
        if let Some(message) = transition.advisory {
            warn!(%message, "No hardware temperature source");
            self.publisher.publish_advisory(message);
        }
    }
}
