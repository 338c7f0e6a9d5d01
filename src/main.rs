// src/main.rs

use anyhow::{Context, Result};
use std::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cputemp_widget::core::sensors::SourceKind;
use cputemp_widget::{Config, Monitor, Observer, SampleUpdate};

// Headless stand-in for the overlay: one log line per tick.
struct LogObserver;

impl Observer for LogObserver {
    fn on_sample(&mut self, update: &SampleUpdate) {
        match update.temperature() {
            Some(celsius) => info!(
                celsius,
                source = %update.active_source(),
                warning = update.is_warning,
                hot = update.show_hot,
                "CPU temperature"
            ),
            None => info!(source = %update.active_source(), "CPU temperature unavailable"),
        }
    }

    fn on_advisory(&mut self, message: &str) {
        warn!("{}", message.replace('\n', " "));
    }

    fn on_source_changed(&mut self, from: SourceKind, to: SourceKind) {
        info!(%from, %to, "Temperature source changed");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let mut config = Config::load();
    if config.first_run {
        config.first_run = false;
        config.save_or_warn();
    }

    let mut monitor = Monitor::new(&config);
    monitor.attach(LogObserver)?;
    monitor.start()?;

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Installing Ctrl-C handler")?;

    // Blocks until Ctrl-C
    let _ = rx.recv();
    info!("Shutting down");
    if !monitor.stop() {
        warn!("Sampling worker left running at exit");
    }
    Ok(())
}
