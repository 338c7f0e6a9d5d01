// src/core/sensors/simulated_backend.rs

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

use super::temperature_backend::{SensorError, SourceKind, TemperatureBackend};

const BASE_CELSIUS: f64 = 48.0;
const WAVE_AMPLITUDE: f64 = 8.0;
const WAVE_PERIOD_SECS: f64 = 60.0;
const NOISE_SPAN: f64 = 1.5;
const SPIKE_PROBABILITY: f64 = 0.05;
const SPIKE_MIN: f64 = 5.0;
const SPIKE_MAX: f64 = 10.0;

/// Stand-in source used when no hardware telemetry is reachable. Never fails.
pub struct SimulatedBackend {
    rng: StdRng,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        SimulatedBackend {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        SimulatedBackend {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Value of the waveform at `t_secs` seconds of wall-clock time.
    pub fn sample_at(&mut self, t_secs: f64) -> f64 {
        let wave = 0.5 + 0.5 * (TAU * (t_secs % WAVE_PERIOD_SECS) / WAVE_PERIOD_SECS).sin();
        let noise = self.rng.gen_range(-NOISE_SPAN..=NOISE_SPAN);
        let spike = if self.rng.gen_bool(SPIKE_PROBABILITY) {
            self.rng.gen_range(SPIKE_MIN..=SPIKE_MAX)
        } else {
            0.0
        };
        let celsius = BASE_CELSIUS + WAVE_AMPLITUDE * wave + noise + spike;
        (celsius * 10.0).round() / 10.0
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureBackend for SimulatedBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Simulated
    }

    fn probe(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        let now = Utc::now().timestamp_millis() as f64 / 1_000.0;
        Ok(self.sample_at(now))
    }

    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_realistic_band() {
        let mut sim = SimulatedBackend::seeded(7);
        for i in 0..5_000 {
            let v = sim.sample_at(i as f64 * 0.37);
            assert!((44.0..=68.0).contains(&v), "{v} out of range at tick {i}");
        }
    }

    #[test]
    fn rounded_to_one_decimal() {
        let mut sim = SimulatedBackend::seeded(1);
        for i in 0..200 {
            let v = sim.sample_at(i as f64);
            assert!(((v * 10.0).round() - v * 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn spikes_occur_but_rarely() {
        let mut sim = SimulatedBackend::seeded(42);
        // at t=45s the wave sits at its minimum (48.0), so anything past
        // 49.5 can only come from a spike
        let spikes = (0..10_000)
            .filter(|_| sim.sample_at(45.0) > 49.6)
            .count();
        assert!(spikes > 200 && spikes < 900, "{spikes} spikes");
    }

    #[test]
    fn read_never_fails() {
        let mut sim = SimulatedBackend::new();
        sim.probe().unwrap();
        for _ in 0..100 {
            assert!(sim.read().is_ok());
        }
        sim.shutdown();
        assert!(sim.read().is_ok());
    }
}
