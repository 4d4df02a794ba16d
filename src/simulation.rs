//! Simulated telemetry
//!
//! ══════════════════════════════════════════════════════════════════════════════
//! SINGLE SOURCE OF SENSOR DATA
//! ══════════════════════════════════════════════════════════════════════════════
//!
//! Field devices are not connected; every reading the feed holds comes from
//! here. Each tick applies a bounded random walk to the channels a reading
//! already carries:
//!
//! ```text
//! next = max(0, current + uniform(-variance, +variance))
//! ```
//!
//! Channels a reading does not carry stay absent. When real hardware is
//! attached this module is replaced by an ingestion path that produces the
//! same `SensorReading` values.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::trace;

use crate::models::SensorReading;

/// Maximum per-tick change for each channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelVariance {
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

impl ChannelVariance {
    pub const DEFAULT: ChannelVariance = ChannelVariance {
        temperature: 2.0,
        humidity: 5.0,
        soil_moisture: 3.0,
        light_intensity: 50.0,
        ph: 0.2,
        nitrogen: 10.0,
        phosphorus: 5.0,
        potassium: 15.0,
    };
}

impl Default for ChannelVariance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// One random-walk step, never below zero
pub fn perturb_value<R: Rng>(base: f64, variance: f64, rng: &mut R) -> f64 {
    let offset = if variance > 0.0 {
        rng.gen_range(-variance..=variance)
    } else {
        0.0
    };
    (base + offset).max(0.0)
}

fn step<R: Rng>(channel: &mut Option<f64>, variance: f64, rng: &mut R) {
    if let Some(value) = channel {
        *value = perturb_value(*value, variance, rng);
    }
}

/// Perturb every present channel of a reading and stamp it with `now`
pub fn perturb_reading<R: Rng>(
    reading: &SensorReading,
    variance: &ChannelVariance,
    rng: &mut R,
    now: DateTime<Utc>,
) -> SensorReading {
    let mut next = reading.clone();
    next.timestamp = now;

    step(&mut next.temperature, variance.temperature, rng);
    step(&mut next.humidity, variance.humidity, rng);
    step(&mut next.soil_moisture, variance.soil_moisture, rng);
    step(&mut next.light_intensity, variance.light_intensity, rng);
    step(&mut next.ph, variance.ph, rng);
    step(&mut next.nitrogen, variance.nitrogen, rng);
    step(&mut next.phosphorus, variance.phosphorus, rng);
    step(&mut next.potassium, variance.potassium, rng);

    trace!(
        device_id = %next.device_id,
        temperature = ?next.temperature,
        humidity = ?next.humidity,
        soil_moisture = ?next.soil_moisture,
        "Perturbed sensor reading"
    );

    next
}

/// Initial buffer: three field sensors with every channel populated
pub fn mock_readings() -> Vec<SensorReading> {
    let now = Utc::now();
    let full = |device_id: &str, values: [f64; 8]| SensorReading {
        device_id: device_id.to_string(),
        timestamp: now,
        temperature: Some(values[0]),
        humidity: Some(values[1]),
        soil_moisture: Some(values[2]),
        light_intensity: Some(values[3]),
        ph: Some(values[4]),
        nitrogen: Some(values[5]),
        phosphorus: Some(values[6]),
        potassium: Some(values[7]),
    };

    vec![
        full("sensor-001", [25.5, 65.0, 45.0, 800.0, 6.8, 120.0, 45.0, 180.0]),
        full("sensor-002", [28.2, 58.0, 38.0, 950.0, 7.1, 110.0, 52.0, 165.0]),
        full("sensor-003", [22.8, 72.0, 52.0, 650.0, 6.5, 135.0, 48.0, 190.0]),
    ]
}
