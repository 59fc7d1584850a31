//! Generated reactor telemetry records

use chrono::Utc;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const REACTORS: &[&str] = &["REACTOR_ZA_1", "REACTOR_ZA_2", "REACTOR_RV_1", "REACTOR_RV_2"];
const STATUSES: &[&str] = &["normal", "maintenance", "startup", "shutdown"];
const ROD_POSITIONS: &[&str] = &["75pct", "85pct", "95pct"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// One telemetry sample from a reactor unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorReading {
    pub device_id: String,
    pub power_output: f64,
    pub efficiency: f64,
    pub temperature: f64,
    pub voltage: f64,
    pub current: f64,
    pub status: String,
    pub location: Location,
    pub maintenance_hours: u32,
    pub neutron_flux: f64,
    pub pressure: f64,
    pub rod_position: String,
    /// Seconds since the epoch
    pub timestamp: f64,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn pick<R: Rng>(rng: &mut R, options: &[&str]) -> String {
    options.choose(rng).copied().unwrap_or_default().to_string()
}

impl ReactorReading {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            device_id: pick(rng, REACTORS),
            power_output: round_to(rng.random_range(800.0..1000.0), 2),
            efficiency: round_to(rng.random_range(32.0..35.0), 2),
            temperature: round_to(rng.random_range(285.0..295.0), 2),
            voltage: round_to(rng.random_range(21000.0..23000.0), 2),
            current: round_to(rng.random_range(20000.0..28000.0), 2),
            status: pick(rng, STATUSES),
            location: Location {
                lat: round_to(rng.random_range(47.0..52.0), 4),
                lon: round_to(rng.random_range(30.0..36.0), 4),
            },
            maintenance_hours: rng.random_range(1000..=8760),
            neutron_flux: round_to(rng.random_range(90.0..100.0), 2),
            pressure: round_to(rng.random_range(150.0..160.0), 2),
            rod_position: pick(rng, ROD_POSITIONS),
            timestamp: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}

/// `count` JSON-encoded readings
pub fn generate_payloads(count: u64) -> Vec<Vec<u8>> {
    let mut rng = rand::rng();
    (0..count)
        .map(|_| serde_json::to_vec(&ReactorReading::random(&mut rng)).unwrap_or_default())
        .collect()
}
