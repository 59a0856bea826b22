//! Building one environment snapshot per cycle.

use super::{AirQualityReading, ClimateReading};
use crate::state::StateTree;
use log::warn;

/// Turns the latest sensor readings into a [`StateTree`] snapshot.
///
/// Top-level keys: `temperature`, `pressure`, `humidity`, `gas`, `altitude`,
/// `light`, plus `pm_units_env`, `pm_units_std` and `pm_particles` when an
/// air-quality reading is available.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotBuilder {
    temperature_offset: f64,
}

impl SnapshotBuilder {
    /// Compensates the board heating the climate sensor.
    pub const DEFAULT_TEMPERATURE_OFFSET: f64 = -5.0;

    pub fn new(temperature_offset: f64) -> Self {
        Self { temperature_offset }
    }

    pub fn temperature_offset(&self) -> f64 {
        self.temperature_offset
    }

    /// Build a snapshot. `None` readings become missing values (climate,
    /// light) or absent subtrees (air quality).
    pub fn build(
        &self,
        climate: Option<&ClimateReading>,
        light: Option<f64>,
        air: Option<&AirQualityReading>,
    ) -> StateTree {
        let climate_value = |key: &str, pick: fn(&ClimateReading) -> f64| {
            reading(key, climate.map(pick))
        };

        let mut snapshot = StateTree::node()
            .with(
                "temperature",
                climate_value("temperature", |c| c.temperature)
                    .as_leaf()
                    .map(|t| t + self.temperature_offset),
            )
            .with("pressure", climate_value("pressure", |c| c.pressure))
            .with("humidity", climate_value("humidity", |c| c.relative_humidity))
            .with("gas", climate_value("gas", |c| c.gas))
            .with("altitude", climate_value("altitude", |c| c.altitude))
            .with("light", reading("light", light));

        if let Some(air) = air {
            snapshot.insert("pm_units_env", air.env_concentration.to_tree());
            snapshot.insert("pm_units_std", air.std_concentration.to_tree());
            snapshot.insert("pm_particles", air.particles.to_tree());
        }

        snapshot
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TEMPERATURE_OFFSET)
    }
}

/// Non-finite values are recorded as missing so the previous smoothed value
/// is carried forward.
fn reading(key: &str, value: Option<f64>) -> StateTree {
    match value {
        Some(v) if v.is_finite() => StateTree::Leaf(v),
        Some(v) => {
            warn!("[Sensors] Dropping non-finite {} reading: {}", key, v);
            StateTree::Missing
        }
        None => StateTree::Missing,
    }
}
