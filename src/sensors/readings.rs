//! Typed sensor readings.

use crate::state::StateTree;
use serde::{Deserialize, Serialize};

/// One reading of the climate sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateReading {
    /// Degrees Celsius, uncompensated for board self-heating
    pub temperature: f64,
    /// Hectopascal
    pub pressure: f64,
    /// Percent
    pub relative_humidity: f64,
    /// Gas resistance in ohms
    pub gas: f64,
    /// Meters, derived from pressure and the sea level reference
    pub altitude: f64,
}

/// Mass concentration in µg/m³ for PM1.0, PM2.5 and PM10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConcentrationUnits {
    pub pm10um: u16,
    pub pm25um: u16,
    pub pm100um: u16,
}

impl ConcentrationUnits {
    pub fn to_tree(&self) -> StateTree {
        StateTree::node()
            .with("pm10um", f64::from(self.pm10um))
            .with("pm25um", f64::from(self.pm25um))
            .with("pm100um", f64::from(self.pm100um))
    }

    /// `pm10/pm25/pm100` as shown on the dashboard.
    pub fn summary(&self) -> String {
        format!("{}/{}/{}", self.pm10um, self.pm25um, self.pm100um)
    }
}

/// Particle counts per 0.1 L of air, by minimum diameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Particles {
    pub p03um: u16,
    pub p05um: u16,
    pub p10um: u16,
    pub p25um: u16,
    pub p50um: u16,
    pub p100um: u16,
}

impl Particles {
    pub fn to_tree(&self) -> StateTree {
        StateTree::node()
            .with("p03um", f64::from(self.p03um))
            .with("p05um", f64::from(self.p05um))
            .with("p10um", f64::from(self.p10um))
            .with("p25um", f64::from(self.p25um))
            .with("p50um", f64::from(self.p50um))
            .with("p100um", f64::from(self.p100um))
    }

    pub fn summary(&self) -> String {
        format!(
            "{}/{}/{}/{}/{}/{}",
            self.p03um, self.p05um, self.p10um, self.p25um, self.p50um, self.p100um
        )
    }
}

/// One reading of the PM2.5 sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub std_concentration: ConcentrationUnits,
    pub env_concentration: ConcentrationUnits,
    pub particles: Particles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concentration_tree_and_summary() {
        let units = ConcentrationUnits {
            pm10um: 1,
            pm25um: 2,
            pm100um: 3,
        };
        let tree = units.to_tree();
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["pm100um", "pm10um", "pm25um"]);
        assert_eq!(tree.leaf("pm25um"), Some(2.0));
        assert_eq!(units.summary(), "1/2/3");
    }

    #[test]
    fn test_particles_summary_order() {
        let particles = Particles {
            p03um: 300,
            p05um: 50,
            p10um: 10,
            p25um: 2,
            p50um: 1,
            p100um: 0,
        };
        assert_eq!(particles.summary(), "300/50/10/2/1/0");
        assert_eq!(particles.to_tree().keys().count(), 6);
    }

    #[test]
    fn test_reading_serializes_field_names() {
        let reading = AirQualityReading::default();
        let value = serde_json::to_value(reading).unwrap();
        assert!(value["env_concentration"]["pm25um"].is_number());
        assert!(value["particles"]["p100um"].is_number());
    }
}
