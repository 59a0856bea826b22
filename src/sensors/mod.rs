//! Sensor readings and the traits the dashboard samples them through.
//!
//! Hardware drivers (climate, ambient light, PM2.5) sit behind small traits so
//! the dashboard loop can run against real peripherals or the simulated board.

pub mod gas_baseline;
pub mod readings;
pub mod snapshot;

pub use gas_baseline::GasBaseline;
pub use readings::{AirQualityReading, ClimateReading, ConcentrationUnits, Particles};
pub use snapshot::SnapshotBuilder;

use thiserror::Error;

/// Error types for sensor access.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The sensor did not answer or returned garbage.
    #[error("{sensor} read failed: {reason}")]
    ReadFailed {
        sensor: &'static str,
        reason: String,
    },

    /// Calibration was requested with zero samples.
    #[error("no samples requested for {0} calibration")]
    NoSamples(&'static str),
}

impl SensorError {
    pub fn read_failed(sensor: &'static str, reason: impl Into<String>) -> Self {
        SensorError::ReadFailed {
            sensor,
            reason: reason.into(),
        }
    }
}

/// Temperature, pressure, humidity and gas sensor (BME680 class).
pub trait ClimateSensor {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError>;
}

/// Ambient light sensor.
pub trait LightSensor {
    fn read_light(&mut self) -> Result<f64, SensorError>;
}

/// PM2.5 air-quality sensor.
pub trait AirQualitySensor {
    fn read_air_quality(&mut self) -> Result<AirQualityReading, SensorError>;
}

/// Buttons and the capacitive slider on the board.
pub trait Controls {
    /// True while any of the select/up/down buttons is held.
    fn any_button_pressed(&mut self) -> bool;

    /// Slider position in 0.0..=1.0 while touched.
    fn slider(&mut self) -> Option<f64>;
}
