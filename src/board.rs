//! The peripherals one dashboard runs on.

use crate::display::Display;
use crate::error::Result;
use crate::sensors::{AirQualitySensor, ClimateSensor, Controls, LightSensor};
use async_trait::async_trait;
use std::time::Duration;

/// Low-power wait between loop iterations.
#[async_trait]
pub trait Power: Send {
    async fn light_sleep(&mut self, duration: Duration) -> Result<()>;
}

/// Everything the dashboard loop needs from the hardware.
pub trait Board: ClimateSensor + LightSensor + AirQualitySensor + Controls + Display + Power {}

impl<T> Board for T where
    T: ClimateSensor + LightSensor + AirQualitySensor + Controls + Display + Power
{
}
