use thiserror::Error as ThisError;

use crate::sensors::SensorError;
use crate::state::AggregationError;

#[derive(ThisError, Debug)]
pub enum DashboardError {
    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    #[error("Telemetry is not connected")]
    NotConnected,

    #[error("Display error: {0}")]
    Display(String),

    #[error("Light sleep failed: {0}")]
    Sleep(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
