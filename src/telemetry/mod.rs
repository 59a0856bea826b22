//! Telemetry publishing over MQTT.
//!
//! The smoothed environment is serialized as JSON and published to
//! `{prefix}/state`. The dashboard also listens on `{prefix}/light/set` and
//! acknowledges commands on `{prefix}/light/state`.

mod client;
mod publisher;

pub use client::{MqttClient, MqttEventLoop, MqttMessage};
pub use publisher::MqttTelemetry;

use crate::display::ConnectionStatus;
use crate::error::Result;
use crate::state::StateTree;
use async_trait::async_trait;

/// MQTT topics used by one dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub state: String,
    pub light_state: String,
    pub light_command: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            state: format!("{}/state", prefix),
            light_state: format!("{}/light/state", prefix),
            light_command: format!("{}/light/set", prefix),
        }
    }
}

/// Destination for smoothed environment snapshots.
#[async_trait]
pub trait Telemetry: Send {
    /// Publish the smoothed state.
    async fn publish_state(&mut self, state: &StateTree) -> Result<()>;

    /// Connection status for the on-screen indicator.
    fn status(&self) -> ConnectionStatus;
}
