//! MQTT-backed [`Telemetry`] implementation.

use super::client::{MqttClient, MqttMessage};
use super::{Telemetry, Topics};
use crate::config::MqttConfig;
use crate::display::ConnectionStatus;
use crate::error::{DashboardError, Result};
use crate::state::StateTree;
use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Publishes smoothed state to `{prefix}/state`.
///
/// Owns the background tasks running the MQTT event loop and handling
/// incoming commands; they are aborted when this value is dropped.
pub struct MqttTelemetry {
    client: MqttClient,
    topics: Topics,
    status: watch::Receiver<ConnectionStatus>,
    tasks: Vec<JoinHandle<()>>,
}

impl MqttTelemetry {
    /// Connect to the configured broker and start the background tasks.
    ///
    /// Fails when no broker host is configured.
    pub fn start(config: &MqttConfig) -> Result<Self> {
        let (client, event_loop) = MqttClient::new(config)?;
        info!(
            "[MQTT] Connecting to {}:{}",
            config.broker_host.as_deref().unwrap_or_default(),
            config.broker_port
        );

        let topics = Topics::new(&config.topic_prefix);

        let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(64);
        let (status_tx, status) = watch::channel(ConnectionStatus::Disconnected);

        let subscriptions = vec![topics.light_command.clone()];
        let event_loop = tokio::spawn(async move {
            event_loop.run(subscriptions, msg_tx, status_tx).await;
        });

        let command_client = client.clone();
        let command_topics = topics.clone();
        let commands = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Some((topic, payload)) = handle_message(&command_topics, &msg) {
                    if let Err(e) = command_client.publish(&topic, payload).await {
                        warn!("[MQTT] Failed to acknowledge light command: {}", e);
                    }
                }
            }
        });

        Ok(Self {
            client,
            topics,
            status,
            tasks: vec![event_loop, commands],
        })
    }
}

impl Drop for MqttTelemetry {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl Telemetry for MqttTelemetry {
    async fn publish_state(&mut self, state: &StateTree) -> Result<()> {
        if self.status() != ConnectionStatus::Connected {
            return Err(DashboardError::NotConnected);
        }

        let payload = serde_json::to_string(state)?;
        info!("[MQTT] Publishing to {}", self.topics.state);
        self.client.publish(&self.topics.state, payload).await
    }

    fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }
}

/// Route an incoming message. Light commands are echoed back on the light
/// state topic; everything else is only logged.
fn handle_message(topics: &Topics, msg: &MqttMessage) -> Option<(String, String)> {
    info!("[MQTT] Topic {} received new value: {}", msg.topic, msg.payload);
    (msg.topic == topics.light_command)
        .then(|| (topics.light_state.clone(), msg.payload.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str, payload: &str) -> MqttMessage {
        MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_light_command_is_acknowledged() {
        let topics = Topics::new("funhouse");
        let reply = handle_message(&topics, &message("funhouse/light/set", " ON\n"));
        assert_eq!(
            reply,
            Some(("funhouse/light/state".to_string(), "ON".to_string()))
        );
    }

    #[test]
    fn test_other_topics_are_ignored() {
        let topics = Topics::new("funhouse");
        assert_eq!(handle_message(&topics, &message("funhouse/state", "{}")), None);
    }

    #[tokio::test]
    async fn test_publish_requires_connection() {
        let config = MqttConfig {
            broker_host: Some("127.0.0.1".to_string()),
            broker_port: 9,
            ..MqttConfig::default()
        };
        let mut telemetry = MqttTelemetry::start(&config).unwrap();
        assert_eq!(telemetry.status(), ConnectionStatus::Disconnected);

        let err = telemetry
            .publish_state(&StateTree::node().with("temperature", 20.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::NotConnected));
    }

    #[tokio::test]
    async fn test_start_without_broker_host_fails() {
        let result = MqttTelemetry::start(&MqttConfig::default());
        assert!(matches!(result, Err(DashboardError::InvalidConfig { .. })));
    }
}
