//! MQTT client wrapper for telemetry publishing.

use crate::config::MqttConfig;
use crate::display::ConnectionStatus;
use crate::error::{DashboardError, Result};
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Message received from MQTT broker.
#[derive(Debug, Clone, PartialEq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

/// Cloneable publishing handle.
#[derive(Clone)]
pub struct MqttClient {
    client: AsyncClient,
}

/// The connection driving an [`MqttClient`]; must be polled with
/// [`MqttEventLoop::run`] for anything to reach the broker.
pub struct MqttEventLoop {
    client: AsyncClient,
    event_loop: EventLoop,
}

impl MqttClient {
    /// Create a client and its event loop from configuration.
    pub fn new(config: &MqttConfig) -> Result<(Self, MqttEventLoop)> {
        let (client, event_loop) = AsyncClient::new(Self::options(config)?, 100);
        Ok((
            Self {
                client: client.clone(),
            },
            MqttEventLoop { client, event_loop },
        ))
    }

    /// Connection options derived from configuration. Fails when no broker
    /// host is configured.
    pub fn options(config: &MqttConfig) -> Result<MqttOptions> {
        let host = config
            .broker_host
            .as_deref()
            .ok_or_else(|| DashboardError::InvalidConfig {
                key: "MQTT_BROKER_HOST".to_string(),
                value: String::new(),
            })?;
        let mut options = MqttOptions::new(&config.client_id, host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        // Credentials only when both halves are present
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        Ok(options)
    }

    /// Publish a message to a topic, QoS 0 and not retained.
    pub async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        debug!("[MQTT] Publishing to {}: {}", topic, payload);
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.into_bytes())
            .await?;
        Ok(())
    }
}

impl MqttEventLoop {

    /// Run the MQTT event loop.
    ///
    /// Connection changes are reported on `status`. Every `ConnAck` re-issues
    /// the subscriptions in `topics`, since the broker forgets them when a
    /// clean session reconnects. Incoming publishes are forwarded on `tx`.
    /// Returns when the message channel is closed.
    pub async fn run(
        mut self,
        topics: Vec<String>,
        tx: mpsc::Sender<MqttMessage>,
        status: watch::Sender<ConnectionStatus>,
    ) {
        info!("[MQTT] Starting event loop");

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("[MQTT] Connected");
                    status.send_replace(ConnectionStatus::Connected);
                    for topic in &topics {
                        if let Err(e) = self.client.try_subscribe(topic, QoS::AtMostOnce) {
                            warn!("[MQTT] Failed to subscribe to {}: {:?}", topic, e);
                        }
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let payload = match String::from_utf8(publish.payload.to_vec()) {
                        Ok(s) => s,
                        Err(e) => {
                            warn!("[MQTT] Invalid UTF-8 in payload: {}", e);
                            continue;
                        }
                    };

                    debug!("[MQTT] Received on {}: {}", publish.topic, payload);

                    let msg = MqttMessage {
                        topic: publish.topic.clone(),
                        payload,
                    };
                    if tx.send(msg).await.is_err() {
                        error!("[MQTT] Message channel closed");
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("[MQTT] Broker sent disconnect");
                    status.send_replace(ConnectionStatus::Disconnected);
                }
                Ok(_) => {}
                Err(e) => {
                    error!("[MQTT] Connection error: {:?}", e);
                    status.send_replace(ConnectionStatus::Disconnected);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}
