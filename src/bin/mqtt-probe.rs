//! Subscribe to a dashboard's state topic and log what it publishes.
//!
//! Usage:
//!   cargo run --bin mqtt-probe
//!
//! Connects with the same MQTT settings as the dashboard and prints every
//! smoothed snapshot, which is handy to check payloads without a separate
//! MQTT client.

use funhouse_dashboard::config::Config;
use funhouse_dashboard::display::ConnectionStatus;
use funhouse_dashboard::state::StateTree;
use funhouse_dashboard::telemetry::{MqttClient, MqttMessage, Topics};
use log::{info, warn};
use tokio::sync::{mpsc, watch};

fn describe(payload: &str) -> String {
    match serde_json::from_str::<StateTree>(payload) {
        Ok(tree) => {
            let mut parts = Vec::new();
            for key in ["temperature", "humidity", "pressure", "pm_units_env.pm25um"] {
                if let Some(value) = tree.leaf(key) {
                    parts.push(format!("{}={:.2}", key, value));
                }
            }
            format!("{} keys [{}]", tree.keys().count(), parts.join(", "))
        }
        Err(e) => format!("unparseable payload ({})", e),
    }
}

fn main() {
    // Load .env file before the runtime spawns any threads
    funhouse_dashboard::config::load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(probe()),
        Err(e) => warn!("Failed to start async runtime: {}", e),
    }
}

async fn probe() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let topics = Topics::new(&config.mqtt.topic_prefix);

    let mut mqtt = config.mqtt.clone();
    mqtt.client_id = format!("{}-probe", mqtt.client_id);

    let (_client, event_loop) = match MqttClient::new(&mqtt) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Cannot connect, set MQTT_BROKER_HOST: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Connecting to MQTT broker at {}:{}, watching {}",
        mqtt.broker_host.as_deref().unwrap_or_default(),
        mqtt.broker_port,
        topics.state
    );

    let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(100);
    let (status_tx, mut status_rx) = watch::channel(ConnectionStatus::Disconnected);

    let subscriptions = vec![topics.state.clone(), topics.light_state.clone()];
    let mqtt_handle = tokio::spawn(async move {
        event_loop.run(subscriptions, msg_tx, status_tx).await;
    });

    let status_handle = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            info!(">>> Connection {:?}", *status_rx.borrow());
        }
    });

    let msg_handle = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            if msg.topic == topics.state {
                info!(">>> {}: {}", msg.topic, describe(&msg.payload));
            } else {
                info!(">>> {}: {}", msg.topic, msg.payload);
            }
        }
    });

    tokio::select! {
        _ = mqtt_handle => {
            warn!("MQTT event loop ended");
        }
        _ = msg_handle => {
            warn!("Message processor ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    status_handle.abort();
    info!("Probe complete.");
}
