use crate::error::{DashboardError, Result};
use crate::state::DecayAlpha;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
///
/// Must be called before any other thread is started.
pub fn load_dotenv() {
    load_dotenv_from(Path::new(".env"));
}

/// Load a dotenv-style file. Variables already set in the environment win.
///
/// Must be called before any other thread is started.
pub fn load_dotenv_from(env_path: &Path) {
    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            // SAFETY: callers load the file before starting any threads
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Parse `KEY=value` lines, skipping blanks and comments and stripping one
/// level of matching quotes.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            Some((key.trim(), value))
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Publishing is skipped entirely when unset.
    pub broker_host: Option<String>,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Retention factor for the smoothed environment, in (0, 1).
    pub alpha: f64,
    /// How often raw readings are dumped to the log.
    pub dump_interval: Duration,
    /// How often the smoothed state is published.
    pub publish_interval: Duration,
    /// Idle time before the display starts dimming.
    pub idle_timeout: Duration,
    /// Added to the climate sensor temperature.
    pub temperature_offset: f64,
    /// Gas readings averaged into the startup baseline.
    pub gas_baseline_samples: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: None,
            broker_port: 1883,
            client_id: default_client_id(),
            username: None,
            password: None,
            topic_prefix: "funhouse".to_string(),
        }
    }
}

impl MqttConfig {
    /// True when a broker host is set.
    pub fn is_configured(&self) -> bool {
        self.broker_host.is_some()
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            alpha: DecayAlpha::DEFAULT,
            dump_interval: Duration::from_secs(10),
            publish_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(5),
            temperature_offset: -5.0,
            gas_baseline_samples: 10,
        }
    }
}

/// `funhouse-<hostname>`, falling back to `funhouse-dashboard`.
fn default_client_id() -> String {
    let host = gethostname::gethostname();
    match host.to_str() {
        Some(name) if !name.is_empty() => format!("funhouse-{}", name),
        _ => "funhouse-dashboard".to_string(),
    }
}

impl Config {
    /// Defaults overridden by environment variables.
    ///
    /// Unparseable numeric values are reported rather than ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        // MQTT configuration; an empty host counts as unset
        config.mqtt.broker_host = lookup("MQTT_BROKER_HOST")
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty());
        if let Some(port) = lookup("MQTT_BROKER_PORT") {
            config.mqtt.broker_port = parse("MQTT_BROKER_PORT", &port)?;
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Some(prefix) = lookup("MQTT_TOPIC_PREFIX") {
            config.mqtt.topic_prefix = prefix;
        }

        // Dashboard configuration
        if let Some(alpha) = lookup("DASHBOARD_ALPHA") {
            config.dashboard.alpha = parse("DASHBOARD_ALPHA", &alpha)?;
        }
        if let Some(secs) = lookup("DASHBOARD_DUMP_INTERVAL_SECS") {
            config.dashboard.dump_interval =
                Duration::from_secs(parse("DASHBOARD_DUMP_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = lookup("DASHBOARD_PUBLISH_INTERVAL_SECS") {
            config.dashboard.publish_interval =
                Duration::from_secs(parse("DASHBOARD_PUBLISH_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = lookup("DASHBOARD_IDLE_TIMEOUT_SECS") {
            config.dashboard.idle_timeout =
                Duration::from_secs(parse("DASHBOARD_IDLE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(offset) = lookup("DASHBOARD_TEMPERATURE_OFFSET") {
            config.dashboard.temperature_offset = parse("DASHBOARD_TEMPERATURE_OFFSET", &offset)?;
        }

        config.decay_alpha()?;
        Ok(config)
    }

    /// Validated decay factor.
    pub fn decay_alpha(&self) -> Result<DecayAlpha> {
        Ok(DecayAlpha::new(self.dashboard.alpha)?)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn invalid(key: &str, value: &str) -> DashboardError {
    DashboardError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    }
}
