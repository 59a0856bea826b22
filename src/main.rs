use clap::Parser;
use funhouse_dashboard::config::{self, Config};
use funhouse_dashboard::dashboard::{Dashboard, DashboardSettings};
use funhouse_dashboard::instance_lock::InstanceLock;
use funhouse_dashboard::simulation::{SimulatedBoard, run_activity_simulation};
use funhouse_dashboard::telemetry::MqttTelemetry;
use log::{error, info, warn};
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "funhouse-dashboard")]
#[command(about = "Environment dashboard with smoothed MQTT telemetry")]
struct Cli {
    /// Do not connect to the MQTT broker
    #[arg(long)]
    offline: bool,

    /// Smoothing retention factor in (0, 1); overrides DASHBOARD_ALPHA
    #[arg(long)]
    alpha: Option<f64>,

    /// Seconds between publishes; overrides DASHBOARD_PUBLISH_INTERVAL_SECS
    #[arg(long)]
    publish_interval: Option<u64>,

    /// MQTT topic prefix; overrides MQTT_TOPIC_PREFIX
    #[arg(long)]
    topic_prefix: Option<String>,

    /// Seed for the simulated sensors
    #[arg(long, env = "SIMULATION_SEED", default_value_t = 0)]
    seed: u64,

    /// Press a simulated button every N seconds (0 disables)
    #[arg(long, default_value_t = 0)]
    press_every: u64,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> funhouse_dashboard::error::Result<Config> {
    let mut config = Config::from_env()?;
    if cli.offline {
        config.mqtt.broker_host = None;
    }
    if let Some(alpha) = cli.alpha {
        config.dashboard.alpha = alpha;
    }
    if let Some(secs) = cli.publish_interval {
        config.dashboard.publish_interval = Duration::from_secs(secs);
    }
    if let Some(prefix) = &cli.topic_prefix {
        config.mqtt.topic_prefix = prefix.clone();
    }
    Ok(config)
}

fn main() {
    // Load .env file before the runtime spawns any threads
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };
    runtime.block_on(run(cli));
}

async fn run(cli: Cli) {
    info!("Starting funhouse dashboard");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let settings = match DashboardSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let _lock = match InstanceLock::acquire() {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration loaded:");
    info!("  Alpha: {}", settings.alpha);
    info!("  Publish interval: {:?}", settings.publish_interval);
    match &config.mqtt.broker_host {
        Some(host) => info!("  MQTT broker: {}:{}", host, config.mqtt.broker_port),
        None => info!("  MQTT broker: not configured"),
    }
    info!("  Topic prefix: {}", config.mqtt.topic_prefix);

    let board = SimulatedBoard::new(cli.seed);
    let activity = (cli.press_every > 0)
        .then(|| run_activity_simulation(board.handle(), Duration::from_secs(cli.press_every)));

    let telemetry = if config.mqtt.is_configured() {
        match MqttTelemetry::start(&config.mqtt) {
            Ok(telemetry) => Some(telemetry),
            Err(e) => {
                error!("Failed to start MQTT telemetry: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        warn!("No MQTT broker configured, readings will not be published");
        None
    };

    let mut dashboard = Dashboard::new(board, telemetry, settings);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
        signal_token.cancel();
    });

    dashboard.run(shutdown).await;

    if let Some(task) = activity {
        task.abort();
    }
    info!("Funhouse dashboard stopped");
}
