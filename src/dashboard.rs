//! The dashboard control loop.
//!
//! One loop samples the sensors, updates the screen, folds the snapshot into
//! the smoothed environment and periodically publishes it. Everything runs in
//! sequence; the smoothed state is owned here and never shared.

use crate::board::Board;
use crate::config::Config;
use crate::display::{
    ALARM_BRIGHTNESS, ALARM_DOTSTARS, BrightnessController, BrightnessLevels, ConnectionStatus,
    Label, NORMAL_DOTSTARS, format_humidity, format_pressure, format_temperature, label_color,
};
use crate::display::layout::DATA_COLOR;
use crate::error::{DashboardError, Result};
use crate::sensors::{AirQualityReading, ClimateReading, GasBaseline, SnapshotBuilder};
use crate::state::{DecayAlpha, SmoothedEnvironment};
use crate::telemetry::Telemetry;
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

/// Timing and calibration of one dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub alpha: DecayAlpha,
    pub dump_interval: Duration,
    pub publish_interval: Duration,
    pub idle_timeout: Duration,
    pub temperature_offset: f64,
    pub gas_baseline_samples: usize,
    pub brightness: BrightnessLevels,
}

impl DashboardSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            alpha: config.decay_alpha()?,
            dump_interval: config.dashboard.dump_interval,
            publish_interval: config.dashboard.publish_interval,
            idle_timeout: config.dashboard.idle_timeout,
            temperature_offset: config.dashboard.temperature_offset,
            gas_baseline_samples: config.dashboard.gas_baseline_samples,
            brightness: BrightnessLevels::default(),
        })
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            alpha: DecayAlpha::default(),
            dump_interval: Duration::from_secs(10),
            publish_interval: Duration::from_secs(60),
            idle_timeout: BrightnessController::DEFAULT_IDLE_TIMEOUT,
            temperature_offset: SnapshotBuilder::DEFAULT_TEMPERATURE_OFFSET,
            gas_baseline_samples: GasBaseline::DEFAULT_SAMPLES,
            brightness: BrightnessLevels::default(),
        }
    }
}

/// What happened during one [`Dashboard::cycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub sleepy: bool,
    pub aggregated: bool,
    pub published: bool,
    pub alarm: bool,
}

/// Environment dashboard bound to a board and an optional telemetry sink.
pub struct Dashboard<B: Board, T: Telemetry> {
    board: B,
    telemetry: Option<T>,
    settings: DashboardSettings,
    snapshots: SnapshotBuilder,
    brightness: BrightnessController,
    environment: SmoothedEnvironment,
    gas_baseline: Option<GasBaseline>,
    climate: Option<ClimateReading>,
    light: Option<f64>,
    recent_air: Option<AirQualityReading>,
    shown_status: Option<ConnectionStatus>,
    alarm: bool,
    last_dump: Instant,
    last_publish: Instant,
}

impl<B: Board, T: Telemetry> Dashboard<B, T> {
    /// Set up the screen, calibrate the gas baseline and take the first
    /// snapshot, which seeds the smoothed environment unchanged.
    pub fn new(board: B, telemetry: Option<T>, settings: DashboardSettings) -> Self {
        let now = Instant::now();
        let mut dashboard = Self {
            board,
            telemetry,
            snapshots: SnapshotBuilder::new(settings.temperature_offset),
            brightness: BrightnessController::new(settings.brightness, settings.idle_timeout, now),
            environment: SmoothedEnvironment::new(settings.alpha),
            gas_baseline: None,
            climate: None,
            light: None,
            recent_air: None,
            shown_status: None,
            alarm: false,
            last_dump: now,
            last_publish: now,
            settings,
        };

        dashboard.create_ui();

        dashboard.gas_baseline =
            match GasBaseline::calibrate(&mut dashboard.board, dashboard.settings.gas_baseline_samples) {
                Ok(baseline) => Some(baseline),
                Err(e) => {
                    warn!("[Sensors] Gas baseline unavailable: {}", e);
                    None
                }
            };

        dashboard.sample_climate();
        dashboard.recent_air = dashboard.sample_air_quality();
        dashboard.update_environment();
        dashboard
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn environment(&self) -> &SmoothedEnvironment {
        &self.environment
    }

    pub fn gas_baseline(&self) -> Option<GasBaseline> {
        self.gas_baseline
    }

    /// Run cycles until `shutdown` is cancelled.
    ///
    /// A cycle interrupted by shutdown may stop mid-publish, so the LED is
    /// switched off on the way out.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!("[Dashboard] Running, alpha {}", self.environment.alpha());
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.cycle() => {}
            }
        }
        self.board.set_led(false);
        info!(
            "[Dashboard] Stopped after {} updates",
            self.environment.updates()
        );
    }

    /// One pass of the control loop.
    pub async fn cycle(&mut self) -> CycleReport {
        let now = Instant::now();
        let print_data = now.duration_since(self.last_dump) >= self.settings.dump_interval;
        if print_data {
            self.last_dump = now;
        }

        let sleepy = self.update_ui(print_data);
        let aggregated = self.update_environment();

        let mut published = false;
        if now.duration_since(self.last_publish) >= self.settings.publish_interval {
            published = self.publish().await;
            self.last_publish = now;
        }

        let interval = self.brightness.sleep_interval();
        match self.board.light_sleep(interval).await {
            Ok(()) => self.set_alarm(false),
            Err(e) => {
                error!("[Dashboard] ALARM: {}", e);
                self.set_alarm(true);
            }
        }

        CycleReport {
            sleepy,
            aggregated,
            published,
            alarm: self.alarm,
        }
    }

    fn create_ui(&mut self) {
        self.board.set_dotstars(NORMAL_DOTSTARS);
        self.apply_brightness(self.brightness.levels());
        for label in Label::iter() {
            self.board.set_text(label, label.initial_text());
            self.board.set_text_color(label, label.initial_color());
        }
        self.show_status();
        self.refresh();
    }

    /// Read sensors into the labels and apply the brightness policy.
    /// Returns true when the screen has faded out.
    fn update_ui(&mut self, print_data: bool) -> bool {
        self.sample_climate();
        if let Some(climate) = self.climate {
            let temperature = climate.temperature + self.snapshots.temperature_offset();
            self.board
                .set_text(Label::Temperature, &format_temperature(temperature));
            self.board
                .set_text(Label::Pressure, &format_pressure(climate.pressure));
            self.board
                .set_text(Label::Humidity, &format_humidity(climate.relative_humidity));
        }

        if let Some(position) = self.board.slider() {
            self.brightness.apply_slider(position);
        }

        let air = self.sample_air_quality();
        match &air {
            Some(reading) => {
                self.board
                    .set_text(Label::PmEnvData, &reading.env_concentration.summary());
                self.board
                    .set_text(Label::PmParticlesData, &reading.particles.summary());
            }
            None => warn!("[Sensors] Unable to read air quality data"),
        }
        // Stale PM values stay on screen, greyed out
        let color = label_color(air.is_some(), DATA_COLOR);
        self.board.set_text_color(Label::PmEnvData, color);
        self.board.set_text_color(Label::PmParticlesData, color);
        self.recent_air = air;

        self.show_status();
        self.refresh();

        let activity = self.board.any_button_pressed();
        let levels = self.brightness.update(activity, Instant::now());
        self.apply_brightness(levels);

        if print_data {
            self.dump_readings();
        }

        self.brightness.is_sleepy()
    }

    /// Fold the latest readings into the smoothed environment. A failed
    /// update keeps the previous state.
    fn update_environment(&mut self) -> bool {
        let snapshot =
            self.snapshots
                .build(self.climate.as_ref(), self.light, self.recent_air.as_ref());
        match self.environment.update(&snapshot) {
            Ok(_) => true,
            Err(e) => {
                error!("[Dashboard] Keeping previous environment: {}", e);
                false
            }
        }
    }

    async fn publish(&mut self) -> bool {
        let (Some(telemetry), Some(state)) = (self.telemetry.as_mut(), self.environment.current())
        else {
            return false;
        };

        self.board.set_led(true);
        let result = telemetry.publish_state(state).await;
        self.board.set_led(false);

        match result {
            Ok(()) => true,
            Err(DashboardError::NotConnected) => {
                debug!("[Dashboard] Not connected, skipping publish");
                false
            }
            Err(e) => {
                warn!("[Dashboard] Publish failed: {}", e);
                false
            }
        }
    }

    fn sample_climate(&mut self) {
        self.climate = match self.board.read_climate() {
            Ok(reading) => Some(reading),
            Err(e) => {
                warn!("[Sensors] {}", e);
                None
            }
        };
        self.light = match self.board.read_light() {
            Ok(light) => Some(light),
            Err(e) => {
                warn!("[Sensors] {}", e);
                None
            }
        };
    }

    fn sample_air_quality(&mut self) -> Option<AirQualityReading> {
        match self.board.read_air_quality() {
            Ok(reading) => Some(reading),
            Err(e) => {
                debug!("[Sensors] {}", e);
                None
            }
        }
    }

    fn show_status(&mut self) {
        let status = self
            .telemetry
            .as_ref()
            .map(|t| t.status())
            .unwrap_or_default();
        if self.shown_status != Some(status) {
            info!("[Dashboard] MQTT status: {:?}", status);
            self.board.set_status(status);
            self.shown_status = Some(status);
        }
    }

    fn refresh(&mut self) {
        if let Err(e) = self.board.refresh() {
            warn!("[Dashboard] Display refresh failed: {}", e);
        }
    }

    fn apply_brightness(&mut self, levels: BrightnessLevels) {
        self.board.set_dotstar_brightness(levels.dotstar);
        self.board.set_backlight(levels.backlight);
    }

    fn set_alarm(&mut self, on: bool) {
        if on == self.alarm {
            return;
        }
        self.alarm = on;
        if on {
            self.board.set_dotstars(ALARM_DOTSTARS);
            self.board.set_dotstar_brightness(ALARM_BRIGHTNESS);
        } else {
            self.board.set_dotstars(NORMAL_DOTSTARS);
            self.board.set_dotstar_brightness(self.brightness.levels().dotstar);
        }
    }

    fn dump_readings(&self) {
        match &self.climate {
            Some(c) => {
                let gas = match self.gas_baseline {
                    Some(baseline) => format!("{:.0} ({:.0}%)", c.gas, baseline.relative(c.gas)),
                    None => format!("{:.0}", c.gas),
                };
                info!(
                    "[Sensors] bme680 temp {:.2} pres {:.2} humid {:.2} gas {} alt {:.1}",
                    c.temperature, c.pressure, c.relative_humidity, gas, c.altitude
                );
            }
            None => info!("[Sensors] bme680 unavailable"),
        }
        if let Some(light) = self.light {
            info!("[Sensors] light {:.0}", light);
        }
        if let Some(air) = &self.recent_air {
            match serde_json::to_string(air) {
                Ok(json) => info!("[Sensors] air quality {}", json),
                Err(e) => warn!("[Sensors] Could not format air quality: {}", e),
            }
        }
    }
}
