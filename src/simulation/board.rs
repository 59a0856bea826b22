//! In-process stand-in for the dashboard hardware.

use crate::board::Power;
use crate::display::{BrightnessLevels, ConnectionStatus, Display, Label, NORMAL_DOTSTARS};
use crate::error::{DashboardError, Result};
use crate::sensors::{
    AirQualityReading, AirQualitySensor, ClimateReading, ClimateSensor, ConcentrationUnits,
    Controls, LightSensor, Particles, SensorError,
};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strum::IntoEnumIterator;

/// Shared handle to a simulated board's state.
pub type BoardHandle = Arc<Mutex<BoardState>>;

/// Inputs and staged outputs of the simulated board.
///
/// Tests and the activity simulation mutate the inputs through a
/// [`BoardHandle`] while the dashboard owns the board itself.
#[derive(Debug, Clone)]
pub struct BoardState {
    // Inputs
    pub climate: ClimateReading,
    pub light: f64,
    pub air: AirQualityReading,
    /// Relative noise applied to every reading, e.g. 0.01 for ±1 %.
    pub jitter: f64,
    pub climate_fails: bool,
    pub air_fails: bool,
    pub sleep_fails: bool,
    pub display_fails: bool,
    pub buttons_pressed: bool,
    pub slider: Option<f64>,
    /// Actually wait in `light_sleep`; tests turn this off.
    pub real_sleep: bool,

    // Outputs
    pub texts: HashMap<Label, String>,
    pub colors: HashMap<Label, u32>,
    pub status: ConnectionStatus,
    /// Fill and outline of the drawn status indicator.
    pub status_colors: (u32, u32),
    pub brightness: BrightnessLevels,
    pub dotstars: [u32; 5],
    pub led: bool,
    pub led_flashes: u32,
    pub refreshes: u64,
    /// Text drawn by the last refresh as `(x, y, text)`, top to bottom.
    pub frame: Vec<(i32, i32, String)>,
    pub sleeps: Vec<Duration>,
}

impl Default for BoardState {
    fn default() -> Self {
        Self {
            climate: ClimateReading {
                temperature: 26.5,
                pressure: 1013.25,
                relative_humidity: 40.0,
                gas: 50_000.0,
                altitude: 0.0,
            },
            light: 250.0,
            air: AirQualityReading {
                std_concentration: ConcentrationUnits {
                    pm10um: 3,
                    pm25um: 5,
                    pm100um: 6,
                },
                env_concentration: ConcentrationUnits {
                    pm10um: 3,
                    pm25um: 5,
                    pm100um: 6,
                },
                particles: Particles {
                    p03um: 600,
                    p05um: 180,
                    p10um: 30,
                    p25um: 4,
                    p50um: 1,
                    p100um: 0,
                },
            },
            jitter: 0.01,
            climate_fails: false,
            air_fails: false,
            sleep_fails: false,
            display_fails: false,
            buttons_pressed: false,
            slider: None,
            real_sleep: true,
            texts: HashMap::new(),
            colors: HashMap::new(),
            status: ConnectionStatus::Disconnected,
            status_colors: (
                ConnectionStatus::Disconnected.fill(),
                ConnectionStatus::Disconnected.outline(),
            ),
            brightness: BrightnessLevels::default(),
            dotstars: NORMAL_DOTSTARS,
            led: false,
            led_flashes: 0,
            refreshes: 0,
            frame: Vec::new(),
            sleeps: Vec::new(),
        }
    }
}

impl BoardState {
    /// Screen contents as text lines, top to bottom.
    pub fn screen(&self) -> Vec<String> {
        Label::iter()
            .map(|label| self.texts.get(&label).cloned().unwrap_or_default())
            .collect()
    }

    /// Lay out the non-empty labels at their screen positions.
    fn render(&self) -> Vec<(i32, i32, String)> {
        Label::iter()
            .filter_map(|label| {
                let text = self.texts.get(&label).filter(|t| !t.is_empty())?;
                Some((label.x(), label.y(), text.clone()))
            })
            .collect()
    }
}

/// Simulated board with noisy sensors and a recorded display.
pub struct SimulatedBoard {
    state: BoardHandle,
    rng: StdRng,
}

impl SimulatedBoard {
    pub fn new(seed: u64) -> Self {
        Self::with_state(BoardState::default(), seed)
    }

    pub fn with_state(state: BoardState, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn handle(&self) -> BoardHandle {
        self.state.clone()
    }

    fn noisy(&mut self, value: f64, jitter: f64) -> f64 {
        if jitter <= 0.0 {
            return value;
        }
        value * (1.0 + self.rng.gen_range(-jitter..=jitter))
    }

    fn noisy_count(&mut self, value: u16, jitter: f64) -> u16 {
        self.noisy(f64::from(value), jitter).round().clamp(0.0, f64::from(u16::MAX)) as u16
    }
}

impl ClimateSensor for SimulatedBoard {
    fn read_climate(&mut self) -> std::result::Result<ClimateReading, SensorError> {
        let (base, jitter, fails) = {
            let state = self.state.lock();
            (state.climate, state.jitter, state.climate_fails)
        };
        if fails {
            return Err(SensorError::read_failed("bme680", "no response on I2C"));
        }
        Ok(ClimateReading {
            temperature: self.noisy(base.temperature, jitter),
            pressure: self.noisy(base.pressure, jitter),
            relative_humidity: self.noisy(base.relative_humidity, jitter),
            gas: self.noisy(base.gas, jitter),
            altitude: base.altitude,
        })
    }
}

impl LightSensor for SimulatedBoard {
    fn read_light(&mut self) -> std::result::Result<f64, SensorError> {
        let (light, jitter) = {
            let state = self.state.lock();
            (state.light, state.jitter)
        };
        Ok(self.noisy(light, jitter))
    }
}

impl AirQualitySensor for SimulatedBoard {
    fn read_air_quality(&mut self) -> std::result::Result<AirQualityReading, SensorError> {
        let (air, jitter, fails) = {
            let state = self.state.lock();
            (state.air, state.jitter, state.air_fails)
        };
        if fails {
            return Err(SensorError::read_failed("pm25", "checksum mismatch"));
        }
        let units = |board: &mut Self, u: ConcentrationUnits| ConcentrationUnits {
            pm10um: board.noisy_count(u.pm10um, jitter),
            pm25um: board.noisy_count(u.pm25um, jitter),
            pm100um: board.noisy_count(u.pm100um, jitter),
        };
        let p = air.particles;
        Ok(AirQualityReading {
            std_concentration: units(self, air.std_concentration),
            env_concentration: units(self, air.env_concentration),
            particles: Particles {
                p03um: self.noisy_count(p.p03um, jitter),
                p05um: self.noisy_count(p.p05um, jitter),
                p10um: self.noisy_count(p.p10um, jitter),
                p25um: self.noisy_count(p.p25um, jitter),
                p50um: self.noisy_count(p.p50um, jitter),
                p100um: self.noisy_count(p.p100um, jitter),
            },
        })
    }
}

impl Controls for SimulatedBoard {
    fn any_button_pressed(&mut self) -> bool {
        self.state.lock().buttons_pressed
    }

    fn slider(&mut self) -> Option<f64> {
        self.state.lock().slider
    }
}

impl Display for SimulatedBoard {
    fn set_text(&mut self, label: Label, text: &str) {
        self.state.lock().texts.insert(label, text.to_string());
    }

    fn set_text_color(&mut self, label: Label, color: u32) {
        self.state.lock().colors.insert(label, color);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        let mut state = self.state.lock();
        state.status = status;
        state.status_colors = (status.fill(), status.outline());
    }

    fn set_backlight(&mut self, brightness: f64) {
        self.state.lock().brightness.backlight = brightness;
    }

    fn set_dotstar_brightness(&mut self, brightness: f64) {
        self.state.lock().brightness.dotstar = brightness;
    }

    fn set_dotstars(&mut self, colors: [u32; 5]) {
        self.state.lock().dotstars = colors;
    }

    fn set_led(&mut self, on: bool) {
        let mut state = self.state.lock();
        if on && !state.led {
            state.led_flashes += 1;
        }
        state.led = on;
    }

    fn refresh(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.display_fails {
            return Err(DashboardError::Display("SPI write timed out".to_string()));
        }
        state.refreshes += 1;
        state.frame = state.render();
        debug!("[Sim] Screen: {}", state.screen().join(" | "));
        Ok(())
    }
}

#[async_trait]
impl Power for SimulatedBoard {
    async fn light_sleep(&mut self, duration: Duration) -> Result<()> {
        let real_sleep = {
            let mut state = self.state.lock();
            state.sleeps.push(duration);
            if state.sleep_fails {
                return Err(DashboardError::Sleep("wake alarm not armed".to_string()));
            }
            state.real_sleep
        };
        if real_sleep {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_without_jitter_are_exact() {
        let mut board = SimulatedBoard::with_state(
            BoardState {
                jitter: 0.0,
                ..BoardState::default()
            },
            1,
        );
        let climate = board.read_climate().unwrap();
        assert_eq!(climate.temperature, 26.5);
        assert_eq!(board.read_light().unwrap(), 250.0);
        assert_eq!(board.read_air_quality().unwrap().particles.p03um, 600);
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut board = SimulatedBoard::new(7);
        for _ in 0..100 {
            let t = board.read_climate().unwrap().temperature;
            assert!((t - 26.5).abs() <= 26.5 * 0.01 + 1e-9);
        }
    }

    #[test]
    fn test_failures_are_reported() {
        let mut board = SimulatedBoard::new(1);
        board.handle().lock().air_fails = true;
        board.handle().lock().climate_fails = true;
        assert!(board.read_air_quality().is_err());
        assert!(board.read_climate().is_err());
    }

    #[test]
    fn test_display_outputs_are_recorded() {
        let mut board = SimulatedBoard::new(1);
        board.set_text(Label::Temperature, "Temp: 21.0C");
        board.set_led(true);
        board.set_led(true);
        board.set_led(false);
        board.refresh().unwrap();

        let handle = board.handle();
        let state = handle.lock();
        assert_eq!(state.screen()[0], "Temp: 21.0C");
        assert_eq!(state.led_flashes, 1);
        assert_eq!(state.refreshes, 1);
    }

    #[test]
    fn test_refresh_lays_out_labels() {
        let mut board = SimulatedBoard::new(1);
        board.set_text(Label::Temperature, "Temp: 21.0C");
        board.set_text(Label::PmEnvData, "3/5/6");
        board.refresh().unwrap();

        assert_eq!(
            board.handle().lock().frame,
            vec![
                (5, 5, "Temp: 21.0C".to_string()),
                (30, 65, "3/5/6".to_string()),
            ]
        );
    }

    #[test]
    fn test_status_indicator_colors() {
        let mut board = SimulatedBoard::new(1);
        assert_eq!(board.handle().lock().status_colors, (0xFF0000, 0x880000));
        board.set_status(ConnectionStatus::Connected);
        assert_eq!(board.handle().lock().status_colors, (0x00FF00, 0x008800));
    }

    #[test]
    fn test_failed_refresh_is_reported() {
        let mut board = SimulatedBoard::new(1);
        board.handle().lock().display_fails = true;
        assert!(matches!(board.refresh(), Err(DashboardError::Display(_))));
        assert_eq!(board.handle().lock().refreshes, 0);
    }

    #[test]
    fn test_failed_sleep_is_recorded() {
        let mut board = SimulatedBoard::new(1);
        {
            let handle = board.handle();
            let mut state = handle.lock();
            state.real_sleep = false;
            state.sleep_fails = true;
        }
        let result = tokio_test::block_on(board.light_sleep(Duration::from_millis(100)));
        assert!(matches!(result, Err(DashboardError::Sleep(_))));
        assert_eq!(board.handle().lock().sleeps, vec![Duration::from_millis(100)]);
    }
}
