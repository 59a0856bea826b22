//! Local dashboard display.
//!
//! The screen shows a fixed set of text labels, a round MQTT status indicator
//! and a strip of five dotstar LEDs. Drawing is done by whatever implements
//! [`Display`]; this module owns layout, colours and brightness policy.

pub mod brightness;
pub mod layout;

pub use brightness::{BrightnessController, BrightnessLevels};
pub use layout::{Label, format_humidity, format_pressure, format_temperature};

use crate::error::Result;

/// Grey used for labels whose condition is off.
pub const DIMMED_LABEL_COLOR: u32 = 0x606060;

/// Dotstar colours in normal operation.
pub const NORMAL_DOTSTARS: [u32; 5] = [0x800000, 0x808000, 0x008000, 0x000080, 0x800080];

/// Dotstar colours while the alarm is raised.
pub const ALARM_DOTSTARS: [u32; 5] = [0x800000; 5];

/// Dotstar brightness while the alarm is raised.
pub const ALARM_BRIGHTNESS: f64 = 0.5;

/// MQTT connection state shown by the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    /// Indicator fill colour.
    pub fn fill(self) -> u32 {
        match self {
            ConnectionStatus::Connected => 0x00FF00,
            ConnectionStatus::Disconnected => 0xFF0000,
        }
    }

    /// Indicator outline colour.
    pub fn outline(self) -> u32 {
        match self {
            ConnectionStatus::Connected => 0x008800,
            ConnectionStatus::Disconnected => 0x880000,
        }
    }
}

/// Label colour for a boolean condition: `on_color` when set, grey otherwise.
pub fn label_color(conditional: bool, on_color: u32) -> u32 {
    if conditional {
        on_color
    } else {
        DIMMED_LABEL_COLOR
    }
}

/// Drawing surface of the dashboard.
///
/// Setters only stage changes; nothing is visible until [`Display::refresh`].
pub trait Display {
    fn set_text(&mut self, label: Label, text: &str);
    fn set_text_color(&mut self, label: Label, color: u32);
    fn set_status(&mut self, status: ConnectionStatus);
    fn set_backlight(&mut self, brightness: f64);
    fn set_dotstar_brightness(&mut self, brightness: f64);
    fn set_dotstars(&mut self, colors: [u32; 5]);
    /// Red LED lit while publishing.
    fn set_led(&mut self, on: bool);
    fn refresh(&mut self) -> Result<()>;
}
