//! Label layout and text formatting.

use strum::{EnumIter, IntoStaticStr};

/// Header label colour.
pub const HEADER_COLOR: u32 = 0xFF00FF;

/// Data label colour.
pub const DATA_COLOR: u32 = 0xFFDDFF;

/// Dashboard text lines, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Label {
    Temperature,
    Pressure,
    Humidity,
    PmEnvHeader,
    PmEnvData,
    PmParticlesHeader,
    PmParticlesData,
}

impl Label {
    /// Zero-based line number.
    pub fn line(self) -> i32 {
        self as i32
    }

    /// Vertical position in pixels.
    pub fn y(self) -> i32 {
        5 + self.line() * 15
    }

    /// Horizontal position in pixels. Data lines are indented.
    pub fn x(self) -> i32 {
        match self {
            Label::PmEnvData => 30,
            Label::PmParticlesData => 15,
            _ => 5,
        }
    }

    /// Text shown before the first reading arrives.
    pub fn initial_text(self) -> &'static str {
        match self {
            Label::Temperature => "Temp:",
            Label::Pressure => "Pres:",
            Label::Humidity => "Humidity:",
            Label::PmEnvHeader => "PM1.0/2.5/10 units: ",
            Label::PmParticlesHeader => "PM.3/.5/1/2.5/5./10",
            Label::PmEnvData | Label::PmParticlesData => "",
        }
    }

    pub fn initial_color(self) -> u32 {
        match self {
            Label::PmEnvData | Label::PmParticlesData => DATA_COLOR,
            _ => HEADER_COLOR,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

pub fn format_temperature(celsius: f64) -> String {
    format!("Temp: {:.1}C", celsius)
}

/// Pressure is shown in whole hectopascal, truncated.
pub fn format_pressure(hpa: f64) -> String {
    format!("Pres: {}hPa", hpa.trunc() as i64)
}

pub fn format_humidity(percent: f64) -> String {
    format!("Humid: {}%", percent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_line_positions() {
        let ys: Vec<i32> = Label::iter().map(Label::y).collect();
        assert_eq!(ys, vec![5, 20, 35, 50, 65, 80, 95]);
        assert_eq!(Label::PmEnvData.x(), 30);
        assert_eq!(Label::PmParticlesData.x(), 15);
        assert_eq!(Label::Humidity.x(), 5);
    }

    #[test]
    fn test_label_names() {
        assert_eq!(Label::PmEnvHeader.name(), "pm_env_header");
        assert_eq!(Label::Temperature.name(), "temperature");
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_temperature(21.456), "Temp: 21.5C");
        assert_eq!(format_pressure(1013.9), "Pres: 1013hPa");
        assert_eq!(format_humidity(40.5), "Humid: 40.5%");
    }

    #[test]
    fn test_initial_colors() {
        assert_eq!(Label::PmEnvHeader.initial_color(), HEADER_COLOR);
        assert_eq!(Label::PmParticlesData.initial_color(), DATA_COLOR);
    }
}
