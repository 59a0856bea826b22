//! Idle dimming of the backlight and dotstars.

use std::time::{Duration, Instant};

/// Backlight and dotstar brightness, both in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightnessLevels {
    pub dotstar: f64,
    pub backlight: f64,
}

impl Default for BrightnessLevels {
    fn default() -> Self {
        Self {
            dotstar: 0.05,
            backlight: 0.50,
        }
    }
}

/// Dims the display after a period without button presses.
///
/// Once idle, every update lowers each level by a fixed fraction of its
/// default until it reaches zero. A button press restores the defaults.
#[derive(Debug, Clone)]
pub struct BrightnessController {
    defaults: BrightnessLevels,
    current: BrightnessLevels,
    idle_timeout: Duration,
    last_activity: Instant,
}

impl BrightnessController {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);
    /// Share of the default level removed per idle update.
    pub const DECAY_FRACTION: f64 = 0.05;
    /// Loop delay while the screen is dark.
    pub const SLEEPY_INTERVAL: Duration = Duration::from_secs(2);
    /// Loop delay while the screen is lit.
    pub const AWAKE_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(defaults: BrightnessLevels, idle_timeout: Duration, now: Instant) -> Self {
        Self {
            defaults,
            current: defaults,
            idle_timeout,
            last_activity: now,
        }
    }

    pub fn levels(&self) -> BrightnessLevels {
        self.current
    }

    /// The slider sets the dotstar brightness directly.
    pub fn apply_slider(&mut self, position: f64) {
        if position.is_finite() {
            self.current.dotstar = position.clamp(0.0, 1.0);
        }
    }

    /// Advance one update. `activity` is true when a button is held.
    pub fn update(&mut self, activity: bool, now: Instant) -> BrightnessLevels {
        if activity {
            self.last_activity = now;
            self.current = self.defaults;
        } else if now.saturating_duration_since(self.last_activity) > self.idle_timeout {
            self.current.dotstar =
                decay(self.current.dotstar, self.defaults.dotstar * Self::DECAY_FRACTION);
            self.current.backlight =
                decay(self.current.backlight, self.defaults.backlight * Self::DECAY_FRACTION);
        }
        self.current
    }

    /// True once the backlight has faded out completely.
    pub fn is_sleepy(&self) -> bool {
        self.current.backlight <= 0.0
    }

    pub fn sleep_interval(&self) -> Duration {
        if self.is_sleepy() {
            Self::SLEEPY_INTERVAL
        } else {
            Self::AWAKE_INTERVAL
        }
    }
}

fn decay(level: f64, step: f64) -> f64 {
    let next = level - step;
    // Repeated float subtraction can stop just above zero.
    if next <= step * 1e-6 { 0.0 } else { next }
}
