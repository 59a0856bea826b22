//! Funhouse environment dashboard library.
//!
//! Samples climate, light and air-quality sensors, shows them on a local
//! display with idle dimming, and publishes an exponentially smoothed snapshot
//! of the environment over MQTT.

pub mod board;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod instance_lock;
pub mod sensors;
pub mod simulation;
pub mod state;
pub mod telemetry;
