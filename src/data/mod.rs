//! Decoded sensor data types.

pub mod reading;

pub use reading::TemperatureReading;
