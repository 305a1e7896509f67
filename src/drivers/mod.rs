//! Sensor family adapters.
//!
//! Each adapter turns a family's raw wire data into [`Measurement`](crate::Measurement)s
//! and implements [`RawSensorPort`](crate::RawSensorPort) on top of a small transport
//! trait. The transport (pulse timing, 1-Wire reset and search) is left to the HAL.

pub mod dht;
pub mod ds18x20;

pub use dht::{Dht, DhtFamily, DhtTransport};
pub use ds18x20::{Ds18x20, OneWireBus};
