//! Cooperative polling supervisors for temperature and humidity sensors.
//!
//! A [`PollSupervisor`] drives one sensor forever: trigger a measurement, validate it,
//! convert it to the configured unit, store it in a [`ReadingCache`] and hand it to a
//! [`CallbackSink`]. Failed cycles are logged and retried on the next interval.
//!
//! Sensors sharing a bus (1-Wire probes) are found by a [`DiscoverySupervisor`], which
//! publishes a fresh [`AddressList`] into an [`AddressBook`] on every scan.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod address;
pub mod cache;
pub mod config;
pub mod convert;
pub mod discovery;
pub mod drivers;
pub mod error;
pub mod poll;
pub mod port;
pub mod reading;
pub mod sink;

pub use address::{Address, AddressBook, AddressList, MAX_ADDRESSES};
pub use cache::{PollStats, ReadingCache};
pub use config::{DiscoveryConfig, PollConfig};
pub use convert::{celsius_to_fahrenheit, fahrenheit_to_celsius, TemperatureUnit};
pub use discovery::DiscoverySupervisor;
pub use error::{CallbackError, CycleError, SensorError, ValidationError};
pub use poll::{Outcome, PollSupervisor};
pub use port::{BusScan, Measurement, MeasurementKind, RawSensorPort, SharedBus};
pub use reading::{Label, Reading, Sample};
pub use sink::{CallbackSink, FnSink, LogSink};
