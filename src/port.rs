//! Boundary to the hardware.
//!
//! The supervisors never talk to pins or buses directly. They drive a [`RawSensorPort`]
//! for measurements and a [`BusScan`] for discovery; adapters in [`crate::drivers`]
//! implement both on top of a sensor family's wire transport.

#![allow(async_fn_in_trait)]

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::Duration;

use crate::{
    address::{Address, AddressList},
    error::SensorError,
};

/// Shape of the values a sensor family produces per address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementKind {
    Temperature,
    TemperatureHumidity,
}

impl MeasurementKind {
    /// Number of values per address.
    pub const fn arity(self) -> usize {
        match self {
            Self::Temperature => 1,
            Self::TemperatureHumidity => 2,
        }
    }
}

/// Raw values for one address, temperatures in Celsius.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Measurement {
    Temperature(f32),
    TemperatureHumidity { temperature: f32, humidity: f32 },
}

impl Measurement {
    pub const fn kind(&self) -> MeasurementKind {
        match self {
            Self::Temperature(_) => MeasurementKind::Temperature,
            Self::TemperatureHumidity { .. } => MeasurementKind::TemperatureHumidity,
        }
    }
}

/// One sensor family's measurement primitive.
pub trait RawSensorPort {
    /// What [`read_value`](RawSensorPort::read_value) is expected to return.
    const KIND: MeasurementKind;

    /// Time between triggering a conversion and the values becoming valid.
    const SETTLE_TIME: Duration = Duration::from_ticks(0);

    /// Start a conversion on every sensor behind this port.
    async fn begin_measurement(&mut self) -> Result<(), SensorError>;

    /// Fetch the converted values of one sensor.
    async fn read_value(&mut self, address: Address) -> Result<Measurement, SensorError>;
}

/// Enumeration of the sensors attached to a shared bus.
pub trait BusScan {
    async fn enumerate_addresses(&mut self) -> Result<AddressList, SensorError>;
}

impl<T: RawSensorPort> RawSensorPort for &mut T {
    const KIND: MeasurementKind = T::KIND;
    const SETTLE_TIME: Duration = T::SETTLE_TIME;

    async fn begin_measurement(&mut self) -> Result<(), SensorError> {
        (**self).begin_measurement().await
    }

    async fn read_value(&mut self, address: Address) -> Result<Measurement, SensorError> {
        (**self).read_value(address).await
    }
}

impl<T: BusScan> BusScan for &mut T {
    async fn enumerate_addresses(&mut self) -> Result<AddressList, SensorError> {
        (**self).enumerate_addresses().await
    }
}

/// Handle to a bus owned by an async mutex, so the poll and discovery supervisors of the
/// same bus can each hold one.
///
/// Every call locks the bus for the duration of one transaction.
pub struct SharedBus<'a, T> {
    bus: &'a Mutex<CriticalSectionRawMutex, T>,
}

impl<'a, T> SharedBus<'a, T> {
    pub fn new(bus: &'a Mutex<CriticalSectionRawMutex, T>) -> Self {
        Self { bus }
    }
}

impl<T> Clone for SharedBus<'_, T> {
    fn clone(&self) -> Self {
        Self { bus: self.bus }
    }
}

impl<T: RawSensorPort> RawSensorPort for SharedBus<'_, T> {
    const KIND: MeasurementKind = T::KIND;
    const SETTLE_TIME: Duration = T::SETTLE_TIME;

    async fn begin_measurement(&mut self) -> Result<(), SensorError> {
        self.bus.lock().await.begin_measurement().await
    }

    async fn read_value(&mut self, address: Address) -> Result<Measurement, SensorError> {
        self.bus.lock().await.read_value(address).await
    }
}

impl<T: BusScan> BusScan for SharedBus<'_, T> {
    async fn enumerate_addresses(&mut self) -> Result<AddressList, SensorError> {
        self.bus.lock().await.enumerate_addresses().await
    }
}
