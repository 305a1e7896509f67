//! Scripted ports, sinks and delays shared by the integration tests.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    future::Future,
    rc::Rc,
};

use embassy_futures::{
    block_on,
    select::{select, Either},
    yield_now,
};
use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use sensor_supervisor::{
    drivers::{ds18x20::crc8, OneWireBus},
    Address, CallbackError, CallbackSink, Measurement, MeasurementKind, RawSensorPort, Reading,
    SensorError, MAX_ADDRESSES,
};

// ============================================================================
// Delay
// ============================================================================

/// Records every requested sleep in milliseconds and yields once instead of sleeping.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    pub sleeps: Rc<RefCell<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn sleeps(&self) -> Vec<u32> {
        self.sleeps.borrow().clone()
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.sleeps.borrow_mut().push(ns / 1_000_000);
        yield_now().await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.sleeps.borrow_mut().push(ms);
        yield_now().await;
    }
}

// ============================================================================
// Ports
// ============================================================================

pub type Step = Result<Measurement, SensorError>;

/// Answers `read_value` calls from a queue; an exhausted script times out.
#[derive(Clone, Default)]
pub struct Script {
    steps: Rc<RefCell<VecDeque<Step>>>,
    reads: Rc<RefCell<Vec<Address>>>,
    begins: Rc<Cell<u32>>,
}

impl Script {
    pub fn push(&self, step: Step) -> &Self {
        self.steps.borrow_mut().push_back(step);
        self
    }

    pub fn reads(&self) -> Vec<Address> {
        self.reads.borrow().clone()
    }

    pub fn begins(&self) -> u32 {
        self.begins.get()
    }

    fn begin(&self) {
        self.begins.set(self.begins.get() + 1);
    }

    fn next(&self, address: Address) -> Step {
        self.reads.borrow_mut().push(address);
        self.steps
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(SensorError::Timeout))
    }
}

/// Dedicated-pin humidity/temperature sensor.
pub struct PinSensor(pub Script);

impl RawSensorPort for PinSensor {
    const KIND: MeasurementKind = MeasurementKind::TemperatureHumidity;

    async fn begin_measurement(&mut self) -> Result<(), SensorError> {
        self.0.begin();
        Ok(())
    }

    async fn read_value(&mut self, address: Address) -> Result<Measurement, SensorError> {
        self.0.next(address)
    }
}

/// Temperature-only probes sharing a bus, with a conversion settle time.
pub struct ProbeBus(pub Script);

impl RawSensorPort for ProbeBus {
    const KIND: MeasurementKind = MeasurementKind::Temperature;
    const SETTLE_TIME: Duration = Duration::from_millis(750);

    async fn begin_measurement(&mut self) -> Result<(), SensorError> {
        self.0.begin();
        Ok(())
    }

    async fn read_value(&mut self, address: Address) -> Result<Measurement, SensorError> {
        self.0.next(address)
    }
}

pub fn temperature(celsius: f32) -> Step {
    Ok(Measurement::Temperature(celsius))
}

pub fn climate(celsius: f32, humidity: f32) -> Step {
    Ok(Measurement::TemperatureHumidity {
        temperature: celsius,
        humidity,
    })
}

pub fn probe(serial: u8) -> Address {
    Address::from_rom(rom(serial))
}

/// DS18B20 ROM code with a valid CRC.
pub fn rom(serial: u8) -> [u8; 8] {
    let mut rom = [0x28, serial, 0x4c, 0x01, 0x16, 0x04, 0x00, 0x00];
    rom[7] = crc8(&rom[..7]);
    rom
}

/// DS18B20 scratchpad (12-bit) holding `sixteenths` / 16 °C.
pub fn scratchpad(sixteenths: i16) -> [u8; 9] {
    let [lsb, msb] = sixteenths.to_le_bytes();
    let mut scratchpad = [lsb, msb, 0x4b, 0x46, 0x7f, 0xff, 0x0c, 0x10, 0x00];
    scratchpad[8] = crc8(&scratchpad[..8]);
    scratchpad
}

/// In-memory 1-Wire bus. Search results can be swapped between scans.
#[derive(Clone, Default)]
pub struct FakeOneWire {
    pub present: Rc<RefCell<Vec<[u8; 8]>>>,
    pub scratchpads: Rc<RefCell<HashMap<[u8; 8], [u8; 9]>>>,
    pub conversions: Rc<Cell<u32>>,
}

impl FakeOneWire {
    pub fn attach(&self, rom: [u8; 8], scratchpad: [u8; 9]) {
        self.present.borrow_mut().push(rom);
        self.scratchpads.borrow_mut().insert(rom, scratchpad);
    }
}

impl OneWireBus for FakeOneWire {
    async fn search(&mut self) -> Result<heapless::Vec<[u8; 8], MAX_ADDRESSES>, SensorError> {
        heapless::Vec::from_slice(&self.present.borrow()).map_err(|_| SensorError::Other("full"))
    }

    async fn convert_all(&mut self) -> Result<(), SensorError> {
        self.conversions.set(self.conversions.get() + 1);
        Ok(())
    }

    async fn read_scratchpad(&mut self, rom: [u8; 8]) -> Result<[u8; 9], SensorError> {
        self.scratchpads
            .borrow()
            .get(&rom)
            .copied()
            .ok_or(SensorError::NoResponse)
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// Direct-only sink: relies on the supervisor falling back to `handle_sync`.
#[derive(Clone, Default)]
pub struct SyncSink {
    pub received: Rc<RefCell<Vec<Reading>>>,
}

impl CallbackSink for SyncSink {
    fn handle_sync(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        self.received.borrow_mut().push(reading.clone());
        Ok(())
    }
}

/// Suspend-capable sink that also counts direct invocations.
#[derive(Clone, Default)]
pub struct AwaitingSink {
    pub received: Rc<RefCell<Vec<Reading>>>,
    pub direct_calls: Rc<Cell<u32>>,
}

impl CallbackSink for AwaitingSink {
    async fn handle(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        yield_now().await;
        self.received.borrow_mut().push(reading.clone());
        Ok(())
    }

    fn handle_sync(&mut self, _reading: &Reading) -> Result<(), CallbackError> {
        self.direct_calls.set(self.direct_calls.get() + 1);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FailingSink {
    pub attempts: Rc<Cell<u32>>,
}

impl CallbackSink for FailingSink {
    fn handle_sync(&mut self, _reading: &Reading) -> Result<(), CallbackError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(CallbackError::Failed("display offline"))
    }
}

// ============================================================================
// Driving
// ============================================================================

/// Poll `task` (a supervisor's never-ending `run`) until `done` holds.
pub fn run_until<F>(task: F, mut done: impl FnMut() -> bool)
where
    F: Future<Output = ()>,
{
    block_on(async {
        let watcher = async {
            while !done() {
                yield_now().await;
            }
        };
        match select(task, watcher).await {
            Either::First(()) => panic!("supervisor returned"),
            Either::Second(()) => {}
        }
    })
}

pub fn assert_close(actual: impl IntoIterator<Item = f32>, expected: &[f32]) {
    let actual: Vec<f32> = actual.into_iter().collect();
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-3, "{actual:?} vs {expected:?}");
    }
}
