use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use heapless::Vec;

use crate::{
    address::{Address, AddressBook},
    cache::ReadingCache,
    config::PollConfig,
    error::{CallbackError, CycleError, ValidationError},
    port::{Measurement, RawSensorPort},
    reading::{Label, Reading, Sample, MAX_SAMPLES},
    sink::{CallbackSink, LogSink},
};

/// What a successful [`PollSupervisor::cycle`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// No address published, nothing read.
    Idle,
    /// Reading stored and handed to the sink.
    Delivered,
    /// Reading stored, but the sink failed.
    CallbackFailed(CallbackError),
}

/// Drives the measure, validate, convert, store, deliver cycle of one sensor (or one
/// bus of sensors) for as long as it is polled.
///
/// Every failure is contained in the cycle it happens in: it is logged, counted in the
/// cache's [`PollStats`](crate::PollStats), and the next cycle starts after the usual
/// interval.
pub struct PollSupervisor<'a, P, D, S = LogSink> {
    port: P,
    delay: D,
    sink: S,
    config: PollConfig,
    addresses: &'a AddressBook,
    cache: &'a ReadingCache,
}

impl<'a, P, D> PollSupervisor<'a, P, D>
where
    P: RawSensorPort,
    D: DelayNs,
{
    pub fn new(
        port: P,
        delay: D,
        addresses: &'a AddressBook,
        cache: &'a ReadingCache,
        config: PollConfig,
    ) -> Self {
        Self {
            port,
            delay,
            sink: LogSink,
            config,
            addresses,
            cache,
        }
    }
}

impl<'a, P, D, S> PollSupervisor<'a, P, D, S>
where
    P: RawSensorPort,
    D: DelayNs,
    S: CallbackSink,
{
    /// Replace the sink readings are delivered to.
    pub fn with_sink<T: CallbackSink>(self, sink: T) -> PollSupervisor<'a, P, D, T> {
        PollSupervisor {
            port: self.port,
            delay: self.delay,
            sink,
            config: self.config,
            addresses: self.addresses,
            cache: self.cache,
        }
    }

    pub fn cache(&self) -> &'a ReadingCache {
        self.cache
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll forever, sleeping `interval` (or the configured interval) between cycles.
    pub async fn run(&mut self, interval: Option<Duration>) {
        let interval = interval.unwrap_or(self.config.interval());
        info!(
            "Polling {} sensor(s) every {} ms",
            self.addresses.len(),
            interval.as_millis()
        );

        loop {
            if let Err(e) = self.cycle().await {
                error!("Sensor cycle failed: {:?}", e);
            }
            self.delay.delay_ms(as_millis(interval)).await;
        }
    }

    /// One cycle without the trailing sleep.
    ///
    /// On error the cache keeps its previous reading, unless the address layout has
    /// changed since it was taken, in which case the stale reading is dropped.
    pub async fn cycle(&mut self) -> Result<Outcome, CycleError> {
        let result = self.run_cycle().await;
        self.cache.record(|stats| stats.cycles = stats.cycles.wrapping_add(1));
        result
    }

    async fn run_cycle(&mut self) -> Result<Outcome, CycleError> {
        let snapshot = self.addresses.snapshot();
        if snapshot.addresses.is_empty() {
            trace!("No sensor addresses published, skipping cycle");
            self.cache.record(|stats| stats.idle = stats.idle.wrapping_add(1));
            return Ok(Outcome::Idle);
        }

        let reading = match self.measure(&snapshot.addresses).await {
            Ok(reading) => reading,
            Err(e) => {
                self.cache.record(|stats| {
                    let counter = match e {
                        CycleError::Read(_) => &mut stats.read_failures,
                        CycleError::Validation(_) => &mut stats.validation_failures,
                    };
                    *counter = counter.wrapping_add(1);
                    stats.consecutive_failures = stats.consecutive_failures.saturating_add(1);
                });
                let stale = self
                    .cache
                    .latest()
                    .is_some_and(|cached| cached.sensor_count() != snapshot.addresses.len());
                if stale {
                    self.cache.invalidate();
                }
                return Err(e);
            }
        };

        self.cache.store(reading.clone());

        match self.deliver(&reading).await {
            Ok(()) => {
                self.cache.record(|stats| stats.delivered = stats.delivered.wrapping_add(1));
                Ok(Outcome::Delivered)
            }
            Err(e) => {
                warn!("Reading callback failed: {:?}", e);
                self.cache.record(|stats| {
                    stats.callback_failures = stats.callback_failures.wrapping_add(1)
                });
                Ok(Outcome::CallbackFailed(e))
            }
        }
    }

    async fn measure(&mut self, addresses: &[Address]) -> Result<Reading, CycleError> {
        self.port.begin_measurement().await?;
        if P::SETTLE_TIME.as_ticks() > 0 {
            self.delay.delay_ms(as_millis(P::SETTLE_TIME)).await;
        }

        // One sample per value, so `Measurement` and the kind check fix the arity.
        let unit = self.config.unit();
        let mut samples: Vec<Sample, MAX_SAMPLES> = Vec::new();

        for &address in addresses {
            let measurement = self.port.read_value(address).await?;
            if measurement.kind() != P::KIND {
                return Err(ValidationError::WrongKind {
                    expected: P::KIND,
                    found: measurement.kind(),
                }
                .into());
            }

            let (temperature, humidity) = match measurement {
                Measurement::Temperature(temperature) => (temperature, None),
                Measurement::TemperatureHumidity {
                    temperature,
                    humidity,
                } => (temperature, Some(humidity)),
            };
            if !temperature.is_finite() || humidity.is_some_and(|h| !h.is_finite()) {
                return Err(ValidationError::NotFinite.into());
            }

            // Capacity covers two samples for every address a list can hold.
            let _ = samples.push(Sample {
                address,
                label: Label::Temperature,
                value: unit.from_celsius(temperature),
            });
            if let Some(humidity) = humidity {
                let _ = samples.push(Sample {
                    address,
                    label: Label::Humidity,
                    value: humidity,
                });
            }
        }

        Ok(Reading::new(unit, samples))
    }

    async fn deliver(&mut self, reading: &Reading) -> Result<(), CallbackError> {
        match self.sink.handle(reading).await {
            Err(CallbackError::NotSuspendable) => self.sink.handle_sync(reading),
            result => result,
        }
    }
}

/// Whole milliseconds for `DelayNs::delay_ms`, never less than one so a loop always
/// yields to the timer.
pub(crate) fn as_millis(duration: Duration) -> u32 {
    duration.as_millis().try_into().unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use embassy_futures::{
        block_on,
        select::{select, Either},
        yield_now,
    };

    use super::*;
    use crate::{convert::TemperatureUnit, error::SensorError, port::MeasurementKind};

    struct Probe(Result<f32, SensorError>);

    impl RawSensorPort for Probe {
        const KIND: MeasurementKind = MeasurementKind::Temperature;

        async fn begin_measurement(&mut self) -> Result<(), SensorError> {
            Ok(())
        }

        async fn read_value(&mut self, _address: Address) -> Result<Measurement, SensorError> {
            self.0.map(Measurement::Temperature)
        }
    }

    struct Sleeps<'a>(&'a RefCell<std::vec::Vec<u32>>);

    impl DelayNs for Sleeps<'_> {
        async fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(ns / 1_000_000);
            yield_now().await;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(ms);
            yield_now().await;
        }
    }

    fn probes(count: u8) -> AddressBook {
        let book = AddressBook::new();
        book.publish((1..=count).map(|serial| Address::Rom(u64::from(serial))).collect());
        book
    }

    #[test]
    fn counters_wrap_instead_of_overflowing() {
        let sleeps = RefCell::default();
        let addresses = probes(1);
        let cache = ReadingCache::new();
        let config = PollConfig::default().with_unit(TemperatureUnit::Celsius);
        cache.record(|stats| {
            stats.cycles = u32::MAX;
            stats.delivered = u32::MAX;
        });

        let mut supervisor =
            PollSupervisor::new(Probe(Ok(20.0)), Sleeps(&sleeps), &addresses, &cache, config);
        assert_eq!(block_on(supervisor.cycle()), Ok(Outcome::Delivered));
        let stats = cache.stats();
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.delivered, 0);

        cache.record(|stats| {
            stats.read_failures = u32::MAX;
            stats.consecutive_failures = u32::MAX;
        });
        let mut supervisor = PollSupervisor::new(
            Probe(Err(SensorError::Timeout)),
            Sleeps(&sleeps),
            &addresses,
            &cache,
            config,
        );
        assert!(block_on(supervisor.cycle()).is_err());
        let stats = cache.stats();
        assert_eq!(stats.read_failures, 0);
        assert_eq!(stats.consecutive_failures, u32::MAX);
        assert_eq!(stats.cycles, 1);
    }

    #[test]
    fn sub_millisecond_intervals_still_sleep() {
        let sleeps = RefCell::default();
        let addresses = probes(1);
        let cache = ReadingCache::new();
        let mut supervisor = PollSupervisor::new(
            Probe(Ok(20.0)),
            Sleeps(&sleeps),
            &addresses,
            &cache,
            PollConfig::default(),
        );

        block_on(async {
            let watcher = async {
                while sleeps.borrow().len() < 2 {
                    yield_now().await;
                }
            };
            match select(supervisor.run(Some(Duration::from_micros(200))), watcher).await {
                Either::First(()) => panic!("supervisor returned"),
                Either::Second(()) => {}
            }
        });

        assert_eq!(*sleeps.borrow(), [1, 1]);
        assert_eq!(cache.stats().cycles, 2);
    }

    #[test]
    fn readings_hold_one_sample_per_value() {
        let sleeps = RefCell::default();
        let addresses = probes(3);
        let cache = ReadingCache::new();
        let mut supervisor = PollSupervisor::new(
            Probe(Ok(-4.5)),
            Sleeps(&sleeps),
            &addresses,
            &cache,
            PollConfig::default().with_unit(TemperatureUnit::Celsius),
        );

        block_on(supervisor.cycle()).unwrap();
        let reading = cache.latest().unwrap();
        assert_eq!(reading.len(), 3 * MeasurementKind::Temperature.arity());
        assert_eq!(reading.sensor_count(), 3);
        assert!(reading.values().all(|value| value == -4.5));
    }

    #[test]
    fn millisecond_conversion_is_clamped() {
        assert_eq!(as_millis(Duration::from_ticks(0)), 1);
        assert_eq!(as_millis(Duration::from_millis(750)), 750);
        assert_eq!(as_millis(Duration::from_secs(u64::from(u32::MAX))), u32::MAX);
    }
}
