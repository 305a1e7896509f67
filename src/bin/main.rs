//! Host demo: a DHT22 on a dedicated pin and a 1-Wire bus of DS18B20 probes, both
//! simulated, each driven by its own supervisor task.
//!
//! Log level follows `RUST_LOG` (default `info`).

use embassy_executor::Spawner;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::{Delay, Duration, Timer};
use heapless::Vec;
use log::{error, info, LevelFilter};
use sensor_supervisor::{
    drivers::{
        dht::{DhtTransport, Frame},
        ds18x20::{crc8, Rom, Scratchpad, FAMILY_DS18B20},
        Dht, DhtFamily, Ds18x20, OneWireBus,
    },
    Address, AddressBook, DiscoveryConfig, DiscoverySupervisor, FnSink, PollConfig,
    PollSupervisor, Reading, ReadingCache, SensorError, SharedBus, MAX_ADDRESSES,
};

type ProbeBus = Mutex<CriticalSectionRawMutex, Ds18x20<SimOneWire>>;

macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

struct StdoutLogger;

impl log::Log for StdoutLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            println!("{:<5} {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StdoutLogger = StdoutLogger;

fn init_logger() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    init_logger();

    let poll_config = PollConfig::from_build_env();
    let scan_config = DiscoveryConfig::from_build_env();
    info!(
        "Polling every {} ms in {}, scanning every {} ms",
        poll_config.interval().as_millis(),
        poll_config.unit(),
        scan_config.interval().as_millis()
    );

    let climate_addresses: &'static AddressBook =
        mk_static!(AddressBook, AddressBook::single(Address::pin(4)));
    let climate_cache: &'static ReadingCache = mk_static!(ReadingCache, ReadingCache::new());
    let probe_addresses: &'static AddressBook = mk_static!(AddressBook, AddressBook::new());
    let probe_cache: &'static ReadingCache = mk_static!(ReadingCache, ReadingCache::new());
    let probe_bus: &'static ProbeBus =
        mk_static!(ProbeBus, Mutex::new(Ds18x20::new(SimOneWire::new())));

    if let Err(e) = spawner.spawn(climate(climate_addresses, climate_cache, poll_config)) {
        error!("Failed to start climate task: {:?}", e);
    }
    if let Err(e) = spawner.spawn(probes(probe_bus, probe_addresses, probe_cache, poll_config)) {
        error!("Failed to start probe task: {:?}", e);
    }
    if let Err(e) = spawner.spawn(discovery(probe_bus, probe_addresses, scan_config)) {
        error!("Failed to start discovery task: {:?}", e);
    }

    climate_cache.wait_ready().await;
    probe_cache.wait_ready().await;
    info!("All sensors reporting");

    loop {
        Timer::after(Duration::from_secs(10)).await;
        info!("climate: {:?}", climate_cache.stats());
        info!("probes: {:?}", probe_cache.stats());
    }
}

fn print_reading(reading: &Reading) -> Result<(), sensor_supervisor::CallbackError> {
    info!("\n{}", reading);
    Ok(())
}

#[embassy_executor::task]
async fn climate(
    addresses: &'static AddressBook,
    cache: &'static ReadingCache,
    config: PollConfig,
) {
    let family = DhtFamily::Dht22;
    let config = config.with_interval(config.interval().max(family.min_interval()));
    let mut supervisor = PollSupervisor::new(
        Dht::new(SimDht::default(), family),
        Delay,
        addresses,
        cache,
        config,
    )
    .with_sink(FnSink::new(print_reading));
    supervisor.run(None).await
}

#[embassy_executor::task]
async fn probes(
    bus: &'static ProbeBus,
    addresses: &'static AddressBook,
    cache: &'static ReadingCache,
    config: PollConfig,
) {
    let mut supervisor =
        PollSupervisor::new(SharedBus::new(bus), Delay, addresses, cache, config)
            .with_sink(FnSink::new(print_reading));
    supervisor.run(None).await
}

#[embassy_executor::task]
async fn discovery(bus: &'static ProbeBus, addresses: &'static AddressBook, config: DiscoveryConfig) {
    let mut supervisor = DiscoverySupervisor::new(SharedBus::new(bus), Delay, addresses, config);
    supervisor.run(None).await
}

/// DHT22 whose readings drift slowly and which misses every seventh transaction.
#[derive(Default)]
struct SimDht {
    transactions: u32,
}

impl DhtTransport for SimDht {
    async fn read_frame(&mut self) -> Result<Frame, SensorError> {
        self.transactions += 1;
        if self.transactions % 7 == 0 {
            return Err(SensorError::Timeout);
        }

        let step = (self.transactions % 10) as u16;
        let humidity = (480 + (step % 5) * 10).to_be_bytes();
        let temperature = (210 + step * 3).to_be_bytes();
        let mut frame = [humidity[0], humidity[1], temperature[0], temperature[1], 0];
        frame[4] = frame[..4].iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
        Ok(frame)
    }
}

/// 1-Wire bus with two DS18B20 probes; a third one is plugged in after a few scans.
struct SimOneWire {
    probes: [(Rom, i16); 3],
    searches: u32,
    conversions: u32,
}

impl SimOneWire {
    fn new() -> Self {
        Self {
            probes: [(rom(0x01), 344), (rom(0x02), -52), (rom(0x03), 310)],
            searches: 0,
            conversions: 0,
        }
    }

    fn present(&self) -> usize {
        if self.searches > 3 {
            3
        } else {
            2
        }
    }
}

impl OneWireBus for SimOneWire {
    async fn search(&mut self) -> Result<Vec<Rom, MAX_ADDRESSES>, SensorError> {
        self.searches += 1;
        let mut found = Vec::new();
        for (rom, _) in &self.probes[..self.present()] {
            found.push(*rom).map_err(|_| SensorError::Other("too many probes"))?;
        }
        Ok(found)
    }

    async fn convert_all(&mut self) -> Result<(), SensorError> {
        self.conversions += 1;
        Ok(())
    }

    async fn read_scratchpad(&mut self, rom: Rom) -> Result<Scratchpad, SensorError> {
        let (_, sixteenths) = self.probes[..self.present()]
            .iter()
            .find(|(candidate, _)| *candidate == rom)
            .ok_or(SensorError::NoResponse)?;
        // Wander within a quarter degree between conversions.
        let raw = sixteenths + (self.conversions % 5) as i16;
        let [lsb, msb] = raw.to_le_bytes();
        let mut scratchpad = [lsb, msb, 0x4b, 0x46, 0x7f, 0xff, 0x0c, 0x10, 0];
        scratchpad[8] = crc8(&scratchpad[..8]);
        Ok(scratchpad)
    }
}

fn rom(serial: u8) -> Rom {
    let mut rom = [FAMILY_DS18B20, serial, 0x4c, 0x01, 0x16, 0x04, 0x00, 0x00];
    rom[7] = crc8(&rom[..7]);
    rom
}
