//! DS18S20 / DS18B20 / DS1822 1-Wire temperature probes.
//!
//! Several probes share one data line. A conversion is started on all of them at once
//! (Skip ROM + Convert T), then each scratchpad is read back by ROM code.

#![allow(async_fn_in_trait)]

use embassy_time::Duration;
use heapless::Vec;

use crate::{
    address::{Address, AddressList, MAX_ADDRESSES},
    error::SensorError,
    port::{BusScan, Measurement, MeasurementKind, RawSensorPort},
};

pub const FAMILY_DS18S20: u8 = 0x10;
pub const FAMILY_DS1822: u8 = 0x22;
pub const FAMILY_DS18B20: u8 = 0x28;

/// Worst-case 12-bit conversion time.
pub const CONVERSION_TIME: Duration = Duration::from_millis(750);

pub type Rom = [u8; 8];
pub type Scratchpad = [u8; 9];

/// 1-Wire bus master primitives.
pub trait OneWireBus {
    /// ROM codes of every device answering the search algorithm.
    async fn search(&mut self) -> Result<Vec<Rom, MAX_ADDRESSES>, SensorError>;

    /// Start a temperature conversion on every device.
    async fn convert_all(&mut self) -> Result<(), SensorError>;

    async fn read_scratchpad(&mut self, rom: Rom) -> Result<Scratchpad, SensorError>;
}

pub const fn is_supported(family: u8) -> bool {
    matches!(family, FAMILY_DS18S20 | FAMILY_DS1822 | FAMILY_DS18B20)
}

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0, |mut crc, &byte| {
        let mut byte = byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8c;
            }
            byte >>= 1;
        }
        crc
    })
}

/// Temperature in Celsius held in a scratchpad read from a device of `family`.
pub fn decode_scratchpad(family: u8, scratchpad: &Scratchpad) -> Result<f32, SensorError> {
    // Nobody drove the line, or it is stuck low. Zeros would pass the CRC.
    if scratchpad.iter().all(|b| *b == 0xff) || *scratchpad == [0; 9] {
        return Err(SensorError::NoResponse);
    }
    if crc8(&scratchpad[..8]) != scratchpad[8] {
        return Err(SensorError::ChecksumMismatch);
    }

    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    match family {
        FAMILY_DS18S20 => {
            // Half-degree register, extended with COUNT_REMAIN / COUNT_PER_C.
            let count_remain = f32::from(scratchpad[6]);
            let count_per_c = f32::from(scratchpad[7]);
            if count_per_c == 0.0 {
                return Ok(f32::from(raw) / 2.0);
            }
            Ok(f32::from(raw >> 1) - 0.25 + (count_per_c - count_remain) / count_per_c)
        }
        FAMILY_DS18B20 | FAMILY_DS1822 => {
            // Bits below the configured resolution are undefined.
            let resolution = (scratchpad[4] >> 5) & 0b11;
            let undefined = (1i16 << (3 - resolution)) - 1;
            Ok(f32::from(raw & !undefined) / 16.0)
        }
        _ => Err(SensorError::Other("unsupported 1-Wire family")),
    }
}

/// All DS18x20 probes on one 1-Wire bus.
pub struct Ds18x20<B> {
    bus: B,
}

impl<B: OneWireBus> Ds18x20<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B: OneWireBus> RawSensorPort for Ds18x20<B> {
    const KIND: MeasurementKind = MeasurementKind::Temperature;
    const SETTLE_TIME: Duration = CONVERSION_TIME;

    async fn begin_measurement(&mut self) -> Result<(), SensorError> {
        self.bus.convert_all().await
    }

    async fn read_value(&mut self, address: Address) -> Result<Measurement, SensorError> {
        let rom = address
            .rom()
            .ok_or(SensorError::Other("not a 1-Wire address"))?;
        let scratchpad = self.bus.read_scratchpad(rom).await?;
        decode_scratchpad(rom[0], &scratchpad).map(Measurement::Temperature)
    }
}

impl<B: OneWireBus> BusScan for Ds18x20<B> {
    async fn enumerate_addresses(&mut self) -> Result<AddressList, SensorError> {
        let mut found = AddressList::new();
        for rom in self.bus.search().await? {
            if crc8(&rom[..7]) != rom[7] {
                warn!("Skipping ROM with bad CRC: {:?}", rom);
                continue;
            }
            if !is_supported(rom[0]) {
                continue;
            }
            // Both lists share the same capacity.
            let _ = found.push(Address::from_rom(rom));
        }
        Ok(found)
    }
}
