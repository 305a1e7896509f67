//! DHT11 / DHT22 (AM2302) single-pin humidity and temperature sensors.

#![allow(async_fn_in_trait)]

use embassy_time::Duration;

use crate::{
    address::Address,
    error::SensorError,
    port::{Measurement, MeasurementKind, RawSensorPort},
};

/// Raw 40-bit DHT answer: two humidity bytes, two temperature bytes and a checksum.
pub type Frame = [u8; 5];

/// Performs the start pulse and samples the 40 data bits.
pub trait DhtTransport {
    async fn read_frame(&mut self) -> Result<Frame, SensorError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DhtFamily {
    /// Whole degrees and whole percent.
    Dht11,
    /// Tenths, with a sign bit on the temperature.
    Dht22,
}

impl DhtFamily {
    /// Sampling rate limit from the datasheets; polling faster returns stale frames.
    pub const fn min_interval(self) -> Duration {
        match self {
            Self::Dht11 => Duration::from_secs(1),
            Self::Dht22 => Duration::from_secs(2),
        }
    }

    pub fn decode(self, frame: Frame) -> Result<Measurement, SensorError> {
        // A sensor that never answered leaves the line idle, which samples as zeros and
        // still passes the checksum.
        if frame == [0; 5] {
            return Err(SensorError::NoResponse);
        }
        let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        if sum != frame[4] {
            return Err(SensorError::ChecksumMismatch);
        }

        let (temperature, humidity) = match self {
            Self::Dht11 => (f32::from(frame[2]), f32::from(frame[0])),
            Self::Dht22 => {
                let humidity = u16::from_be_bytes([frame[0], frame[1]]);
                let magnitude = u16::from_be_bytes([frame[2] & 0x7f, frame[3]]);
                let temperature = if frame[2] & 0x80 != 0 {
                    -f32::from(magnitude)
                } else {
                    f32::from(magnitude)
                };
                (temperature / 10.0, f32::from(humidity) / 10.0)
            }
        };
        Ok(Measurement::TemperatureHumidity {
            temperature,
            humidity,
        })
    }
}

/// DHT sensor on a dedicated pin.
///
/// [`begin_measurement`](RawSensorPort::begin_measurement) performs the bus transaction
/// and keeps the frame; [`read_value`](RawSensorPort::read_value) decodes it.
pub struct Dht<T> {
    transport: T,
    family: DhtFamily,
    frame: Option<Frame>,
}

impl<T: DhtTransport> Dht<T> {
    pub fn new(transport: T, family: DhtFamily) -> Self {
        Self {
            transport,
            family,
            frame: None,
        }
    }

    pub fn family(&self) -> DhtFamily {
        self.family
    }
}

impl<T: DhtTransport> RawSensorPort for Dht<T> {
    const KIND: MeasurementKind = MeasurementKind::TemperatureHumidity;

    async fn begin_measurement(&mut self) -> Result<(), SensorError> {
        self.frame = None;
        self.frame = Some(self.transport.read_frame().await?);
        Ok(())
    }

    async fn read_value(&mut self, _address: Address) -> Result<Measurement, SensorError> {
        let frame = self.frame.ok_or(SensorError::NoResponse)?;
        self.family.decode(frame)
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;

    struct Replay(Result<Frame, SensorError>);

    impl DhtTransport for Replay {
        async fn read_frame(&mut self) -> Result<Frame, SensorError> {
            self.0
        }
    }

    fn values(measurement: Measurement) -> (f32, f32) {
        match measurement {
            Measurement::TemperatureHumidity {
                temperature,
                humidity,
            } => (temperature, humidity),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dht22_frames_are_in_tenths() {
        let frame = [0x02, 0x26, 0x00, 0xe1, 0x09];
        let (t, h) = values(DhtFamily::Dht22.decode(frame).unwrap());
        assert!((t - 22.5).abs() < 1e-4);
        assert!((h - 55.0).abs() < 1e-4);
    }

    #[test]
    fn dht22_sign_bit_gives_negative_temperatures() {
        let frame = [0x01, 0x90, 0x80, 0x65, 0x76];
        let (t, h) = values(DhtFamily::Dht22.decode(frame).unwrap());
        assert!((t + 10.1).abs() < 1e-4);
        assert!((h - 40.0).abs() < 1e-4);
    }

    #[test]
    fn dht11_frames_are_whole_units() {
        let frame = [55, 0, 22, 0, 0x4d];
        assert_eq!(
            values(DhtFamily::Dht11.decode(frame).unwrap()),
            (22.0, 55.0)
        );
    }

    #[test]
    fn corrupted_and_silent_frames_are_rejected() {
        assert_eq!(
            DhtFamily::Dht22.decode([0x02, 0x26, 0x00, 0xe1, 0x0a]),
            Err(SensorError::ChecksumMismatch)
        );
        assert_eq!(
            DhtFamily::Dht11.decode([0; 5]),
            Err(SensorError::NoResponse)
        );
    }

    #[test]
    fn reading_before_measuring_reports_no_response() {
        let mut dht = Dht::new(Replay(Ok([0x02, 0x26, 0x00, 0xe1, 0x09])), DhtFamily::Dht22);
        block_on(async {
            assert_eq!(
                dht.read_value(Address::pin(4)).await,
                Err(SensorError::NoResponse)
            );
            dht.begin_measurement().await.unwrap();
            assert!(dht.read_value(Address::pin(4)).await.is_ok());
        });
    }

    #[test]
    fn failed_transaction_discards_the_previous_frame() {
        let mut dht = Dht::new(Replay(Ok([0x02, 0x26, 0x00, 0xe1, 0x09])), DhtFamily::Dht22);
        block_on(async {
            dht.begin_measurement().await.unwrap();
            dht.transport.0 = Err(SensorError::Timeout);
            assert_eq!(dht.begin_measurement().await, Err(SensorError::Timeout));
            assert_eq!(
                dht.read_value(Address::pin(4)).await,
                Err(SensorError::NoResponse)
            );
        });
    }
}
