//! Supervisor configuration.
//!
//! Defaults can be overridden at build time through `SENSOR_POLL_INTERVAL_MS`,
//! `SENSOR_SCAN_INTERVAL_MS` and `SENSOR_UNIT`, either exported in the environment or
//! listed in a `.env` file next to `Cargo.toml`.

use embassy_time::Duration;

use crate::convert::TemperatureUnit;

/// Shortest interval DHT22 and DS18x20 parts can sustain.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollConfig {
    interval: Duration,
    unit: TemperatureUnit,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            unit: TemperatureUnit::default(),
        }
    }
}

impl PollConfig {
    /// Default config with the build-time overrides applied.
    pub fn from_build_env() -> Self {
        let mut config = Self::default();
        if let Some(interval) = parse_millis(option_env!("SENSOR_POLL_INTERVAL_MS")) {
            config = config.with_interval(interval);
        }
        if let Some(unit) = option_env!("SENSOR_UNIT").and_then(TemperatureUnit::from_letter) {
            config = config.with_unit(unit);
        }
        config
    }

    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    pub fn with_unit(self, unit: TemperatureUnit) -> Self {
        Self { unit, ..self }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveryConfig {
    interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

impl DiscoveryConfig {
    pub fn from_build_env() -> Self {
        match parse_millis(option_env!("SENSOR_SCAN_INTERVAL_MS")) {
            Some(interval) => Self::default().with_interval(interval),
            None => Self::default(),
        }
    }

    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn parse_millis(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse().ok().map(Duration::from_millis)
}
