use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

use crate::{
    address::AddressBook,
    config::DiscoveryConfig,
    error::SensorError,
    poll::as_millis,
    port::BusScan,
};

/// Re-scans a shared bus and publishes what it finds into an [`AddressBook`].
///
/// Runs alongside the bus's [`PollSupervisor`](crate::PollSupervisor), which picks up a
/// new list on its next cycle.
pub struct DiscoverySupervisor<'a, B, D> {
    bus: B,
    delay: D,
    config: DiscoveryConfig,
    addresses: &'a AddressBook,
    scans: u32,
    failures: u32,
}

impl<'a, B, D> DiscoverySupervisor<'a, B, D>
where
    B: BusScan,
    D: DelayNs,
{
    pub fn new(bus: B, delay: D, addresses: &'a AddressBook, config: DiscoveryConfig) -> Self {
        Self {
            bus,
            delay,
            config,
            addresses,
            scans: 0,
            failures: 0,
        }
    }

    /// Scan forever, sleeping `interval` (or the configured interval) between scans.
    pub async fn run(&mut self, interval: Option<Duration>) {
        let interval = interval.unwrap_or(self.config.interval());
        loop {
            if let Err(e) = self.scan().await {
                error!("Bus scan failed: {:?}", e);
            }
            self.delay.delay_ms(as_millis(interval)).await;
        }
    }

    /// Enumerate the bus once and publish the result. Returns whether the published
    /// list changed. On error the previous list stays in place.
    pub async fn scan(&mut self) -> Result<bool, SensorError> {
        self.scans = self.scans.wrapping_add(1);
        let found = match self.bus.enumerate_addresses().await {
            Ok(found) => found,
            Err(e) => {
                self.failures = self.failures.wrapping_add(1);
                return Err(e);
            }
        };

        let count = found.len();
        let changed = self.addresses.publish(found);
        if changed {
            info!("Found {} sensor(s) on the bus", count);
        }
        Ok(changed)
    }

    pub fn scans(&self) -> u32 {
        self.scans
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}
