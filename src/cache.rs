use core::{cell::RefCell, future::poll_fn, task::Poll};

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    waitqueue::MultiWakerRegistration,
};

use crate::reading::Reading;

/// Tasks that can wait on [`ReadingCache::wait_ready`] at the same time before older
/// waiters get a spurious wake-up.
const MAX_WAITERS: usize = 4;

/// Per-sensor counters, updated once per cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollStats {
    pub cycles: u32,
    pub delivered: u32,
    /// Cycles skipped because no address was published.
    pub idle: u32,
    pub read_failures: u32,
    pub validation_failures: u32,
    pub callback_failures: u32,
    /// Failed cycles since the last stored reading.
    pub consecutive_failures: u32,
}

struct CacheState {
    reading: Option<Reading>,
    ready: bool,
    waiters: MultiWakerRegistration<MAX_WAITERS>,
    stats: PollStats,
}

/// Latest reading of one sensor, plus the readiness latch for "first measurement
/// arrived".
///
/// Only the owning [`PollSupervisor`](crate::PollSupervisor) writes; anyone may read.
pub struct ReadingCache {
    state: Mutex<CriticalSectionRawMutex, RefCell<CacheState>>,
}

impl ReadingCache {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(CacheState {
                reading: None,
                ready: false,
                waiters: MultiWakerRegistration::new(),
                stats: PollStats {
                    cycles: 0,
                    delivered: 0,
                    idle: 0,
                    read_failures: 0,
                    validation_failures: 0,
                    callback_failures: 0,
                    consecutive_failures: 0,
                },
            })),
        }
    }

    pub fn latest(&self) -> Option<Reading> {
        self.state.lock(|state| state.borrow().reading.clone())
    }

    /// `true` once a full reading has been stored. Never goes back to `false`.
    pub fn is_ready(&self) -> bool {
        self.state.lock(|state| state.borrow().ready)
    }

    /// Wait for the first reading. Returns immediately once the cache is ready.
    pub async fn wait_ready(&self) {
        poll_fn(|cx| {
            self.state.lock(|state| {
                let mut state = state.borrow_mut();
                if state.ready {
                    Poll::Ready(())
                } else {
                    state.waiters.register(cx.waker());
                    Poll::Pending
                }
            })
        })
        .await
    }

    pub fn stats(&self) -> PollStats {
        self.state.lock(|state| state.borrow().stats)
    }

    /// Replace the reading as a whole and release anyone waiting for readiness.
    pub(crate) fn store(&self, reading: Reading) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.reading = Some(reading);
            state.stats.consecutive_failures = 0;
            if !state.ready {
                state.ready = true;
                state.waiters.wake();
            }
        })
    }

    /// Drop a reading that no longer matches the bus layout.
    pub(crate) fn invalidate(&self) {
        self.state.lock(|state| state.borrow_mut().reading = None)
    }

    pub(crate) fn record(&self, update: impl FnOnce(&mut PollStats)) {
        self.state.lock(|state| update(&mut state.borrow_mut().stats))
    }
}

impl Default for ReadingCache {
    fn default() -> Self {
        Self::new()
    }
}
