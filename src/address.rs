use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use heapless::Vec;

/// Upper bound on sensors sharing one bus.
pub const MAX_ADDRESSES: usize = 8;

/// Ordered list of sensors found on a bus.
pub type AddressList = Vec<Address, MAX_ADDRESSES>;

/// Location of one physical sensor: a GPIO pin for dedicated-pin sensors, or a 64-bit
/// ROM code on a 1-Wire bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Address {
    Pin(u8),
    /// Stored little-endian, so the family code is the low byte.
    Rom(u64),
}

impl Address {
    pub const fn pin(pin: u8) -> Self {
        Self::Pin(pin)
    }

    pub const fn from_rom(rom: [u8; 8]) -> Self {
        Self::Rom(u64::from_le_bytes(rom))
    }

    /// ROM code in wire order, `None` for pins.
    pub const fn rom(&self) -> Option<[u8; 8]> {
        match self {
            Self::Rom(code) => Some(code.to_le_bytes()),
            Self::Pin(_) => None,
        }
    }

    /// 1-Wire family code (first byte on the wire).
    pub const fn family(&self) -> Option<u8> {
        match self {
            Self::Rom(code) => Some(*code as u8),
            Self::Pin(_) => None,
        }
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Pin(pin) => write!(f, "pin {pin}"),
            Self::Rom(code) => {
                for byte in code.to_le_bytes() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Address list as seen by a reader at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub generation: u32,
    pub addresses: AddressList,
}

/// Publication point for the addresses a [`PollSupervisor`](crate::PollSupervisor)
/// iterates over.
///
/// Lists are only ever replaced whole. A reader gets either the old list or the new one,
/// never a mix. The generation is bumped whenever the published contents change.
pub struct AddressBook {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Snapshot>>,
}

impl AddressBook {
    /// Empty book, for buses populated by a [`DiscoverySupervisor`](crate::DiscoverySupervisor).
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Snapshot {
                generation: 0,
                addresses: Vec::new(),
            })),
        }
    }

    /// Book holding a single dedicated-pin sensor that never needs discovery.
    pub fn single(address: Address) -> Self {
        let book = Self::new();
        let mut addresses = AddressList::new();
        // Capacity is never zero.
        let _ = addresses.push(address);
        book.publish(addresses);
        book
    }

    /// Replace the published list. Returns `true` if the contents changed.
    pub fn publish(&self, addresses: AddressList) -> bool {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            if inner.addresses == addresses {
                return false;
            }
            inner.addresses = addresses;
            inner.generation = inner.generation.wrapping_add(1);
            true
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock(|inner| inner.borrow().clone())
    }

    pub fn generation(&self) -> u32 {
        self.inner.lock(|inner| inner.borrow().generation)
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|inner| inner.borrow().addresses.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AddressBook {
    fn default() -> Self {
        Self::new()
    }
}
