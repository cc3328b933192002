//! Contract with the host GPIO subsystem, and a minimal in-process host.

use crate::error::{Error, Result};
use crate::gpio::{BankController, GpioDirection, GpioLevel};
use crate::port::PortIo;
use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-pin capability set a bank offers to the host GPIO subsystem.
/// Offsets are relative to the bank's first pin.
pub trait GpioChip: Send + Sync {
    fn label(&self) -> &str;
    /// Global number of the first pin.
    fn base(&self) -> u32;
    /// Number of pins.
    fn ngpio(&self) -> u8;
    /// Calls may block (port I/O, region lock).
    fn can_sleep(&self) -> bool {
        true
    }
    fn get_direction(&self, offset: u8) -> Result<GpioDirection>;
    fn direction_input(&self, offset: u8) -> Result<()>;
    fn get(&self, offset: u8) -> Result<GpioLevel>;
    fn direction_output(&self, offset: u8, level: GpioLevel) -> Result<()>;
    fn set(&self, offset: u8, level: GpioLevel) -> Result<()>;
}

impl<P: PortIo + ?Sized> GpioChip for BankController<P> {
    fn label(&self) -> &str {
        BankController::label(self)
    }
    fn base(&self) -> u32 {
        self.descriptor().pin_base()
    }
    fn ngpio(&self) -> u8 {
        self.descriptor().pin_count()
    }
    fn get_direction(&self, offset: u8) -> Result<GpioDirection> {
        BankController::get_direction(self, offset)
    }
    fn direction_input(&self, offset: u8) -> Result<()> {
        self.set_direction_input(offset)
    }
    fn get(&self, offset: u8) -> Result<GpioLevel> {
        self.get_value(offset)
    }
    fn direction_output(&self, offset: u8, level: GpioLevel) -> Result<()> {
        self.set_direction_output(offset, level)
    }
    fn set(&self, offset: u8, level: GpioLevel) -> Result<()> {
        self.set_value(offset, level)
    }
}

/// Registration side of the host GPIO subsystem.
pub trait GpioHost {
    /// Publishes a bank under its `base()`/`ngpio()` pin range.
    fn add_chip(&mut self, chip: Arc<dyn GpioChip>) -> Result<()>;
    /// Withdraws the bank registered at `base`.
    fn remove_chip(&mut self, base: u32) -> Option<Arc<dyn GpioChip>>;
}

impl<H: GpioHost + ?Sized> GpioHost for &mut H {
    fn add_chip(&mut self, chip: Arc<dyn GpioChip>) -> Result<()> {
        (**self).add_chip(chip)
    }
    fn remove_chip(&mut self, base: u32) -> Option<Arc<dyn GpioChip>> {
        (**self).remove_chip(base)
    }
}

struct Registered {
    chip: Arc<dyn GpioChip>,
    // Serialises calls into one bank, which covers per-pin ordering.
    lock: Mutex<()>,
}

/// A small host: global pin numbers dispatched to registered banks.
#[derive(Default)]
pub struct PinTable {
    chips: Vec<Registered>,
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// `(base, ngpio, label)` of every registered bank, in registration order.
    pub fn ranges(&self) -> Vec<(u32, u8, String)> {
        self.chips
            .iter()
            .map(|r| (r.chip.base(), r.chip.ngpio(), r.chip.label().to_string()))
            .collect()
    }

    /// Every registered global pin number.
    pub fn pins(&self) -> Vec<u32> {
        self.chips
            .iter()
            .flat_map(|r| {
                let base = r.chip.base();
                (0..u32::from(r.chip.ngpio())).map(move |i| base + i)
            })
            .collect()
    }

    fn lookup(&self, pin: u32) -> Result<(&Registered, u8)> {
        self.chips
            .iter()
            .find_map(|r| {
                let base = r.chip.base();
                let offset = pin.checked_sub(base)?;
                if offset < u32::from(r.chip.ngpio()) {
                    Some((r, offset as u8))
                } else {
                    None
                }
            })
            .ok_or(Error::UnknownPin { pin })
    }

    pub fn get_direction(&self, pin: u32) -> Result<GpioDirection> {
        let (r, offset) = self.lookup(pin)?;
        let _guard = r.lock.lock();
        r.chip.get_direction(offset)
    }

    pub fn direction_input(&self, pin: u32) -> Result<()> {
        let (r, offset) = self.lookup(pin)?;
        let _guard = r.lock.lock();
        r.chip.direction_input(offset)
    }

    pub fn get(&self, pin: u32) -> Result<GpioLevel> {
        let (r, offset) = self.lookup(pin)?;
        let _guard = r.lock.lock();
        r.chip.get(offset)
    }

    pub fn direction_output(&self, pin: u32, level: GpioLevel) -> Result<()> {
        let (r, offset) = self.lookup(pin)?;
        let _guard = r.lock.lock();
        r.chip.direction_output(offset, level)
    }

    pub fn set(&self, pin: u32, level: GpioLevel) -> Result<()> {
        let (r, offset) = self.lookup(pin)?;
        let _guard = r.lock.lock();
        r.chip.set(offset, level)
    }
}

// Half-open pin range of a bank, widened so the end cannot overflow.
fn span(chip: &dyn GpioChip) -> (u64, u64) {
    let start = u64::from(chip.base());
    (start, start + u64::from(chip.ngpio()))
}

impl GpioHost for PinTable {
    fn add_chip(&mut self, chip: Arc<dyn GpioChip>) -> Result<()> {
        let base = chip.base();
        let count = chip.ngpio();
        // Every pin up to base + count - 1 must have a global number.
        if base.checked_add(u32::from(count)).is_none() {
            return Err(Error::PinRangeOverflow { base, count });
        }
        let (start, end) = span(chip.as_ref());
        let overlaps = self.chips.iter().any(|r| {
            let (other_start, other_end) = span(r.chip.as_ref());
            start < other_end && other_start < end
        });
        if overlaps {
            return Err(Error::BaseConflict { base, count });
        }
        debug!("Registered {} pins {}..{}", chip.label(), start, end);
        self.chips.push(Registered {
            chip,
            lock: Mutex::new(()),
        });
        Ok(())
    }

    fn remove_chip(&mut self, base: u32) -> Option<Arc<dyn GpioChip>> {
        let index = self.chips.iter().position(|r| r.chip.base() == base)?;
        let removed = self.chips.remove(index);
        debug!("Unregistered {} at pin {}", removed.chip.label(), base);
        Some(removed.chip)
    }
}
