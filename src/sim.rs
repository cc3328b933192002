//! In-memory Super-I/O chip model implementing [`PortIo`].
//!
//! Models the config-mode state machine of a Nuvoton chip (double unlock key,
//! index/data register access, logical device banking, lock key) and records
//! every port access, so protocol ordering can be checked without hardware.

use crate::consts::{self, SIO_LDSEL, SIO_LOCK_KEY, SIO_UNLOCK_KEY};
use crate::error::{Error, Result};
use crate::port::PortIo;
use log::trace;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// One observed transport operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAccess {
    Read { port: u16, value: u8 },
    Write { port: u16, value: u8 },
    Claim(u16),
    Release(u16),
}

#[derive(Debug)]
struct SimChip {
    chip_id: u16,
    unlock_count: u8,
    config_mode: bool,
    index: u8,
    device: u8,
    registers: HashMap<(u8, u8), u8>,
    // Bits of the GPIO enable register that refuse to latch.
    stuck_enable_bits: u8,
}

impl SimChip {
    fn new(chip_id: u16) -> Self {
        Self {
            chip_id,
            unlock_count: 0,
            config_mode: false,
            index: 0,
            device: 0,
            registers: HashMap::new(),
            stuck_enable_bits: 0,
        }
    }

    fn write_index(&mut self, value: u8) {
        if !self.config_mode {
            if value == SIO_UNLOCK_KEY {
                self.unlock_count += 1;
                if self.unlock_count >= 2 {
                    self.config_mode = true;
                }
            } else {
                self.unlock_count = 0;
            }
        } else if value == SIO_LOCK_KEY {
            self.config_mode = false;
            self.unlock_count = 0;
        } else {
            self.index = value;
        }
    }

    fn write_data(&mut self, value: u8) {
        if !self.config_mode {
            return;
        }
        match self.index {
            SIO_LDSEL => self.device = value,
            reg if reg < consts::SIO_FIRST_LD_REG => {} // global registers are read-only here
            reg => {
                let value = if self.device == consts::ld::GPIO && reg == consts::gpio::REG_ENABLE {
                    value & !self.stuck_enable_bits
                } else {
                    value
                };
                self.registers.insert((self.device, reg), value);
            }
        }
    }

    fn read_data(&self) -> u8 {
        if !self.config_mode {
            return 0xFF;
        }
        let [id_high, id_low] = self.chip_id.to_be_bytes();
        match self.index {
            SIO_LDSEL => self.device,
            consts::SIO_CHIPID => id_high,
            reg if reg == consts::SIO_CHIPID + 1 => id_low,
            reg if reg < consts::SIO_FIRST_LD_REG => 0x00,
            reg => self
                .registers
                .get(&(self.device, reg))
                .copied()
                .unwrap_or(0),
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    chips: HashMap<u16, SimChip>,
    claims: HashSet<u16>,
    accesses: Vec<PortAccess>,
}

/// Simulated Super-I/O bus with zero or more chips at configuration ports.
///
/// Ports without a chip float high (read 0xFF), so probing them yields chip
/// ID 0xFFFF.
#[derive(Debug, Default)]
pub struct SimulatedSuperIo {
    state: Mutex<SimState>,
}

impl SimulatedSuperIo {
    /// Empty bus: every probe misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus with one NCT610xD at `address`.
    pub fn nct610xd(address: u16) -> Self {
        Self::new().with_chip(address, consts::SIO_NCT610XD_ID)
    }

    /// Adds a chip reporting `chip_id` at `address`.
    pub fn with_chip(self, address: u16, chip_id: u16) -> Self {
        self.state
            .lock()
            .chips
            .insert(address, SimChip::new(chip_id));
        self
    }

    /// Sets a logical-device register directly, bypassing the protocol.
    pub fn set_register(&self, address: u16, device: u8, register: u8, value: u8) {
        if let Some(chip) = self.state.lock().chips.get_mut(&address) {
            chip.registers.insert((device, register), value);
        }
    }

    /// Reads a logical-device register directly, bypassing the protocol.
    pub fn register(&self, address: u16, device: u8, register: u8) -> u8 {
        self.state
            .lock()
            .chips
            .get(&address)
            .and_then(|chip| chip.registers.get(&(device, register)).copied())
            .unwrap_or(0)
    }

    /// Makes `mask` bits of the GPIO enable register ignore writes.
    pub fn stick_enable_bits(&self, address: u16, mask: u8) {
        if let Some(chip) = self.state.lock().chips.get_mut(&address) {
            chip.stuck_enable_bits = mask;
        }
    }

    /// Whether the chip at `address` is currently in config mode.
    pub fn is_unlocked(&self, address: u16) -> bool {
        self.state
            .lock()
            .chips
            .get(&address)
            .is_some_and(|chip| chip.config_mode)
    }

    /// Whether the region at `base` is currently claimed.
    pub fn is_claimed(&self, base: u16) -> bool {
        self.state.lock().claims.contains(&base)
    }

    /// Claims `base` on behalf of some other driver. Returns false if already held.
    pub fn claim_externally(&self, base: u16) -> bool {
        self.state.lock().claims.insert(base)
    }

    /// Drops a claim made with [`SimulatedSuperIo::claim_externally`].
    pub fn release_externally(&self, base: u16) {
        self.state.lock().claims.remove(&base);
    }

    /// Every access recorded so far.
    pub fn accesses(&self) -> Vec<PortAccess> {
        self.state.lock().accesses.clone()
    }

    pub fn clear_accesses(&self) {
        self.state.lock().accesses.clear();
    }
}

impl PortIo for SimulatedSuperIo {
    fn read_byte(&self, port: u16) -> Result<u8> {
        let mut state = self.state.lock();
        let value = match state.chips.get(&port.wrapping_sub(1)) {
            Some(chip) => chip.read_data(),
            None => 0xFF,
        };
        state.accesses.push(PortAccess::Read { port, value });
        Ok(value)
    }

    fn write_byte(&self, port: u16, value: u8) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(chip) = state.chips.get_mut(&port) {
            chip.write_index(value);
        } else if let Some(chip) = state.chips.get_mut(&port.wrapping_sub(1)) {
            chip.write_data(value);
        }
        state.accesses.push(PortAccess::Write { port, value });
        Ok(())
    }

    fn request_region(&self, base: u16, _len: u16) -> Result<()> {
        let mut state = self.state.lock();
        if !state.claims.insert(base) {
            return Err(Error::AddressBusy { address: base });
        }
        trace!("sim: claimed 0x{:04x}", base);
        state.accesses.push(PortAccess::Claim(base));
        Ok(())
    }

    fn release_region(&self, base: u16, _len: u16) {
        let mut state = self.state.lock();
        if state.claims.remove(&base) {
            state.accesses.push(PortAccess::Release(base));
        }
    }
}
