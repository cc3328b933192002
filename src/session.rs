//! Super-I/O configuration session: claim, unlock, select, access, lock, release.

use crate::consts::{self, SIO_LDSEL, SIO_LOCK_KEY, SIO_REGION_LEN, SIO_UNLOCK_KEY};
use crate::error::{Error, Result};
use crate::port::PortIo;
use log::{debug, trace, warn};
use std::thread;
use std::time::Duration;

/// Policy for opening a session when the port range is busy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Extra attempts after the first `AddressBusy` (0 = fail fast).
    pub busy_retries: u32,
    /// Delay between attempts.
    pub busy_retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            busy_retries: 0,
            busy_retry_delay: Duration::from_millis(10),
        }
    }
}

impl SessionConfig {
    /// Single non-blocking attempt. Same as `default()`.
    pub fn fail_fast() -> Self {
        Self::default()
    }

    /// Bounded waiting for a busy region (5 retries, 20ms apart).
    pub fn patient() -> Self {
        Self {
            busy_retries: 5,
            busy_retry_delay: Duration::from_millis(20),
        }
    }
}

/// An open configuration-mode session on one Super-I/O chip.
///
/// Holding a `Session` means this process owns the chip's index/data port
/// pair and the chip is unlocked. Dropping it sends the lock key and releases
/// the region, on every exit path.
pub struct Session<'a, P: PortIo + ?Sized> {
    io: &'a P,
    base: u16,
    selected: Option<u8>,
}

impl<'a, P: PortIo + ?Sized> Session<'a, P> {
    /// Claims the port pair at `base` and enters extended function mode.
    pub fn open(io: &'a P, base: u16, config: &SessionConfig) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match io.request_region(base, SIO_REGION_LEN) {
                Ok(()) => break,
                Err(Error::AddressBusy { .. }) if attempt < config.busy_retries => {
                    attempt += 1;
                    debug!(
                        "I/O address 0x{:04x} busy, retry {}/{}",
                        base, attempt, config.busy_retries
                    );
                    thread::sleep(config.busy_retry_delay);
                }
                Err(e) => {
                    if matches!(e, Error::AddressBusy { .. }) {
                        warn!("I/O address 0x{:04x} already in use", base);
                    }
                    return Err(e);
                }
            }
        }

        // Region is ours from here; Drop gives it back even if unlocking fails.
        let session = Self {
            io,
            base,
            selected: None,
        };
        // The key must be sent twice.
        io.write_byte(base, SIO_UNLOCK_KEY)?;
        io.write_byte(base, SIO_UNLOCK_KEY)?;
        trace!("Entered Super-I/O config mode at 0x{:04x}", base);
        Ok(session)
    }

    /// Index port address.
    #[inline]
    pub fn base(&self) -> u16 {
        self.base
    }

    #[inline]
    fn data_port(&self) -> u16 {
        self.base + 1
    }

    /// Currently selected logical device, if any.
    pub fn selected(&self) -> Option<u8> {
        self.selected
    }

    /// Selects the logical device whose registers appear at 0x30 and above.
    /// May be called again to switch devices.
    pub fn select(&mut self, device: u8) -> Result<()> {
        self.io.write_byte(self.base, SIO_LDSEL)?;
        self.io.write_byte(self.data_port(), device)?;
        trace!("Selected logical device 0x{:02x}", device);
        self.selected = Some(device);
        Ok(())
    }

    fn check_register(&self, register: u8) -> Result<()> {
        if register >= consts::SIO_FIRST_LD_REG && self.selected.is_none() {
            Err(Error::NoLogicalDevice { register })
        } else {
            Ok(())
        }
    }

    /// Reads one configuration register.
    pub fn read(&self, register: u8) -> Result<u8> {
        self.check_register(register)?;
        self.io.write_byte(self.base, register)?;
        let value = self.io.read_byte(self.data_port())?;
        trace!("Read CR 0x{:02x} = 0x{:02x}", register, value);
        Ok(value)
    }

    /// Writes one configuration register.
    pub fn write(&self, register: u8, value: u8) -> Result<()> {
        self.check_register(register)?;
        trace!("Writing CR 0x{:02x} = 0x{:02x}", register, value);
        self.io.write_byte(self.base, register)?;
        self.io.write_byte(self.data_port(), value)
    }

    /// Reads a 16-bit value from `register` (high byte) and `register + 1` (low byte).
    pub fn read_u16(&self, register: u8) -> Result<u16> {
        let high = self.read(register)?;
        let low = self.read(register.wrapping_add(1))?;
        Ok(u16::from_be_bytes([high, low]))
    }

    /// Read-modify-write: replaces the bits in `mask` with those of `bits`.
    /// The write is skipped if nothing changes. Returns the new value.
    pub fn update_bits(&self, register: u8, mask: u8, bits: u8) -> Result<u8> {
        let current = self.read(register)?;
        let new = (current & !mask) | (bits & mask);
        if new != current {
            self.write(register, new)?;
        } else {
            trace!("CR 0x{:02x} already 0x{:02x}", register, current);
        }
        Ok(new)
    }

    /// Leaves config mode and releases the region. Same as dropping the session.
    pub fn close(self) {}
}

impl<P: PortIo + ?Sized> Drop for Session<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.io.write_byte(self.base, SIO_LOCK_KEY) {
            warn!("Failed to lock Super-I/O at 0x{:04x}: {}", self.base, e);
        }
        self.io.release_region(self.base, SIO_REGION_LEN);
        trace!("Exited Super-I/O config mode at 0x{:04x}", self.base);
    }
}
