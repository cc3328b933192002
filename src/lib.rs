//! # nct610xd-gpio
//!
//! A Rust crate for driving the GPIO pins of Nuvoton NCT6102D, NCT6104D and
//! NCT6106D Super-I/O chips (chip ID 0xD282) found on PC motherboards.
//!
//! The chip is reached through its configuration port pair (index at 0x2E or
//! 0x4E, data at +1). That pair is shared with every other Super-I/O client
//! on the machine, so all register access goes through a [`Session`] that
//! claims the port range exclusively, unlocks the chip, selects a logical
//! device, and locks and releases again when dropped.
//!
//! ## Features
//!
//! *   Chip identification over the candidate addresses (`probe`, `find_at`).
//! *   One-time enablement of the exposed GPIO port (GPIO4, enable bit 0x10).
//! *   Per-pin GPIO control through [`BankController`]:
//!     *   Getting/setting direction (direction bit set = input).
//!     *   Reading/writing levels via the data register.
//!     *   Glitch-free switch to output (data written before direction).
//!     *   Push-pull/open-drain selection (logical device 0x0F, register
//!         address not yet verified against the datasheet).
//! *   Host GPIO subsystem contract ([`GpioChip`], [`GpioHost`]) and a small
//!     in-process host, [`PinTable`], that numbers pins globally (40-47).
//! *   Driver lifecycle ([`Driver`]): probe once, publish banks, unpublish on drop.
//! *   Linux user-space transport ([`DevPort`]) using `/dev/port` and an
//!     `flock` per configuration address, so concurrent drivers and processes
//!     never interleave on the index/data pair.
//! *   A simulated chip (`sim::SimulatedSuperIo`, behind the `sim` feature)
//!     for tests without hardware.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use nct610xd_gpio::{DevPort, Driver, DriverConfig, GpioLevel, PinTable, Result};
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let io = Arc::new(DevPort::new()?);
//!     let driver = Driver::start(io, PinTable::new(), &DriverConfig::default())?;
//!     println!("Found {}", driver.controller().identity().variant());
//!
//!     let pins = driver.host();
//!     pins.direction_output(40, GpioLevel::High)?;
//!     println!("GPIO40 reads {:?}", pins.get(40)?);
//!     pins.direction_input(40)?;
//!
//!     driver.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Hardware Setup Notes
//!
//! *   `/dev/port` needs `CAP_SYS_RAWIO` (run as root).
//! *   Lock files live in `/run/lock` (`superio-0x002e.lock`). Other tools that
//!     touch the Super-I/O should take the same lock to be excluded.
//! *   A kernel driver bound to the same chip (e.g. `nct6775`) still uses the
//!     kernel's own region lock, which this crate cannot see.
//!
//! ## License
//!
//! This project is licensed under the GPL-2.0-or-later.

// Make internal modules private, re-export public types
mod consts;
mod error;
pub mod chip;
pub mod driver;
pub mod gpio; // Keep gpio public for its enums/structs
pub mod host;
pub mod port;
pub mod session;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use chip::{probe, ChipAddress, ChipIdentity, ChipVariant};
pub use driver::{ChipController, Driver, DriverConfig};
pub use error::{Error, Result};
pub use gpio::{BankController, BankDescriptor, DriveMode, GpioDirection, GpioLevel};
pub use host::{GpioChip, GpioHost, PinTable};
#[cfg(target_os = "linux")]
pub use port::DevPort;
pub use port::PortIo;
pub use session::{Session, SessionConfig};

/// Bit-exact register map, for tools that want to talk to the chip directly.
pub mod registers {
    pub use crate::consts::gpio::{ENABLE_GPIO4, REG_BANK0_BASE, REG_ENABLE, REG_MODE_GPIO4};
    pub use crate::consts::ld;
    pub use crate::consts::{
        SIO_CHIPID, SIO_LDSEL, SIO_LOCK_KEY, SIO_NCT610XD_ID, SIO_UNLOCK_KEY,
    };
}
