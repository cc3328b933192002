use thiserror::Error;

/// Errors that can occur when talking to an NCT610xD Super-I/O chip.
///
/// Covers region contention, chip identification, GPIO enablement, caller
/// contract violations, and failures of the underlying port transport.
#[derive(Error, Debug)]
pub enum Error {
    /// The index/data port pair is claimed by another session, either in this
    /// process or in another one. Retryable.
    #[error("I/O address 0x{address:04x} already in use")]
    AddressBusy {
        /// Base (index port) address of the contended region.
        address: u16,
    },
    /// No supported chip answered at any candidate address.
    #[error("No supported Super-I/O chip found (tried {tried:04x?})")]
    NotFound {
        /// Candidate addresses that were probed, in order.
        tried: Vec<u16>,
    },
    /// The GPIO enable bit did not read back set after it was written.
    #[error(
        "Failed to enable GPIO bank at 0x{address:04x}: enable register reads back 0x{value:02x}"
    )]
    EnableFailed {
        /// Address of the chip being enabled.
        address: u16,
        /// Value read back from the enable register.
        value: u8,
    },
    /// Pin offset is not below the bank's pin count.
    #[error("GPIO offset {offset} out of range (bank has {count} pins)")]
    PinArgumentOutOfRange {
        /// The offending offset.
        offset: u8,
        /// Number of pins in the bank.
        count: u8,
    },
    /// A logical-device register was accessed before any device was selected.
    #[error("Register 0x{register:02x} accessed without a selected logical device")]
    NoLogicalDevice {
        /// The register that was accessed.
        register: u8,
    },
    /// A global pin number does not belong to any registered bank.
    #[error("No GPIO bank registered for pin {pin}")]
    UnknownPin {
        /// The global pin number.
        pin: u32,
    },
    /// A bank registration overlaps pins that are already registered.
    #[error("GPIO range at pin {base} ({count} pins) overlaps an already registered bank")]
    BaseConflict {
        /// First global pin number of the rejected bank.
        base: u32,
        /// Pin count of the rejected bank.
        count: u8,
    },
    /// A bank layout does not fit one 8-bit register pair or the pin number space.
    #[error(
        "Invalid GPIO bank: {pin_count} pins at pin {pin_base}, registers at 0x{register_offset:02x}"
    )]
    InvalidBank {
        /// Requested first global pin number.
        pin_base: u32,
        /// Requested pin count (at most 8).
        pin_count: u8,
        /// Requested direction register (data register follows at +1).
        register_offset: u8,
    },
    /// A bank's pin range runs past the largest global pin number.
    #[error("GPIO range at pin {base} ({count} pins) exceeds the pin number space")]
    PinRangeOverflow {
        /// First global pin number of the rejected bank.
        base: u32,
        /// Pin count of the rejected bank.
        count: u8,
    },
    /// Port transport failure (opening `/dev/port`, a lock file, or a short transfer).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for NCT610xD operations.
pub type Result<T> = std::result::Result<T, Error>;

// Helpers for creating specific errors
pub(crate) fn pin_out_of_range(offset: u8, count: u8) -> Error {
    Error::PinArgumentOutOfRange { offset, count }
}
