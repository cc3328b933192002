//! Internal constants, register addresses, and bit definitions.

// Default configuration port candidates, probed in this order.
/// Primary Super-I/O configuration port.
pub const SIO_PORT_PRIMARY: u16 = 0x2E;
/// Secondary Super-I/O configuration port.
pub const SIO_PORT_SECONDARY: u16 = 0x4E;

/// Number of consecutive I/O ports (index + data) claimed by a session.
pub const SIO_REGION_LEN: u16 = 2;

// --- Configuration Mode Keys ---
/// Written to the index port (twice) to enter extended function mode.
pub const SIO_UNLOCK_KEY: u8 = 0x87;
/// Written to the index port to leave extended function mode.
pub const SIO_LOCK_KEY: u8 = 0xAA;

// --- Global Configuration Registers ---
pub const SIO_LDSEL: u8 = 0x07; // Logical device select
pub const SIO_CHIPID: u8 = 0x20; // Chip ID, 2 bytes, high byte first
/// First register that belongs to the selected logical device.
/// Everything below is global and readable without a `select`.
pub const SIO_FIRST_LD_REG: u8 = 0x30;

/// Chip ID of the NCT6102D/NCT6104D/NCT6106D family.
pub const SIO_NCT610XD_ID: u16 = 0xD282;

// --- Logical Devices ---
pub mod ld {
    /// GPIO data/direction registers.
    pub const GPIO: u8 = 0x07;
    /// GPIO push-pull/open-drain selection.
    pub const GPIO_MODE: u8 = 0x0F;
}

// --- GPIO Logical Device Registers ---
pub mod gpio {
    /// Bitmask enabling individual GPIO ports (in LD 0x07).
    pub const REG_ENABLE: u8 = 0x30;
    /// Enable bit for GPIO4, the port exposed as bank 0.
    pub const ENABLE_GPIO4: u8 = 1 << 4;

    /// Bank 0 (GPIO4) register base. Direction at +0, data at +1.
    pub const REG_BANK0_BASE: u8 = 0xF0;
    pub const DIR_OFFSET: u8 = 0;
    pub const DATA_OFFSET: u8 = 1;

    /// Push-pull/open-drain register of GPIO1 (in LD 0x0F). GPIOn is at `+ n - 1`.
    pub const REG_MODE_GPIO1: u8 = 0xE0;
    /// Push-pull/open-drain register of GPIO4 (in LD 0x0F).
    ///
    /// **Note:** This address is speculative and has not been verified
    /// against the datasheet. It extends the GPIO1/GPIO2 numbering above;
    /// the enable bit numbering (GPIO4 = bit 4) would instead put it at 0xE4.
    pub const REG_MODE_GPIO4: u8 = REG_MODE_GPIO1 + 3;

    /// Global pin number of the first pin of bank 0.
    pub const BANK0_PIN_BASE: u32 = 40;
    /// Maximum pins per bank (one 8-bit register).
    pub const MAX_BANK_PINS: u8 = 8;
}

// --- Host-side Defaults ---
/// Label reported for every published bank.
pub const DRIVER_LABEL: &str = "gpio-nct610xd";
/// Default path of the Linux port I/O device.
pub const DEV_PORT_PATH: &str = "/dev/port";
/// Default directory for per-address region lock files.
pub const LOCK_DIR: &str = "/run/lock";
