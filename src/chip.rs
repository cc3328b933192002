//! Chip identification: finds a supported Super-I/O chip and enables its GPIO port.

use crate::consts::{self, gpio as regs, ld};
use crate::error::{Error, Result};
use crate::gpio::BankDescriptor;
use crate::port::PortIo;
use crate::session::{Session, SessionConfig};
use log::{debug, info};
use std::fmt;

/// Base (index port) address of a Super-I/O configuration port pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipAddress(u16);

impl ChipAddress {
    /// 0x2E, probed first.
    pub const PRIMARY: ChipAddress = ChipAddress(consts::SIO_PORT_PRIMARY);
    /// 0x4E, probed second.
    pub const SECONDARY: ChipAddress = ChipAddress(consts::SIO_PORT_SECONDARY);

    pub const fn new(port: u16) -> Self {
        ChipAddress(port)
    }

    /// Returns the index port address.
    #[inline]
    pub fn port(&self) -> u16 {
        self.0
    }

    /// The standard candidate list, in probe order.
    pub fn candidates() -> Vec<ChipAddress> {
        vec![Self::PRIMARY, Self::SECONDARY]
    }
}

impl fmt::Display for ChipAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

const NCT610XD_GPIO4: BankDescriptor = BankDescriptor::from_parts(
    regs::BANK0_PIN_BASE,
    regs::MAX_BANK_PINS,
    regs::REG_BANK0_BASE,
    regs::REG_MODE_GPIO4,
);
const _: () = assert!(NCT610XD_GPIO4.is_valid());

static NCT610XD_BANKS: [BankDescriptor; 1] = [NCT610XD_GPIO4];

/// Supported chip models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChipVariant {
    /// NCT6102D / NCT6104D / NCT6106D.
    Nct610xd,
}

impl ChipVariant {
    /// Every supported variant.
    pub const ALL: &'static [ChipVariant] = &[ChipVariant::Nct610xd];

    /// Maps a chip ID register value to a variant.
    pub fn from_chip_id(chip_id: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.chip_id() == chip_id)
    }

    pub fn chip_id(self) -> u16 {
        match self {
            ChipVariant::Nct610xd => consts::SIO_NCT610XD_ID,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChipVariant::Nct610xd => "nct610xd",
        }
    }

    /// Bits of the GPIO enable register (LD 0x07, CR 0x30) for the exposed ports.
    pub fn gpio_enable_mask(self) -> u8 {
        match self {
            ChipVariant::Nct610xd => regs::ENABLE_GPIO4,
        }
    }

    /// GPIO banks exposed for this variant.
    pub fn banks(self) -> &'static [BankDescriptor] {
        match self {
            ChipVariant::Nct610xd => &NCT610XD_BANKS,
        }
    }
}

impl fmt::Display for ChipVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A chip found by [`probe`]: where it lives and what it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipIdentity {
    address: ChipAddress,
    variant: ChipVariant,
}

impl ChipIdentity {
    /// Builds an identity from externally supplied platform data, without probing.
    pub fn new(address: ChipAddress, variant: ChipVariant) -> Self {
        Self { address, variant }
    }

    pub fn address(&self) -> ChipAddress {
        self.address
    }

    pub fn variant(&self) -> ChipVariant {
        self.variant
    }
}

/// Probes `candidates` in order and enables GPIO on the first supported chip.
///
/// Returns [`Error::NotFound`] if no candidate reports a supported chip ID.
/// Any other error (busy region, enable bit not latching, transport failure)
/// aborts the probe immediately.
pub fn probe<P: PortIo + ?Sized>(
    io: &P,
    candidates: &[ChipAddress],
    config: &SessionConfig,
) -> Result<ChipIdentity> {
    for &address in candidates {
        debug!("Probing Super-I/O at {}", address);
        if let Some(identity) = find_at(io, address, config)? {
            return Ok(identity);
        }
    }
    Err(Error::NotFound {
        tried: candidates.iter().map(ChipAddress::port).collect(),
    })
}

/// Identifies the chip at one address. `Ok(None)` means no supported chip there.
pub fn find_at<P: PortIo + ?Sized>(
    io: &P,
    address: ChipAddress,
    config: &SessionConfig,
) -> Result<Option<ChipIdentity>> {
    let mut session = Session::open(io, address.port(), config)?;

    let chip_id = session.read_u16(consts::SIO_CHIPID)?;
    let Some(variant) = ChipVariant::from_chip_id(chip_id) else {
        info!("Unsupported device 0x{:04x} at {}", chip_id, address);
        return Ok(None);
    };
    info!("Found {} at {} chip id 0x{:04x}", variant, address, chip_id);

    // Enablement happens in the same session as identification.
    session.select(ld::GPIO)?;
    let mask = variant.gpio_enable_mask();
    session.update_bits(regs::REG_ENABLE, mask, mask)?;
    let value = session.read(regs::REG_ENABLE)?;
    if value & mask == 0 {
        return Err(Error::EnableFailed {
            address: address.port(),
            value,
        });
    }
    info!("Enabled GPIO port, enable register 0x{:02x}", value);

    Ok(Some(ChipIdentity { address, variant }))
}
