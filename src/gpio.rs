use crate::chip::ChipAddress;
use crate::consts::{gpio as regs, ld};
use crate::error::{self, Error, Result};
use crate::port::PortIo;
use crate::session::{Session, SessionConfig};
use log::{debug, trace};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioDirection {
    Input,
    Output,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioLevel {
    Low,
    High,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    PushPull,
    OpenDrain,
}

impl GpioLevel {
    #[inline]
    pub fn is_high(self) -> bool {
        self == GpioLevel::High
    }
}

impl From<bool> for GpioLevel {
    fn from(high: bool) -> Self {
        if high {
            GpioLevel::High
        } else {
            GpioLevel::Low
        }
    }
}

/// Static layout of one GPIO bank (up to 8 pins backed by one register pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankDescriptor {
    pin_base: u32,
    pin_count: u8,
    register_offset: u8,
    mode_register: u8,
}

impl BankDescriptor {
    /// `register_offset` is the direction register; data follows at `+1`.
    /// `mode_register` is the push-pull/open-drain register in LD 0x0F.
    ///
    /// Fails with [`Error::InvalidBank`] unless the bank has at most 8 pins,
    /// its data register fits below 0x100 and its last pin number fits in a `u32`.
    pub fn new(
        pin_base: u32,
        pin_count: u8,
        register_offset: u8,
        mode_register: u8,
    ) -> Result<Self> {
        let bank = Self::from_parts(pin_base, pin_count, register_offset, mode_register);
        if bank.is_valid() {
            Ok(bank)
        } else {
            Err(Error::InvalidBank {
                pin_base,
                pin_count,
                register_offset,
            })
        }
    }

    /// Unchecked constructor for static chip tables, which assert
    /// [`BankDescriptor::is_valid`] at compile time.
    pub(crate) const fn from_parts(
        pin_base: u32,
        pin_count: u8,
        register_offset: u8,
        mode_register: u8,
    ) -> Self {
        Self {
            pin_base,
            pin_count,
            register_offset,
            mode_register,
        }
    }

    pub(crate) const fn is_valid(&self) -> bool {
        self.pin_count <= regs::MAX_BANK_PINS
            && self.register_offset.checked_add(regs::DATA_OFFSET).is_some()
            && self.pin_base.checked_add(self.pin_count as u32).is_some()
    }

    /// Global number of the bank's first pin.
    #[inline]
    pub fn pin_base(&self) -> u32 {
        self.pin_base
    }

    #[inline]
    pub fn pin_count(&self) -> u8 {
        self.pin_count
    }

    #[inline]
    pub fn direction_register(&self) -> u8 {
        self.register_offset + regs::DIR_OFFSET
    }

    #[inline]
    pub fn data_register(&self) -> u8 {
        self.register_offset + regs::DATA_OFFSET
    }

    #[inline]
    pub fn mode_register(&self) -> u8 {
        self.mode_register
    }

    /// Returns the bit mask (1 << offset) for `offset`, or an error if the
    /// offset is not in this bank.
    pub fn mask(&self, offset: u8) -> Result<u8> {
        if offset < self.pin_count && offset < regs::MAX_BANK_PINS {
            Ok(1u8 << offset)
        } else {
            Err(error::pin_out_of_range(offset, self.pin_count))
        }
    }

    /// Whether the global pin number belongs to this bank.
    pub fn contains(&self, pin: u32) -> bool {
        pin >= self.pin_base && pin - self.pin_base < u32::from(self.pin_count)
    }
}

/// Pin operations for one GPIO bank of an identified chip.
///
/// Every operation opens its own [`Session`], does its register
/// read-modify-write with the GPIO logical device selected, and closes the
/// session before returning. Register contents are never cached.
pub struct BankController<P: PortIo + ?Sized> {
    io: Arc<P>,
    address: ChipAddress,
    bank: BankDescriptor,
    config: SessionConfig,
    label: String,
}

impl<P: PortIo + ?Sized> BankController<P> {
    pub fn new(
        io: Arc<P>,
        address: ChipAddress,
        bank: BankDescriptor,
        config: SessionConfig,
        label: impl Into<String>,
    ) -> Self {
        Self {
            io,
            address,
            bank,
            config,
            label: label.into(),
        }
    }

    pub fn descriptor(&self) -> &BankDescriptor {
        &self.bank
    }

    pub fn address(&self) -> ChipAddress {
        self.address
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn session(&self, device: u8) -> Result<Session<'_, P>> {
        let mut session = Session::open(&*self.io, self.address.port(), &self.config)?;
        session.select(device)?;
        Ok(session)
    }

    // --- Single Pin GPIO ---
    /// Gets the configured direction of a pin.
    pub fn get_direction(&self, offset: u8) -> Result<GpioDirection> {
        let mask = self.bank.mask(offset)?;
        let session = self.session(ld::GPIO)?;
        let dir = session.read(self.bank.direction_register())?;
        Ok(if dir & mask != 0 {
            GpioDirection::Input
        } else {
            GpioDirection::Output
        })
    }

    /// Configures a pin as input. The data register is left alone.
    pub fn set_direction_input(&self, offset: u8) -> Result<()> {
        let mask = self.bank.mask(offset)?;
        let session = self.session(ld::GPIO)?;
        let reg = self.bank.direction_register();
        let dir = session.update_bits(reg, mask, mask)?;
        debug!("GPIO{} direction input (dir=0x{:02x})", self.pin(offset), dir);
        Ok(())
    }

    /// Reads the data register bit of a pin: the sensed level for inputs,
    /// the driven level for outputs.
    pub fn get_value(&self, offset: u8) -> Result<GpioLevel> {
        let mask = self.bank.mask(offset)?;
        let session = self.session(ld::GPIO)?;
        let reg = self.bank.data_register();
        let data = session.read(reg)?;
        trace!(
            "Read GPIO{}: reg=0x{:02x}, mask=0x{:02x}, value=0x{:02x}",
            self.pin(offset),
            reg,
            mask,
            data
        );
        Ok(GpioLevel::from(data & mask != 0))
    }

    /// Configures a pin as output driving `level`.
    ///
    /// The data bit is written before the direction bit is cleared, so the
    /// pin never drives a stale level.
    pub fn set_direction_output(&self, offset: u8, level: GpioLevel) -> Result<()> {
        let mask = self.bank.mask(offset)?;
        let session = self.session(ld::GPIO)?;
        let bits = if level.is_high() { mask } else { 0 };
        session.update_bits(self.bank.data_register(), mask, bits)?;
        let dir = session.update_bits(self.bank.direction_register(), mask, 0)?;
        debug!(
            "GPIO{} direction output {:?} (dir=0x{:02x})",
            self.pin(offset),
            level,
            dir
        );
        Ok(())
    }

    /// Sets the data bit of a pin. Has no electrical effect while the pin is an input.
    pub fn set_value(&self, offset: u8, level: GpioLevel) -> Result<()> {
        let mask = self.bank.mask(offset)?;
        let session = self.session(ld::GPIO)?;
        let bits = if level.is_high() { mask } else { 0 };
        let data = session.update_bits(self.bank.data_register(), mask, bits)?;
        trace!("Set GPIO{} {:?} (data=0x{:02x})", self.pin(offset), level, data);
        Ok(())
    }

    /// Gets the output driver type of a pin.
    ///
    /// **Note:** The mode register address is unverified (see
    /// `registers::REG_MODE_GPIO4`), so the result may describe another port.
    pub fn drive_mode(&self, offset: u8) -> Result<DriveMode> {
        let mask = self.bank.mask(offset)?;
        let session = self.session(ld::GPIO_MODE)?;
        let mode = session.read(self.bank.mode_register())?;
        Ok(if mode & mask != 0 {
            DriveMode::OpenDrain
        } else {
            DriveMode::PushPull
        })
    }

    /// Selects push-pull or open-drain output for a pin.
    ///
    /// **Note:** The mode register address is unverified (see
    /// `registers::REG_MODE_GPIO4`). If it is wrong, this changes the driver
    /// type of a pin on another port. Check the board's datasheet first.
    pub fn set_drive_mode(&self, offset: u8, mode: DriveMode) -> Result<()> {
        let mask = self.bank.mask(offset)?;
        let session = self.session(ld::GPIO_MODE)?;
        let bits = match mode {
            DriveMode::OpenDrain => mask,
            DriveMode::PushPull => 0,
        };
        let value = session.update_bits(self.bank.mode_register(), mask, bits)?;
        debug!("GPIO{} drive mode {:?} (mode=0x{:02x})", self.pin(offset), mode, value);
        Ok(())
    }

    // --- Whole Bank ---
    /// Reads the data register of the whole bank in one session.
    pub fn read_bank(&self) -> Result<u8> {
        let session = self.session(ld::GPIO)?;
        session.read(self.bank.data_register())
    }

    /// Reads the direction register of the whole bank (bit set = input).
    pub fn direction_mask(&self) -> Result<u8> {
        let session = self.session(ld::GPIO)?;
        session.read(self.bank.direction_register())
    }

    #[inline]
    fn pin(&self, offset: u8) -> u32 {
        self.bank.pin_base + u32::from(offset)
    }
}
