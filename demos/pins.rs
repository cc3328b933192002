//! Dumps direction and level of every exposed pin.
//!
//! Pass `--modes` to also read the push-pull/open-drain setting, whose
//! register address is not yet verified against the datasheet.
use nct610xd_gpio::{DevPort, DriveMode, Driver, DriverConfig, GpioDirection, PinTable, Result};
use std::env;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();
    let show_modes = env::args().skip(1).any(|arg| arg == "--modes");

    let io = Arc::new(DevPort::new()?);
    let driver = Driver::start(io, PinTable::new(), &DriverConfig::default())?;
    let identity = driver.controller().identity();
    println!("{} at {}", identity.variant(), identity.address());

    for bank in driver.controller().banks() {
        let desc = bank.descriptor();
        println!(
            "Bank at pin {}: direction=0x{:02X} data=0x{:02X}",
            desc.pin_base(),
            bank.direction_mask()?,
            bank.read_bank()?
        );
        for offset in 0..desc.pin_count() {
            let dir = match bank.get_direction(offset)? {
                GpioDirection::Input => "in ",
                GpioDirection::Output => "out",
            };
            let mode = if show_modes {
                match bank.drive_mode(offset)? {
                    DriveMode::PushPull => "push-pull (unverified)",
                    DriveMode::OpenDrain => "open-drain (unverified)",
                }
            } else {
                ""
            };
            println!(
                "  GPIO{:<3} {} {:?} {}",
                desc.pin_base() + u32::from(offset),
                dir,
                bank.get_value(offset)?,
                mode
            );
        }
    }
    Ok(())
}
