//! Identifies the Super-I/O chip and enables its GPIO port.
//!
//! Run as root: `cargo run --example probe`
use nct610xd_gpio::{probe, ChipAddress, DevPort, Error, Result, SessionConfig};

fn main() -> Result<()> {
    env_logger::init();
    let io = DevPort::new()?;

    match probe(&io, &ChipAddress::candidates(), &SessionConfig::patient()) {
        Ok(identity) => {
            println!(
                "Found {} at {} (GPIO bank enabled)",
                identity.variant(),
                identity.address()
            );
            for bank in identity.variant().banks() {
                println!(
                    "  pins {}..{} dir=0x{:02X} data=0x{:02X}",
                    bank.pin_base(),
                    bank.pin_base() + u32::from(bank.pin_count()),
                    bank.direction_register(),
                    bank.data_register()
                );
            }
            Ok(())
        }
        Err(Error::NotFound { tried }) => {
            eprintln!("No supported Super-I/O chip found at {:04X?}", tried);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
