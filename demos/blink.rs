use nct610xd_gpio::{DevPort, Driver, DriverConfig, GpioLevel, PinTable, Result};
use std::sync::Arc;
use std::{env, thread, time::Duration};

// GPIO40 is the first pin of the GPIO4 bank
const DEFAULT_PIN: u32 = 40;

fn main() -> Result<()> {
    env_logger::init();
    let pin = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_PIN);

    let io = Arc::new(DevPort::new()?);
    println!("Starting driver...");
    let driver = Driver::start(io, PinTable::new(), &DriverConfig::default())?;
    let pins = driver.host();

    println!("Blinking pin {} (10 cycles)", pin);
    pins.direction_output(pin, GpioLevel::Low)?;
    for _ in 0..10 {
        pins.set(pin, GpioLevel::High)?;
        thread::sleep(Duration::from_millis(250));
        pins.set(pin, GpioLevel::Low)?;
        thread::sleep(Duration::from_millis(250));
    }

    // Set back to input
    pins.direction_input(pin)?;
    driver.shutdown();
    Ok(())
}
