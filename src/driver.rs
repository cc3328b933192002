//! Driver lifecycle: probe once, publish every bank, unpublish on shutdown.

use crate::chip::{self, ChipAddress, ChipIdentity};
use crate::consts;
use crate::error::Result;
use crate::gpio::BankController;
use crate::host::{GpioChip, GpioHost};
use crate::port::PortIo;
use crate::session::SessionConfig;
use log::{debug, info, warn};
use std::sync::Arc;

/// Startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Addresses probed in order.
    pub candidates: Vec<ChipAddress>,
    /// Busy policy for every session, startup and per-pin.
    pub session: SessionConfig,
    /// Label reported for published banks.
    pub label: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            candidates: ChipAddress::candidates(),
            session: SessionConfig::default(),
            label: consts::DRIVER_LABEL.to_string(),
        }
    }
}

/// An identified chip and a controller for each of its GPIO banks.
pub struct ChipController<P: PortIo + ?Sized> {
    identity: ChipIdentity,
    banks: Vec<Arc<BankController<P>>>,
}

impl<P: PortIo + ?Sized> ChipController<P> {
    /// Probes `config.candidates` and builds controllers for the chip found.
    pub fn probe(io: Arc<P>, config: &DriverConfig) -> Result<Self> {
        let identity = chip::probe(&*io, &config.candidates, &config.session)?;
        Ok(Self::new(io, identity, config))
    }

    /// Builds controllers for an already identified chip. Does no port I/O.
    pub fn new(io: Arc<P>, identity: ChipIdentity, config: &DriverConfig) -> Self {
        let banks = identity
            .variant()
            .banks()
            .iter()
            .map(|bank| {
                Arc::new(BankController::new(
                    Arc::clone(&io),
                    identity.address(),
                    *bank,
                    config.session.clone(),
                    config.label.clone(),
                ))
            })
            .collect();
        Self { identity, banks }
    }

    pub fn identity(&self) -> &ChipIdentity {
        &self.identity
    }

    pub fn banks(&self) -> &[Arc<BankController<P>>] {
        &self.banks
    }

    /// The bank containing global pin number `pin`.
    pub fn bank_for_pin(&self, pin: u32) -> Option<&Arc<BankController<P>>> {
        self.banks.iter().find(|b| b.descriptor().contains(pin))
    }
}

/// A running driver: chip controller plus the banks it published to `H`.
///
/// Dropping the driver unpublishes every bank. The chip's GPIO enable bit is
/// left set; there is no disable step.
pub struct Driver<P: PortIo + ?Sized + 'static, H: GpioHost> {
    controller: ChipController<P>,
    host: H,
    published: Vec<u32>,
}

impl<P: PortIo + ?Sized + 'static, H: GpioHost> Driver<P, H> {
    /// Probes for the chip and publishes each bank to `host`.
    ///
    /// On any error nothing stays published.
    pub fn start(io: Arc<P>, host: H, config: &DriverConfig) -> Result<Self> {
        let controller = ChipController::probe(io, config)?;
        Self::publish(controller, host)
    }

    /// Publishes the banks of an already identified chip.
    pub fn publish(controller: ChipController<P>, host: H) -> Result<Self> {
        let mut driver = Self {
            controller,
            host,
            published: Vec::new(),
        };
        let banks: Vec<Arc<BankController<P>>> = driver.controller.banks().to_vec();
        for (i, bank) in banks.into_iter().enumerate() {
            let base = bank.descriptor().pin_base();
            let chip: Arc<dyn GpioChip> = bank;
            if let Err(e) = driver.host.add_chip(chip) {
                warn!("Failed to register gpiochip {}: {}", i, e);
                // Dropping `driver` withdraws the banks published so far.
                return Err(e);
            }
            driver.published.push(base);
        }
        info!(
            "Driver started for {} at {} ({} bank(s))",
            driver.controller.identity().variant(),
            driver.controller.identity().address(),
            driver.published.len()
        );
        Ok(driver)
    }

    pub fn controller(&self) -> &ChipController<P> {
        &self.controller
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Unpublishes every bank and releases the chip.
    pub fn shutdown(mut self) {
        self.unpublish();
        info!("Driver stopped");
    }

    fn unpublish(&mut self) {
        for base in self.published.drain(..).rev() {
            if self.host.remove_chip(base).is_none() {
                warn!("Bank at pin {} was not registered with the host", base);
            } else {
                debug!("Unpublished bank at pin {}", base);
            }
        }
    }
}

impl<P: PortIo + ?Sized + 'static, H: GpioHost> Drop for Driver<P, H> {
    fn drop(&mut self) {
        if !self.published.is_empty() {
            self.unpublish();
            info!("Driver stopped");
        }
    }
}
