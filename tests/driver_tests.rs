//! Driver lifecycle and host dispatch against the simulated chip.

use nct610xd_gpio::host::GpioChip;
use nct610xd_gpio::registers::ld;
use nct610xd_gpio::sim::SimulatedSuperIo;
use nct610xd_gpio::{
    ChipAddress, ChipController, ChipIdentity, ChipVariant, Driver, DriverConfig, Error,
    GpioDirection, GpioHost, GpioLevel, PinTable, Result,
};
use std::sync::Arc;

/// Host that accepts nothing, to exercise startup rollback.
#[derive(Default)]
struct RejectingHost {
    added: usize,
    removed: usize,
}

impl GpioHost for RejectingHost {
    fn add_chip(&mut self, chip: Arc<dyn GpioChip>) -> Result<()> {
        self.added += 1;
        Err(Error::BaseConflict {
            base: chip.base(),
            count: chip.ngpio(),
        })
    }
    fn remove_chip(&mut self, _base: u32) -> Option<Arc<dyn GpioChip>> {
        self.removed += 1;
        None
    }
}

/// Bank with an arbitrary pin range and no hardware behind it.
struct FixedRangeChip {
    base: u32,
    ngpio: u8,
}

impl GpioChip for FixedRangeChip {
    fn label(&self) -> &str {
        "fixed"
    }
    fn base(&self) -> u32 {
        self.base
    }
    fn ngpio(&self) -> u8 {
        self.ngpio
    }
    fn get_direction(&self, _offset: u8) -> Result<GpioDirection> {
        Ok(GpioDirection::Input)
    }
    fn direction_input(&self, _offset: u8) -> Result<()> {
        Ok(())
    }
    fn get(&self, _offset: u8) -> Result<GpioLevel> {
        Ok(GpioLevel::Low)
    }
    fn direction_output(&self, _offset: u8, _level: GpioLevel) -> Result<()> {
        Ok(())
    }
    fn set(&self, _offset: u8, _level: GpioLevel) -> Result<()> {
        Ok(())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn sim_with_inputs() -> Arc<SimulatedSuperIo> {
    init_logging();
    let sim = Arc::new(SimulatedSuperIo::nct610xd(0x2E));
    sim.set_register(0x2E, ld::GPIO, 0xF0, 0xFF);
    sim
}

#[test]
fn test_driver_config_default() {
    let config = DriverConfig::default();
    assert_eq!(config.candidates, vec![ChipAddress::new(0x2E), ChipAddress::new(0x4E)]);
    assert_eq!(config.session.busy_retries, 0);
    assert_eq!(config.label, "gpio-nct610xd");
}

#[test]
fn test_start_publishes_bank_at_pin_40() {
    let sim = sim_with_inputs();
    let mut table = PinTable::new();
    {
        let driver = Driver::start(Arc::clone(&sim), &mut table, &DriverConfig::default())
            .expect("driver should start");
        assert_eq!(
            driver.controller().identity().variant(),
            ChipVariant::Nct610xd
        );
        assert_eq!(driver.host().ranges(), vec![(40, 8, "gpio-nct610xd".to_string())]);
        assert_eq!(driver.host().pins(), (40..48).collect::<Vec<u32>>());
        driver.shutdown();
    }
    assert!(table.is_empty(), "shutdown must unpublish every bank");
}

#[test]
fn test_host_dispatch_by_global_pin() {
    let sim = sim_with_inputs();
    let driver = Driver::start(Arc::clone(&sim), PinTable::new(), &DriverConfig::default()).unwrap();
    let pins = driver.host();

    pins.direction_output(42, GpioLevel::High).unwrap();
    assert_eq!(pins.get_direction(42).unwrap(), GpioDirection::Output);
    assert_eq!(pins.get(42).unwrap(), GpioLevel::High);
    assert_eq!(sim.register(0x2E, ld::GPIO, 0xF1), 0b0000_0100);

    pins.set(42, GpioLevel::Low).unwrap();
    assert_eq!(pins.get(42).unwrap(), GpioLevel::Low);

    pins.direction_input(42).unwrap();
    assert_eq!(pins.get_direction(42).unwrap(), GpioDirection::Input);

    assert!(matches!(pins.get(39), Err(Error::UnknownPin { pin: 39 })));
    assert!(matches!(pins.get(48), Err(Error::UnknownPin { pin: 48 })));
}

#[test]
fn test_start_without_chip_publishes_nothing() {
    init_logging();
    let sim = Arc::new(SimulatedSuperIo::new());
    let mut table = PinTable::new();
    let result = Driver::start(sim, &mut table, &DriverConfig::default());
    assert!(matches!(result, Err(Error::NotFound { .. })));
    drop(result);
    assert!(table.is_empty());
}

#[test]
fn test_start_with_enable_failure_publishes_nothing() {
    let sim = sim_with_inputs();
    sim.stick_enable_bits(0x2E, 0x10);
    let mut table = PinTable::new();
    let result = Driver::start(Arc::clone(&sim), &mut table, &DriverConfig::default());
    assert!(matches!(result, Err(Error::EnableFailed { .. })));
    drop(result);
    assert!(table.is_empty());
    assert!(!sim.is_claimed(0x2E));
}

#[test]
fn test_registration_failure_aborts_start() {
    let sim = sim_with_inputs();
    let mut host = RejectingHost::default();
    let result = Driver::start(sim, &mut host, &DriverConfig::default());
    assert!(matches!(result, Err(Error::BaseConflict { base: 40, count: 8 })));
    drop(result);
    assert_eq!(host.added, 1);
    assert_eq!(host.removed, 0, "nothing was published, nothing to withdraw");
}

#[test]
fn test_overlapping_registration_is_rejected() {
    let sim = sim_with_inputs();
    let identity = ChipIdentity::new(ChipAddress::PRIMARY, ChipVariant::Nct610xd);
    let controller = ChipController::new(sim, identity, &DriverConfig::default());
    let bank: Arc<dyn GpioChip> = controller.banks()[0].clone();

    let mut table = PinTable::new();
    table.add_chip(Arc::clone(&bank)).unwrap();
    assert!(matches!(
        table.add_chip(bank),
        Err(Error::BaseConflict { base: 40, .. })
    ));
    assert_eq!(table.len(), 1);
    assert!(table.remove_chip(40).is_some());
    assert!(table.remove_chip(40).is_none());
}

#[test]
fn test_dropping_driver_unpublishes() {
    let sim = sim_with_inputs();
    let mut table = PinTable::new();
    {
        let _driver = Driver::start(sim, &mut table, &DriverConfig::default()).unwrap();
    }
    assert!(table.is_empty());
}

#[test]
fn test_controller_from_platform_data_does_no_io() {
    let sim = sim_with_inputs();
    let identity = ChipIdentity::new(ChipAddress::PRIMARY, ChipVariant::Nct610xd);
    let controller = ChipController::new(Arc::clone(&sim), identity, &DriverConfig::default());

    assert!(sim.accesses().is_empty());
    assert_eq!(controller.banks().len(), 1);
    assert!(controller.bank_for_pin(47).is_some());
    assert!(controller.bank_for_pin(48).is_none());
    assert!(controller.banks()[0].can_sleep());
}

#[test]
fn test_registration_at_top_of_pin_space() {
    let mut table = PinTable::new();
    let past_end = Arc::new(FixedRangeChip {
        base: u32::MAX - 3,
        ngpio: 8,
    });
    assert!(matches!(
        table.add_chip(past_end),
        Err(Error::PinRangeOverflow { base, count: 8 }) if base == u32::MAX - 3
    ));
    assert!(table.is_empty());

    // The last bank that still fits ends exactly at u32::MAX.
    let top = Arc::new(FixedRangeChip {
        base: u32::MAX - 8,
        ngpio: 8,
    });
    table.add_chip(top).unwrap();
    assert_eq!(table.pins().last(), Some(&(u32::MAX - 1)));
    assert_eq!(table.get(u32::MAX - 1).unwrap(), GpioLevel::Low);
    assert!(matches!(
        table.get(u32::MAX),
        Err(Error::UnknownPin { pin: u32::MAX })
    ));

    let overlapping = Arc::new(FixedRangeChip {
        base: u32::MAX - 4,
        ngpio: 2,
    });
    assert!(matches!(
        table.add_chip(overlapping),
        Err(Error::BaseConflict { count: 2, .. })
    ));
}
