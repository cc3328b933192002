//! Tests for the Super-I/O session protocol and region exclusion.
//!
//! These run against the simulated chip and need no hardware.

use nct610xd_gpio::registers::{ld, SIO_CHIPID};
use nct610xd_gpio::sim::{PortAccess, SimulatedSuperIo};
use nct610xd_gpio::{Error, Session, SessionConfig};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn test_second_open_on_same_address_is_busy() {
    let sim = SimulatedSuperIo::nct610xd(0x2E);
    let config = SessionConfig::fail_fast();

    let first = Session::open(&sim, 0x2E, &config).expect("first open");
    match Session::open(&sim, 0x2E, &config) {
        Err(Error::AddressBusy { address }) => assert_eq!(address, 0x2E),
        Err(e) => panic!("Expected AddressBusy, got: {:?}", e),
        Ok(_) => panic!("Second session opened while first was held"),
    }
    // The failed attempt must not have touched the chip.
    assert!(sim.is_unlocked(0x2E));

    drop(first);
    let second = Session::open(&sim, 0x2E, &config).expect("open after release");
    assert!(sim.is_unlocked(0x2E));
    drop(second);
    assert!(!sim.is_claimed(0x2E));
}

#[test]
fn test_sessions_on_different_addresses_are_independent() {
    let sim = SimulatedSuperIo::nct610xd(0x2E).with_chip(0x4E, 0xD282);
    let config = SessionConfig::default();

    let a = Session::open(&sim, 0x2E, &config).unwrap();
    let b = Session::open(&sim, 0x4E, &config).unwrap();
    assert!(sim.is_claimed(0x2E) && sim.is_claimed(0x4E));
    drop(a);
    assert!(!sim.is_unlocked(0x2E));
    assert!(sim.is_unlocked(0x4E));
    drop(b);
}

#[test]
fn test_external_claim_makes_open_fail_fast() {
    let sim = SimulatedSuperIo::nct610xd(0x2E);
    assert!(sim.claim_externally(0x2E));
    sim.clear_accesses();

    let result = Session::open(&sim, 0x2E, &SessionConfig::fail_fast());
    assert!(matches!(result, Err(Error::AddressBusy { address: 0x2E })));
    assert!(sim.accesses().is_empty(), "no port access while busy");
    assert!(!sim.is_unlocked(0x2E));
}

#[test]
fn test_patient_open_waits_for_release() {
    let sim = Arc::new(SimulatedSuperIo::nct610xd(0x2E));
    assert!(sim.claim_externally(0x2E));

    let releaser = {
        let sim = Arc::clone(&sim);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            sim.release_externally(0x2E);
        })
    };

    let session = Session::open(&*sim, 0x2E, &SessionConfig::patient());
    releaser.join().unwrap();
    assert!(session.is_ok(), "patient open should succeed after release");
}

#[test]
fn test_patient_open_gives_up_eventually() {
    let sim = SimulatedSuperIo::nct610xd(0x2E);
    assert!(sim.claim_externally(0x2E));
    let config = SessionConfig {
        busy_retries: 2,
        busy_retry_delay: Duration::from_millis(1),
    };
    assert!(matches!(
        Session::open(&sim, 0x2E, &config),
        Err(Error::AddressBusy { .. })
    ));
}

#[test]
fn test_register_access_writes_index_before_data() {
    let sim = SimulatedSuperIo::nct610xd(0x2E);
    let mut session = Session::open(&sim, 0x2E, &SessionConfig::default()).unwrap();
    session.select(ld::GPIO).unwrap();
    sim.clear_accesses();

    session.write(0xF1, 0x5A).unwrap();
    assert_eq!(session.read(0xF1).unwrap(), 0x5A);

    assert_eq!(
        sim.accesses(),
        vec![
            PortAccess::Write { port: 0x2E, value: 0xF1 },
            PortAccess::Write { port: 0x2F, value: 0x5A },
            PortAccess::Write { port: 0x2E, value: 0xF1 },
            PortAccess::Read { port: 0x2F, value: 0x5A },
        ]
    );
}

#[test]
fn test_select_is_reentrant() {
    let sim = SimulatedSuperIo::nct610xd(0x2E);
    sim.set_register(0x2E, ld::GPIO, 0xE3, 0x11);
    sim.set_register(0x2E, ld::GPIO_MODE, 0xE3, 0x22);

    let mut session = Session::open(&sim, 0x2E, &SessionConfig::default()).unwrap();
    session.select(ld::GPIO).unwrap();
    assert_eq!(session.read(0xE3).unwrap(), 0x11);
    session.select(ld::GPIO_MODE).unwrap();
    assert_eq!(session.read(0xE3).unwrap(), 0x22);
    session.select(ld::GPIO).unwrap();
    assert_eq!(session.read(0xE3).unwrap(), 0x11);
}

#[test]
fn test_chip_id_is_big_endian() {
    let sim = SimulatedSuperIo::new().with_chip(0x4E, 0x1234);
    let session = Session::open(&sim, 0x4E, &SessionConfig::default()).unwrap();
    assert_eq!(session.read_u16(SIO_CHIPID).unwrap(), 0x1234);
}

#[test]
fn test_error_inside_session_still_releases() {
    let sim = SimulatedSuperIo::nct610xd(0x2E);
    let result = (|| -> nct610xd_gpio::Result<u8> {
        let session = Session::open(&sim, 0x2E, &SessionConfig::default())?;
        // No logical device selected yet.
        session.read(0xF0)
    })();

    assert!(matches!(result, Err(Error::NoLogicalDevice { register: 0xF0 })));
    assert!(!sim.is_claimed(0x2E));
    assert!(!sim.is_unlocked(0x2E));
    assert_eq!(sim.accesses().last(), Some(&PortAccess::Release(0x2E)));
}

#[test]
fn test_concurrent_opens_exactly_one_wins() {
    let sim = SimulatedSuperIo::nct610xd(0x2E);
    let attempted = Barrier::new(2);
    let config = SessionConfig::fail_fast();

    let results: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    let session = Session::open(&sim, 0x2E, &config);
                    // Hold any session until both threads have tried.
                    attempted.wait();
                    match session {
                        Ok(_) => true,
                        Err(Error::AddressBusy { .. }) => false,
                        Err(e) => panic!("Unexpected error: {:?}", e),
                    }
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|won| **won).count(), 1);
    assert!(!sim.is_claimed(0x2E));
}
