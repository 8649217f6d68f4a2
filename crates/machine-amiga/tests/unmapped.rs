//! Accesses nothing answers are reported, not fatal.

use emu_core::Bus;
use machine_amiga::{Amiga, AmigaConfig, BusError};

fn machine() -> Amiga {
    Amiga::new(AmigaConfig { chip_ram_kb: 256, ..AmigaConfig::default() }).expect("machine")
}

#[test]
fn holes_in_the_map_are_unmapped() {
    let amiga = machine();
    for address in [0x20_0000, 0xA0_0000, 0xC0_0000, 0xE8_0000, 0xF0_0000, 0xF8_0000] {
        assert_eq!(
            amiga.try_peek(address),
            Err(BusError::Unmapped { address, write: false }),
            "${address:06X}"
        );
        assert_eq!(amiga.peek(address), 0xFF);
    }
}

#[test]
fn chip_ram_mirrors_across_its_window() {
    let mut amiga = machine();
    amiga.poke(0x10, 0x5A);
    assert_eq!(amiga.try_peek(0x04_0010), Ok(0x5A));
    assert_eq!(amiga.try_peek(0x1C_0010), Ok(0x5A));
}

#[test]
fn cpu_accesses_are_recorded_and_taken() {
    let mut amiga = machine();
    assert_eq!(amiga.bus.read(0xA0_1234), 0xFF);
    assert_eq!(
        amiga.take_unmapped(),
        Some(BusError::Unmapped { address: 0xA0_1234, write: false })
    );
    assert_eq!(amiga.take_unmapped(), None);

    assert_eq!(
        amiga.try_poke(0xF0_0001, 7),
        Err(BusError::Unmapped { address: 0xF0_0001, write: true })
    );
    amiga.bus.write(0xF0_0002, 7);
    let info = amiga.info();
    assert_eq!(info.unmapped_accesses, 3);
    assert_eq!(info.last_unmapped, Some(BusError::Unmapped { address: 0xF0_0002, write: true }));
}

#[test]
fn peeks_are_not_recorded() {
    let amiga = machine();
    assert!(amiga.try_peek(0xA0_0000).is_err());
    assert_eq!(amiga.bus.unmapped_accesses(), 0);
    assert_eq!(amiga.bus.last_unmapped(), None);
}

#[test]
fn the_machine_keeps_running_after_a_fault() {
    let mut amiga = machine();
    for addr in 0xA0_0000..0xA0_0100 {
        amiga.poke(addr, 0);
    }
    amiga.run_frame();
    assert_eq!(amiga.bus.agnus.frame.nr, 1);
    assert_eq!(amiga.bus.unmapped_accesses(), 0x100);

    amiga.reset(false);
    assert_eq!(amiga.bus.unmapped_accesses(), 0);
    assert_eq!(amiga.take_unmapped(), None);
}

#[test]
fn error_names_the_address() {
    let err = BusError::Unmapped { address: 0xF0_0000, write: false };
    assert_eq!(err.to_string(), "unmapped access at $F00000 (write: false)");
}
