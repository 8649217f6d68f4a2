//! Zorro II autoconfig as Kickstart drives it over the CPU bus.

use emu_core::Bus;
use machine_amiga::commodore_buster::ConfigState;
use machine_amiga::{Amiga, AmigaConfig, BusError, ConfigOption};

const FAST_BASE: u32 = 0x20_0000;

fn with_fast_ram(kb: usize) -> Amiga {
    Amiga::new(AmigaConfig { fast_ram_kb: kb, ..AmigaConfig::default() }).expect("machine")
}

fn configure_at(amiga: &mut Amiga, base: u32) {
    amiga.bus.write(0xE8_004A, ((base >> 12) & 0xF0) as u8);
    amiga.bus.write(0xE8_0048, ((base >> 16) & 0xF0) as u8);
}

#[test]
fn board_identifies_itself_in_the_window() {
    let mut amiga = with_fast_ram(1024);
    // er_Type: Zorro II, link into the free pool. Then the 1 MB size code.
    assert_eq!(amiga.bus.read(0xE8_0000), 0xEF);
    assert_eq!(amiga.bus.read(0xE8_0002), 0x5F);
    assert_eq!(amiga.bus.zorro.state(), ConfigState::Unconfigured);
    assert_eq!(
        amiga.try_peek(FAST_BASE),
        Err(BusError::Unmapped { address: FAST_BASE, write: false })
    );
}

#[test]
fn writing_the_base_maps_fast_ram() {
    let mut amiga = with_fast_ram(1024);
    configure_at(&mut amiga, FAST_BASE);
    assert_eq!(amiga.bus.zorro.state(), ConfigState::Configured);
    assert_eq!(amiga.bus.zorro.base(), FAST_BASE);

    amiga.bus.write(FAST_BASE + 0x1234, 0x77);
    assert_eq!(amiga.bus.read(FAST_BASE + 0x1234), 0x77);
    assert_eq!(amiga.peek(FAST_BASE + 0xF_FFFF), 0);
    assert!(amiga.try_peek(FAST_BASE + 0x10_0000).is_err());
    // The window closes once the only board is configured.
    assert!(amiga.try_peek(0xE8_0000).is_err());
    assert_eq!(amiga.take_unmapped(), None, "peeks are not recorded");
}

#[test]
fn shut_up_board_stays_off_the_bus() {
    let mut amiga = with_fast_ram(512);
    amiga.bus.write(0xE8_004C, 0);
    assert_eq!(amiga.bus.zorro.state(), ConfigState::ShutUp);
    assert!(amiga.try_peek(0xE8_0000).is_err());
    configure_at(&mut amiga, FAST_BASE);
    assert!(amiga.try_peek(FAST_BASE).is_err());
}

#[test]
fn reset_unconfigures_and_power_cycle_clears() {
    let mut amiga = with_fast_ram(1024);
    configure_at(&mut amiga, FAST_BASE);
    amiga.poke(FAST_BASE, 0x99);

    amiga.reset(false);
    assert_eq!(amiga.bus.zorro.state(), ConfigState::Unconfigured);
    assert_eq!(amiga.bus.read(0xE8_0000), 0xEF);
    configure_at(&mut amiga, FAST_BASE);
    assert_eq!(amiga.peek(FAST_BASE), 0x99, "soft reset keeps RAM contents");

    amiga.reset(true);
    configure_at(&mut amiga, FAST_BASE);
    assert_eq!(amiga.peek(FAST_BASE), 0);
}

#[test]
fn no_board_means_no_window() {
    let mut amiga = with_fast_ram(0);
    assert!(amiga.try_peek(0xE8_0000).is_err());
    amiga.configure(ConfigOption::FastRam, 2048).expect("fast RAM");
    assert_eq!(amiga.bus.read(0xE8_0002), 0x6F);
    assert!(amiga.configure(ConfigOption::FastRam, 3000).is_err());
    assert_eq!(amiga.config().fast_ram_kb, 2048);
}
