//! RAM and ROM behind the Amiga memory map.

use commodore_agnus_ocs::ChipMemory;
use emu_core::{Component, StateVisitor};

pub const CHIP_RAM_BASE: u32 = 0x00_0000;
/// Chip RAM mirrors up to here.
pub const CHIP_RAM_END: u32 = 0x1F_FFFF;
pub const SLOW_RAM_BASE: u32 = 0xC0_0000;
pub const SLOW_RAM_END: u32 = 0xD7_FFFF;
pub const ROM_BASE: u32 = 0xF8_0000;
pub const ROM_END: u32 = 0xFF_FFFF;

/// What an undriven data bus reads as.
pub const OPEN_BUS: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct Memory {
    pub chip_ram: Vec<u8>,
    chip_ram_mask: u32,
    pub kickstart: Vec<u8>,
    kickstart_mask: u32,
    /// ROM appears at $000000 until CIA-A drives /OVL low.
    pub overlay: bool,
    pub slow_ram: Vec<u8>,
    slow_ram_mask: u32,
}

impl Memory {
    pub fn new(chip_ram_size: usize, kickstart: Vec<u8>, slow_ram_size: usize) -> Self {
        let kickstart_mask = mask_for(kickstart.len());
        Self {
            chip_ram: vec![0; chip_ram_size],
            chip_ram_mask: mask_for(chip_ram_size),
            kickstart,
            kickstart_mask,
            overlay: true,
            slow_ram: vec![0; slow_ram_size],
            slow_ram_mask: mask_for(slow_ram_size),
        }
    }

    /// Reallocate chip RAM. Contents are lost.
    pub fn set_chip_ram(&mut self, size: usize) {
        self.chip_ram = vec![0; size];
        self.chip_ram_mask = mask_for(size);
    }

    /// Reallocate slow RAM. Contents are lost.
    pub fn set_slow_ram(&mut self, size: usize) {
        self.slow_ram = vec![0; size];
        self.slow_ram_mask = mask_for(size);
    }

    /// Whether RAM or ROM answers at `addr`.
    #[must_use]
    pub fn decodes(&self, addr: u32) -> bool {
        match addr & 0xFF_FFFF {
            CHIP_RAM_BASE..=CHIP_RAM_END => !self.chip_ram.is_empty(),
            SLOW_RAM_BASE..=SLOW_RAM_END => self.slow_ram_offset(addr).is_some(),
            ROM_BASE..=ROM_END => !self.kickstart.is_empty(),
            _ => false,
        }
    }

    pub fn read_byte(&self, addr: u32) -> u8 {
        let addr = addr & 0xFF_FFFF;
        match addr {
            CHIP_RAM_BASE..=CHIP_RAM_END if self.overlay && !self.kickstart.is_empty() => {
                self.kickstart[(addr & self.kickstart_mask) as usize]
            }
            CHIP_RAM_BASE..=CHIP_RAM_END if !self.chip_ram.is_empty() => {
                self.chip_ram[(addr & self.chip_ram_mask) as usize]
            }
            SLOW_RAM_BASE..=SLOW_RAM_END => {
                self.slow_ram_offset(addr).map_or(OPEN_BUS, |off| self.slow_ram[off])
            }
            ROM_BASE..=ROM_END if !self.kickstart.is_empty() => {
                self.kickstart[(addr & self.kickstart_mask) as usize]
            }
            _ => OPEN_BUS,
        }
    }

    /// Write a byte. Writes under the overlay still land in chip RAM; ROM
    /// ignores them.
    pub fn write_byte(&mut self, addr: u32, val: u8) {
        let addr = addr & 0xFF_FFFF;
        match addr {
            CHIP_RAM_BASE..=CHIP_RAM_END if !self.chip_ram.is_empty() => {
                self.chip_ram[(addr & self.chip_ram_mask) as usize] = val;
            }
            SLOW_RAM_BASE..=SLOW_RAM_END => {
                if let Some(off) = self.slow_ram_offset(addr) {
                    self.slow_ram[off] = val;
                }
            }
            _ => {}
        }
    }

    /// Slow RAM mirrors at its size. A 1.5 MB board does not mirror.
    fn slow_ram_offset(&self, addr: u32) -> Option<usize> {
        if self.slow_ram.is_empty() {
            return None;
        }
        let rel = ((addr & 0xFF_FFFF) - SLOW_RAM_BASE) as usize;
        let off = if self.slow_ram.len().is_power_of_two() {
            rel & self.slow_ram_mask as usize
        } else {
            rel
        };
        (off < self.slow_ram.len()).then_some(off)
    }
}

fn mask_for(size: usize) -> u32 {
    (size as u32).wrapping_sub(1)
}

impl ChipMemory for Memory {
    fn read_chip_word(&self, addr: u32) -> u16 {
        self.chip_ram.read_chip_word(addr)
    }

    fn write_chip_word(&mut self, addr: u32, value: u16) {
        self.chip_ram.write_chip_word(addr, value);
    }
}

impl Component for Memory {
    fn name(&self) -> &'static str {
        "memory"
    }

    /// CIA-A comes out of reset with its port as input, so the pull-up on
    /// /OVL maps ROM back in.
    fn reset(&mut self, hard: bool) {
        self.overlay = true;
        if hard {
            self.chip_ram.fill(0);
            self.slow_ram.fill(0);
        }
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_bool(&mut self.overlay);
        visitor.visit_bytes(&mut self.chip_ram);
        visitor.visit_bytes(&mut self.slow_ram);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ks() -> Vec<u8> {
        let mut rom = vec![0u8; 256 * 1024];
        rom[0] = 0x11;
        rom[4] = 0xF8;
        rom
    }

    #[test]
    fn overlay_shows_rom_at_zero_but_writes_hit_ram() {
        let mut mem = Memory::new(512 * 1024, test_ks(), 0);
        assert_eq!(mem.read_byte(0), 0x11);
        mem.write_byte(0, 0x42);
        assert_eq!(mem.read_byte(0), 0x11);
        mem.overlay = false;
        assert_eq!(mem.read_byte(0), 0x42);
    }

    #[test]
    fn chip_ram_mirrors_within_its_window() {
        let mut mem = Memory::new(512 * 1024, test_ks(), 0);
        mem.overlay = false;
        mem.write_byte(0x00_1234, 0x5A);
        assert_eq!(mem.read_byte(0x08_1234), 0x5A);
        assert_eq!(mem.read_byte(0x18_1234), 0x5A);
        assert!(!mem.decodes(0x20_0000));
    }

    #[test]
    fn slow_ram_read_write_roundtrip() {
        let mut mem = Memory::new(512 * 1024, test_ks(), 512 * 1024);
        mem.write_byte(0xC0_0000, 0x42);
        mem.write_byte(0xC0_0001, 0xAB);
        assert_eq!(mem.read_byte(0xC0_0000), 0x42);
        assert_eq!(mem.read_byte(0xC0_0001), 0xAB);
    }

    #[test]
    fn slow_ram_unmapped_when_disabled() {
        let mem = Memory::new(512 * 1024, test_ks(), 0);
        assert!(!mem.decodes(0xC0_0000));
        assert_eq!(mem.read_byte(0xC0_0000), OPEN_BUS);
    }

    #[test]
    fn slow_ram_address_wrapping() {
        let mut mem = Memory::new(512 * 1024, test_ks(), 512 * 1024);
        mem.write_byte(0xC0_0000, 0xEE);
        assert_eq!(mem.read_byte(0xC8_0000), 0xEE);
    }

    #[test]
    fn one_and_a_half_megabytes_of_slow_ram_do_not_mirror() {
        let mem = Memory::new(512 * 1024, test_ks(), 1536 * 1024);
        assert!(mem.decodes(0xD7_FFFF));
        let mem = Memory::new(512 * 1024, test_ks(), 1024 * 1024);
        assert!(mem.decodes(0xD7_FFFF));
    }

    #[test]
    fn rom_ignores_writes_and_mirrors_256k() {
        let mut mem = Memory::new(512 * 1024, test_ks(), 0);
        mem.write_byte(ROM_BASE, 0);
        assert_eq!(mem.read_byte(ROM_BASE), 0x11);
        assert_eq!(mem.read_byte(0xFC_0004), 0xF8);
    }

    #[test]
    fn hard_reset_clears_ram_and_restores_overlay() {
        let mut mem = Memory::new(256 * 1024, test_ks(), 0);
        mem.overlay = false;
        mem.write_byte(0x100, 9);
        mem.reset(false);
        assert!(mem.overlay);
        assert_eq!(mem.chip_ram[0x100], 9);
        mem.reset(true);
        assert_eq!(mem.chip_ram[0x100], 0);
    }
}
