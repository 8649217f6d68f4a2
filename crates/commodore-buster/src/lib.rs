//! Commodore Buster: Zorro II expansion bus controller.
//!
//! Buster arbitrates the Zorro II slots and runs the autoconfig handshake.
//! This model carries a single Fast RAM board: while unconfigured it answers
//! in the $E80000 autoconfig window with its identification nibbles; once
//! Kickstart writes a base address the RAM appears there.

use emu_core::{Component, ConfigError, StateVisitor};
use serde::Serialize;

/// Start of the Zorro II autoconfig window.
pub const AUTOCONFIG_BASE: u32 = 0xE8_0000;
/// Last address of the autoconfig window.
pub const AUTOCONFIG_END: u32 = 0xE8_FFFF;

/// Fast RAM sizes a Zorro II board can advertise, with their er_Type size code.
const SIZE_CODES: [(usize, u8); 8] = [
    (64, 0b001),
    (128, 0b010),
    (256, 0b011),
    (512, 0b100),
    (1024, 0b101),
    (2048, 0b110),
    (4096, 0b111),
    (8192, 0b000),
];

/// Where the board is in the autoconfig handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConfigState {
    #[default]
    Unconfigured = 0,
    Configured = 1,
    /// Told to stay off the bus.
    ShutUp = 2,
}

impl ConfigState {
    fn decode(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Unconfigured),
            1 => Some(Self::Configured),
            2 => Some(Self::ShutUp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZorroInfo {
    pub fast_ram_kb: usize,
    pub state: ConfigState,
    pub base: u32,
}

/// Zorro II autoconfig for one Fast RAM board.
#[derive(Debug, Clone)]
pub struct ZorroManager {
    fast_ram: Vec<u8>,
    size_code: u8,
    state: ConfigState,
    base: u32,
}

impl ZorroManager {
    /// `fast_ram_kb` of 0 means no board is installed.
    pub fn new(fast_ram_kb: usize) -> Result<Self, ConfigError> {
        let size_code = if fast_ram_kb == 0 {
            0
        } else {
            SIZE_CODES
                .iter()
                .find(|&&(kb, _)| kb == fast_ram_kb)
                .map(|&(_, code)| code)
                .ok_or(ConfigError::InvalidSize { what: "fast RAM", size: fast_ram_kb })?
        };
        Ok(Self {
            fast_ram: vec![0; fast_ram_kb * 1024],
            size_code,
            state: ConfigState::Unconfigured,
            base: 0,
        })
    }

    /// Whether `kb` is a size a board can advertise (0 = none).
    #[must_use]
    pub fn is_valid_size(kb: usize) -> bool {
        kb == 0 || SIZE_CODES.iter().any(|&(size, _)| size == kb)
    }

    #[must_use]
    pub fn fast_ram_size(&self) -> usize {
        self.fast_ram.len()
    }

    #[must_use]
    pub fn state(&self) -> ConfigState {
        self.state
    }

    /// 0 until the board has been configured or shut up.
    #[must_use]
    pub fn fast_ram_config_state(&self) -> u8 {
        self.state as u8
    }

    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    /// A board is waiting in the autoconfig window.
    #[must_use]
    pub fn autoconfig_pending(&self) -> bool {
        !self.fast_ram.is_empty() && self.state == ConfigState::Unconfigured
    }

    /// Autoconfig nibble for an offset in the $E8xxxx window. Everything but
    /// er_Type is stored inverted, as the bus presents it.
    #[must_use]
    pub fn autoconfig_nibble(&self, addr: u32) -> u8 {
        if !self.autoconfig_pending() {
            return 0xF;
        }
        match addr & 0xFFFF {
            // er_Type: Zorro II, link into free pool, no boot ROM
            0x00 => 0b1110,
            0x02 => self.size_code,
            // er_Product
            0x04 => 0x9,
            0x06 => 0x8,
            // er_Flags: may be shut up, logical size matches physical size
            0x08 => 0x7,
            0x0A => 0xF,
            // er_Manufacturer
            0x10 => 0xF,
            0x12 => 0x8,
            0x14 => 0x4,
            0x16 => 0x6,
            // er_SerialNumber
            0x18 => 0xA,
            0x1A => 0xF,
            0x1C => 0xB,
            0x1E => 0xE,
            0x20 => 0xA,
            0x22 => 0xA,
            0x24 => 0xB,
            0x26 => 0x3,
            _ => 0xF,
        }
    }

    /// Byte read from the autoconfig window: the nibble sits in D7-D4.
    #[must_use]
    pub fn peek_autoconf(&self, addr: u32) -> u8 {
        (self.autoconfig_nibble(addr) << 4) | 0x0F
    }

    pub fn poke_autoconf(&mut self, addr: u32, value: u8) {
        if !self.autoconfig_pending() {
            return;
        }
        match addr & 0xFFFF {
            // ec_BaseAddress A23-A20; this write completes configuration
            0x48 => {
                self.base |= u32::from(value & 0xF0) << 16;
                self.state = ConfigState::Configured;
                log::debug!(
                    "zorro: {} KB fast RAM configured at ${:06X}",
                    self.fast_ram.len() / 1024,
                    self.base
                );
            }
            // ec_BaseAddress A19-A16
            0x4A => self.base = u32::from(value & 0xF0) << 12,
            // ec_Shutup
            0x4C => {
                self.state = ConfigState::ShutUp;
                log::debug!("zorro: fast RAM board shut up");
            }
            _ => {}
        }
    }

    /// Whether `addr` falls in the configured Fast RAM window.
    #[must_use]
    pub fn maps(&self, addr: u32) -> bool {
        let addr = addr & 0xFF_FFFF;
        self.state == ConfigState::Configured
            && addr >= self.base
            && ((addr - self.base) as usize) < self.fast_ram.len()
    }

    /// Read configured Fast RAM. `addr` must satisfy [`Self::maps`].
    #[must_use]
    pub fn peek_fast(&self, addr: u32) -> u8 {
        self.fast_ram_offset(addr).map_or(0xFF, |off| self.fast_ram[off])
    }

    pub fn poke_fast(&mut self, addr: u32, value: u8) {
        if let Some(off) = self.fast_ram_offset(addr) {
            self.fast_ram[off] = value;
        }
    }

    fn fast_ram_offset(&self, addr: u32) -> Option<usize> {
        self.maps(addr).then(|| ((addr & 0xFF_FFFF) - self.base) as usize)
    }

    #[must_use]
    pub fn info(&self) -> ZorroInfo {
        ZorroInfo {
            fast_ram_kb: self.fast_ram.len() / 1024,
            state: self.state,
            base: self.base,
        }
    }
}

impl Component for ZorroManager {
    fn name(&self) -> &'static str {
        "zorro"
    }

    /// /RESET unconfigures every board. Power-on also clears the RAM.
    fn reset(&mut self, hard: bool) {
        self.state = ConfigState::Unconfigured;
        self.base = 0;
        if hard {
            self.fast_ram.fill(0);
        }
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        let mut raw = self.state as u8;
        visitor.visit_u8(&mut raw);
        match ConfigState::decode(raw) {
            Some(state) => self.state = state,
            None => visitor.reject("zorro config state"),
        }
        visitor.visit_u32(&mut self.base);
        visitor.visit_bytes(&mut self.fast_ram);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(kb: usize) -> ZorroManager {
        ZorroManager::new(kb).unwrap()
    }

    #[test]
    fn er_type_advertises_size() {
        let zorro = board(2048);
        assert_eq!(zorro.peek_autoconf(AUTOCONFIG_BASE), 0xEF);
        assert_eq!(zorro.peek_autoconf(AUTOCONFIG_BASE + 2), 0x6F);
        assert_eq!(board(8192).autoconfig_nibble(2), 0);
    }

    #[test]
    fn rejects_sizes_zorro_ii_cannot_express() {
        assert_eq!(
            ZorroManager::new(3000).unwrap_err(),
            ConfigError::InvalidSize { what: "fast RAM", size: 3000 }
        );
        assert!(ZorroManager::is_valid_size(0));
        assert!(!ZorroManager::is_valid_size(96));
    }

    #[test]
    fn no_board_reads_as_empty_slot() {
        let mut zorro = board(0);
        assert!(!zorro.autoconfig_pending());
        assert_eq!(zorro.autoconfig_nibble(0), 0xF);
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x48, 0x20);
        assert_eq!(zorro.fast_ram_config_state(), 0);
    }

    #[test]
    fn base_address_write_maps_ram() {
        let mut zorro = board(512);
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x4A, 0x00);
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x48, 0x20);
        assert_eq!(zorro.state(), ConfigState::Configured);
        assert_eq!(zorro.base(), 0x20_0000);
        assert!(zorro.maps(0x20_0000));
        assert!(zorro.maps(0x27_FFFF));
        assert!(!zorro.maps(0x28_0000));
        zorro.poke_fast(0x20_1234, 0x5A);
        assert_eq!(zorro.peek_fast(0x20_1234), 0x5A);
        assert_eq!(zorro.autoconfig_nibble(0), 0xF, "configured board leaves the window");
    }

    #[test]
    fn shut_up_leaves_ram_unmapped() {
        let mut zorro = board(512);
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x4C, 0);
        assert_eq!(zorro.state(), ConfigState::ShutUp);
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x48, 0x20);
        assert_eq!(zorro.state(), ConfigState::ShutUp);
        assert!(!zorro.maps(0x20_0000));
    }

    #[test]
    fn reset_unconfigures() {
        let mut zorro = board(64);
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x48, 0x20);
        zorro.poke_fast(0x20_0000, 1);
        zorro.reset(false);
        assert_eq!(zorro.fast_ram_config_state(), 0);
        assert!(zorro.autoconfig_pending());
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x48, 0x20);
        assert_eq!(zorro.peek_fast(0x20_0000), 1, "soft reset keeps RAM contents");
        zorro.reset(true);
        zorro.poke_autoconf(AUTOCONFIG_BASE + 0x48, 0x20);
        assert_eq!(zorro.peek_fast(0x20_0000), 0);
    }
}
