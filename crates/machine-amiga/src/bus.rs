//! Address decoding and the custom register file.
//!
//! [`AmigaBus`] owns every chip the CPU can reach. The CPU sees it through
//! [`emu_core::Bus`]; hosts use the side-effect free [`AmigaBus::try_peek`].
//!
//! | Range               | Device                                   |
//! |---------------------|------------------------------------------|
//! | `$000000-$1FFFFF`   | chip RAM (mirrored), ROM under overlay   |
//! | Zorro II base       | Fast RAM once autoconfigured             |
//! | `$BFD000-$BFDFFF`   | CIA-B, even bytes                        |
//! | `$BFE000-$BFEFFF`   | CIA-A, odd bytes                         |
//! | `$C00000-$D7FFFF`   | slow RAM                                 |
//! | `$DC0000-$DCFFFF`   | real-time clock, odd bytes               |
//! | `$DFF000-$DFFFFF`   | custom chip registers                    |
//! | `$E80000-$E8FFFF`   | autoconfig window                        |
//! | `$F80000-$FFFFFF`   | Kickstart ROM                            |

use commodore_agnus_ocs::{Agnus, BlitProgress, Blitter, Copper, regs};
use commodore_buster::{AUTOCONFIG_BASE, AUTOCONFIG_END, ZorroManager};
use commodore_paula_8364::{Paula8364, int};
use emu_core::{Bus, MasterClock, Ticks};
use mos_cia_8520::Cia8520;
use peripheral_amiga_rtc::Rtc;

use crate::error::BusError;
use crate::memory::{Memory, OPEN_BUS};

pub const CIA_A_BASE: u32 = 0xBF_E001;
pub const CIA_B_BASE: u32 = 0xBF_D000;
pub const RTC_BASE: u32 = 0xDC_0000;
pub const CUSTOM_REGS_BASE: u32 = 0xDF_F000;

const ADDRESS_MASK: u32 = 0xFF_FFFF;

/// Who answers one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Memory,
    CiaA(u8),
    CiaB(u8),
    /// Decoded, but nothing drives this half of the data bus.
    OpenBus,
    Rtc(u8),
    Custom(u16),
    Autoconfig,
    FastRam,
    Unmapped,
}

#[derive(Debug, Clone)]
pub struct AmigaBus {
    pub agnus: Agnus,
    pub copper: Copper,
    pub blitter: Blitter,
    pub paula: Paula8364,
    pub cia_a: Cia8520,
    pub cia_b: Cia8520,
    pub memory: Memory,
    pub zorro: ZorroManager,
    pub rtc: Rtc,
    /// Crystal ticks since power-on.
    pub(crate) master_clock: u64,
    /// High byte of a custom register word arriving through the byte bus.
    pub(crate) custom_latch: u8,
    last_unmapped: Option<BusError>,
    unmapped_accesses: u64,
}

impl AmigaBus {
    #[must_use]
    pub fn new(
        agnus: Agnus,
        blitter: Blitter,
        cia_a: Cia8520,
        cia_b: Cia8520,
        memory: Memory,
        zorro: ZorroManager,
        rtc: Rtc,
    ) -> Self {
        Self {
            agnus,
            copper: Copper::new(),
            blitter,
            paula: Paula8364::new(),
            cia_a,
            cia_b,
            memory,
            zorro,
            rtc,
            master_clock: 0,
            custom_latch: 0,
            last_unmapped: None,
            unmapped_accesses: 0,
        }
    }

    /// Whole emulated seconds since power-on. Drives the RTC.
    #[must_use]
    pub fn uptime(&self) -> u64 {
        MasterClock::new(crate::PAL_CRYSTAL_HZ).whole_seconds(Ticks::new(self.master_clock))
    }

    #[must_use]
    pub fn last_unmapped(&self) -> Option<BusError> {
        self.last_unmapped
    }

    #[must_use]
    pub fn unmapped_accesses(&self) -> u64 {
        self.unmapped_accesses
    }

    /// Return and clear the most recent unmapped access.
    pub fn take_unmapped(&mut self) -> Option<BusError> {
        self.last_unmapped.take()
    }

    pub(crate) fn clear_unmapped(&mut self) {
        self.last_unmapped = None;
        self.unmapped_accesses = 0;
    }

    fn decode(&self, addr: u32) -> Target {
        match addr {
            0x00_0000..=0x1F_FFFF => {
                if self.memory.decodes(addr) {
                    Target::Memory
                } else {
                    Target::Unmapped
                }
            }
            0xBF_D000..=0xBF_DFFF => {
                if addr & 1 == 0 {
                    Target::CiaB(((addr >> 8) & 0xF) as u8)
                } else {
                    Target::OpenBus
                }
            }
            0xBF_E000..=0xBF_EFFF => {
                if addr & 1 == 1 {
                    Target::CiaA(((addr >> 8) & 0xF) as u8)
                } else {
                    Target::OpenBus
                }
            }
            0xDC_0000..=0xDC_FFFF if self.rtc.is_present() => {
                if addr & 1 == 1 {
                    Target::Rtc(((addr >> 2) & 0xF) as u8)
                } else {
                    Target::OpenBus
                }
            }
            0xDF_F000..=0xDF_FFFF => Target::Custom((addr & 0x1FE) as u16),
            AUTOCONFIG_BASE..=AUTOCONFIG_END if self.zorro.autoconfig_pending() => {
                Target::Autoconfig
            }
            _ if self.zorro.maps(addr) => Target::FastRam,
            _ if self.memory.decodes(addr) => Target::Memory,
            _ => Target::Unmapped,
        }
    }

    fn unmapped(&mut self, address: u32, write: bool) -> BusError {
        let err = BusError::Unmapped { address, write };
        log::debug!("{err}");
        self.last_unmapped = Some(err);
        self.unmapped_accesses += 1;
        err
    }

    /// CPU read with side effects (ICR acknowledge, TOD latch release).
    pub fn try_read(&mut self, address: u32) -> Result<u8, BusError> {
        let address = address & ADDRESS_MASK;
        let value = match self.decode(address) {
            Target::Memory => self.memory.read_byte(address),
            Target::CiaA(reg) => self.cia_a.read(reg),
            Target::CiaB(reg) => self.cia_b.read(reg),
            Target::OpenBus => OPEN_BUS,
            Target::Rtc(nr) => {
                let uptime = self.uptime();
                self.rtc.peek(nr, uptime)
            }
            Target::Custom(offset) => custom_byte(self.read_custom(offset), address),
            Target::Autoconfig => self.zorro.peek_autoconf(address),
            Target::FastRam => self.zorro.peek_fast(address),
            Target::Unmapped => return Err(self.unmapped(address, false)),
        };
        Ok(value)
    }

    /// Read without disturbing any chip. Unmapped addresses are reported but
    /// not recorded.
    pub fn try_peek(&self, address: u32) -> Result<u8, BusError> {
        let address = address & ADDRESS_MASK;
        let value = match self.decode(address) {
            Target::Memory => self.memory.read_byte(address),
            Target::CiaA(reg) => self.cia_a.peek(reg),
            Target::CiaB(reg) => self.cia_b.peek(reg),
            Target::OpenBus => OPEN_BUS,
            Target::Rtc(nr) => self.rtc.spy_peek(nr, self.uptime()),
            Target::Custom(offset) => custom_byte(self.read_custom(offset), address),
            Target::Autoconfig => self.zorro.peek_autoconf(address),
            Target::FastRam => self.zorro.peek_fast(address),
            Target::Unmapped => return Err(BusError::Unmapped { address, write: false }),
        };
        Ok(value)
    }

    pub fn try_write(&mut self, address: u32, value: u8) -> Result<(), BusError> {
        let address = address & ADDRESS_MASK;
        match self.decode(address) {
            Target::Memory => self.memory.write_byte(address, value),
            Target::CiaA(reg) => {
                self.cia_a.write(reg, value);
                if reg == 0 || reg == 2 {
                    self.memory.overlay = self.cia_a.port_a_output() & 0x01 != 0;
                }
            }
            Target::CiaB(reg) => self.cia_b.write(reg, value),
            Target::OpenBus => {}
            Target::Rtc(nr) => {
                let uptime = self.uptime();
                self.rtc.poke(nr, value, uptime);
            }
            Target::Custom(offset) => {
                // The even byte is held until the odd byte completes the word.
                if address & 1 == 0 {
                    self.custom_latch = value;
                } else {
                    self.write_custom(offset, u16::from_be_bytes([self.custom_latch, value]));
                }
            }
            Target::Autoconfig => self.zorro.poke_autoconf(address, value),
            Target::FastRam => self.zorro.poke_fast(address, value),
            Target::Unmapped => return Err(self.unmapped(address, true)),
        }
        Ok(())
    }

    /// Value of a readable custom register. Write-only registers float.
    #[must_use]
    pub fn read_custom(&self, offset: u16) -> u16 {
        match offset & 0x1FE {
            regs::BLTDDAT => self.blitter.ddat,
            regs::DMACONR => (self.agnus.dmacon & regs::dmacon::WRITABLE) | self.blitter.dmaconr_bits(),
            regs::VPOSR => self.agnus.read_vposr(),
            regs::VHPOSR => self.agnus.read_vhposr(),
            regs::INTENAR => self.paula.intena,
            regs::INTREQR => self.paula.intreq,
            _ => 0xFFFF,
        }
    }

    /// Write a custom register, from the CPU or a copper MOVE.
    pub fn write_custom(&mut self, offset: u16, value: u16) {
        let offset = offset & 0x1FE;
        match offset {
            regs::COPCON => self.copper.cdang = value & 0x0002 != 0,
            regs::COP1LCH => self.copper.set_location(1, true, value),
            regs::COP1LCL => self.copper.set_location(1, false, value),
            regs::COP2LCH => self.copper.set_location(2, true, value),
            regs::COP2LCL => self.copper.set_location(2, false, value),
            regs::COPJMP1 => self.copper.restart(1),
            regs::COPJMP2 => self.copper.restart(2),
            regs::INTENA => self.paula.write_intena(value),
            regs::INTREQ => self.paula.write_intreq(value),
            regs::BLTCON0..=regs::BLTDMOD | regs::BLTCDAT..=regs::BLTADAT => {
                if self.blitter.write_register(offset, value) {
                    self.start_blit();
                }
            }
            _ => {
                if !self.agnus.write_register(offset, value) {
                    log::trace!("write to unmodelled custom register {offset:#05X} = {value:#06X}");
                }
            }
        }
    }

    fn start_blit(&mut self) {
        if self.blitter.start(&mut self.memory) == BlitProgress::Finished {
            self.paula.request_interrupt(int::BLIT);
        }
    }
}

/// Byte lane of a custom register word.
fn custom_byte(word: u16, address: u32) -> u8 {
    let [hi, lo] = word.to_be_bytes();
    if address & 1 == 0 { hi } else { lo }
}

impl Bus for AmigaBus {
    fn read(&mut self, address: u32) -> u8 {
        self.try_read(address).unwrap_or(OPEN_BUS)
    }

    fn write(&mut self, address: u32, value: u8) {
        // Unmapped writes are recorded by try_write; the cycle still ends.
        let _ = self.try_write(address, value);
    }
}
