//! Amiga OCS machine core.
//!
//! Everything is clocked from the PAL crystal. Agnus does its work once per
//! colour clock (8 ticks): it resolves who owns the chip bus for the slot,
//! runs that owner, then moves the beam. The CIAs count on the E clock (40
//! ticks). The CPU is any [`emu_core::Cpu`]; it gets two clocks on every
//! colour clock whose slot it was granted, or on which it did not need the
//! chip bus at all.
//!
//! [`Amiga`] is the composition root. Hosts that share it with a UI thread
//! go through [`AmigaHandle`].

pub mod bus;
pub mod config;
mod error;
mod info;
pub mod memory;
mod shared;
pub mod snapshot;

use commodore_agnus_ocs::{
    Agnus, BeamEvent, BlitProgress, Blitter, BlitterAccuracy, BusOwner, BusRequests,
};
use commodore_buster::ZorroManager;
use commodore_paula_8364::int;
use emu_core::{
    Component, Cpu, IdleCpu, SnapshotError, SnapshotReader, SnapshotWriter, StateVisitor,
    Tickable, Ticks,
};
use mos_cia_8520::{Cia8520, CiaRevision};
use peripheral_amiga_rtc::{Rtc, RtcModel};

use crate::config::{check_chip_ram, check_fast_ram, check_slow_ram, kb};
use crate::memory::{Memory, OPEN_BUS};
use crate::snapshot::{HEADER_LEN, Header};

pub use crate::bus::AmigaBus;
pub use crate::config::{AmigaConfig, ConfigOption};
pub use crate::error::{AmigaError, BusError};
pub use crate::info::AmigaInfo;
pub use crate::shared::AmigaHandle;
pub use commodore_agnus_ocs;
pub use commodore_buster;
pub use commodore_paula_8364;
pub use mos_cia_8520;
pub use peripheral_amiga_rtc;

/// Standard Amiga PAL master crystal frequency (Hz)
pub const PAL_CRYSTAL_HZ: u64 = 28_375_160;

/// Number of crystal ticks per colour clock (CCK)
pub const TICKS_PER_CCK: u64 = 8;
/// Number of crystal ticks per CPU cycle
pub const TICKS_PER_CPU: u64 = 4;
/// Number of crystal ticks per CIA E-clock
pub const TICKS_PER_ECLOCK: u64 = 40;
const CPU_CLOCKS_PER_CCK: u64 = TICKS_PER_CCK / TICKS_PER_CPU;

#[derive(Debug, Clone)]
pub struct Amiga<C: Cpu = IdleCpu> {
    pub cpu: C,
    pub bus: AmigaBus,
    /// Settings the machine was built with. The ROM image itself lives in
    /// [`Memory::kickstart`]; `kickstart` here is left empty.
    config: AmigaConfig,
}

impl Amiga<IdleCpu> {
    /// Build a machine whose CPU never runs. The chipset is fully live.
    pub fn new(config: AmigaConfig) -> Result<Self, AmigaError> {
        Self::with_cpu(IdleCpu::new(), config)
    }
}

impl<C: Cpu> Amiga<C> {
    pub fn with_cpu(cpu: C, mut config: AmigaConfig) -> Result<Self, AmigaError> {
        config.validate()?;
        let kickstart = std::mem::take(&mut config.kickstart);
        let bus = AmigaBus::new(
            Agnus::new(),
            Blitter::new(config.blitter),
            Cia8520::new("cia_a", config.cia),
            Cia8520::new("cia_b", config.cia),
            Memory::new(config.chip_ram_kb * 1024, kickstart, config.slow_ram_kb * 1024),
            ZorroManager::new(config.fast_ram_kb)?,
            Rtc::new(config.rtc),
        );
        log::debug!(
            "amiga: {} KB chip, {} KB slow, {} KB fast",
            config.chip_ram_kb,
            config.slow_ram_kb,
            config.fast_ram_kb
        );
        Ok(Self { cpu, bus, config })
    }

    #[must_use]
    pub fn config(&self) -> &AmigaConfig {
        &self.config
    }

    /// Crystal ticks since power-on.
    #[must_use]
    pub fn master_clock(&self) -> Ticks {
        Ticks::new(self.bus.master_clock)
    }

    /// Advance one colour clock.
    pub fn advance_one_cycle(&mut self) {
        self.tick_n(Ticks::new(TICKS_PER_CCK));
    }

    pub fn run_cycles(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.advance_one_cycle();
        }
    }

    /// Run until the beam wraps to a new frame.
    pub fn run_frame(&mut self) {
        let frame = self.bus.agnus.frame.nr;
        while self.bus.agnus.frame.nr == frame {
            self.advance_one_cycle();
        }
    }

    /// Power-cycle (`hard`) or pulse the reset line.
    pub fn reset(&mut self, hard: bool) {
        Component::reset(self, hard);
    }

    /// Read without side effects. Unmapped addresses read as open bus.
    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        self.bus.try_peek(addr).unwrap_or(OPEN_BUS)
    }

    pub fn try_peek(&self, addr: u32) -> Result<u8, BusError> {
        self.bus.try_peek(addr)
    }

    /// Write as the CPU would. An unmapped write is recorded and dropped.
    pub fn poke(&mut self, addr: u32, value: u8) {
        let _ = self.bus.try_write(addr, value);
    }

    pub fn try_poke(&mut self, addr: u32, value: u8) -> Result<(), BusError> {
        self.bus.try_write(addr, value)
    }

    /// Return and clear the latest unmapped access.
    pub fn take_unmapped(&mut self) -> Option<BusError> {
        self.bus.take_unmapped()
    }

    /// Change one option. Returns whether anything changed.
    ///
    /// RAM size changes rebuild the memory map and power-cycle the machine.
    pub fn configure(&mut self, option: ConfigOption, value: i64) -> Result<bool, AmigaError> {
        if self.config.get(option) == value {
            return Ok(false);
        }
        match option {
            ConfigOption::ChipRam => {
                let size = check_chip_ram(kb(option, value)?)?;
                self.bus.memory.set_chip_ram(size * 1024);
                self.config.chip_ram_kb = size;
            }
            ConfigOption::SlowRam => {
                let size = check_slow_ram(kb(option, value)?)?;
                self.bus.memory.set_slow_ram(size * 1024);
                self.config.slow_ram_kb = size;
            }
            ConfigOption::FastRam => {
                let size = check_fast_ram(kb(option, value)?)?;
                self.bus.zorro = ZorroManager::new(size)?;
                self.config.fast_ram_kb = size;
            }
            ConfigOption::CiaRevision => {
                let revision = CiaRevision::try_from(value)?;
                self.bus.cia_a.set_revision(revision);
                self.bus.cia_b.set_revision(revision);
                self.config.cia.revision = revision;
            }
            ConfigOption::RtcModel => {
                let model = RtcModel::try_from(value)?;
                self.bus.rtc.set_model(model);
                self.config.rtc.model = model;
            }
            ConfigOption::BlitterAccuracy => {
                let accuracy = BlitterAccuracy::try_from(value)?;
                self.bus.blitter.accuracy = accuracy;
                self.config.blitter.accuracy = accuracy;
            }
        }
        log::debug!("config {} = {value}", option.key());
        if option.needs_power_cycle() {
            self.reset(true);
        }
        Ok(true)
    }

    fn components(&mut self) -> [&mut dyn Component; 10] {
        let bus = &mut self.bus;
        [
            &mut self.cpu,
            &mut bus.agnus,
            &mut bus.copper,
            &mut bus.blitter,
            &mut bus.paula,
            &mut bus.cia_a,
            &mut bus.cia_b,
            &mut bus.memory,
            &mut bus.zorro,
            &mut bus.rtc,
        ]
    }

    /// Bytes [`Amiga::save_snapshot`] will write.
    pub fn snapshot_size(&mut self) -> usize {
        HEADER_LEN + self.serialized_size()
    }

    pub fn snapshot(&mut self) -> Vec<u8> {
        let mut writer = SnapshotWriter::with_capacity(self.snapshot_size());
        Header::of(&self.bus).write(&mut writer);
        self.save(&mut writer);
        writer.into_bytes()
    }

    /// Write a snapshot into `buffer`. Returns the bytes written.
    pub fn save_snapshot(&mut self, buffer: &mut [u8]) -> Result<usize, AmigaError> {
        let needed = self.snapshot_size();
        if buffer.len() < needed {
            return Err(SnapshotError::BufferTooSmall { needed, available: buffer.len() }.into());
        }
        let bytes = self.snapshot();
        buffer[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    // ---- scheduling ----------------------------------------------------------

    fn cck_step(&mut self) {
        let bus = &mut self.bus;
        let (vpos, hpos) = (bus.agnus.vpos, bus.agnus.hpos);
        if bus.agnus.copper_slot_free() {
            bus.copper.poll_wait(vpos, hpos, bus.blitter.busy);
        }

        let cpu_wants_bus = self.cpu.wants_bus();
        let owner = bus.agnus.allocate_slot(BusRequests {
            copper: bus.copper.needs_bus(),
            blitter: bus.blitter.wants_bus(),
            cpu: cpu_wants_bus,
        });
        match owner {
            BusOwner::Bitplane(plane) => bus.agnus.fetch_bitplane(plane, &bus.memory),
            BusOwner::Copper => {
                let busy = bus.blitter.busy;
                if let Some(mv) = bus.copper.service_slot(vpos, hpos, busy, &bus.memory) {
                    bus.write_custom(mv.reg, mv.value);
                }
            }
            BusOwner::Blitter => {
                if bus.blitter.step_one_word(&mut bus.memory) == BlitProgress::Finished {
                    bus.paula.request_interrupt(int::BLIT);
                }
            }
            _ => {}
        }

        self.cpu.set_ipl(self.bus.paula.compute_ipl());
        if owner == BusOwner::Cpu || !cpu_wants_bus {
            for _ in 0..CPU_CLOCKS_PER_CCK {
                self.cpu.tick(&mut self.bus);
            }
        }

        let bus = &mut self.bus;
        match bus.agnus.advance_beam() {
            BeamEvent::None => {}
            // CIA-B counts HSYNC.
            BeamEvent::NewLine => bus.cia_b.tod_pulse(),
            BeamEvent::NewFrame => {
                bus.cia_b.tod_pulse();
                // CIA-A counts VSYNC.
                bus.cia_a.tod_pulse();
                bus.paula.request_interrupt(int::VERTB);
                bus.copper.vsync();
            }
        }
    }

    fn eclock_step(&mut self) {
        let bus = &mut self.bus;
        bus.cia_a.tick();
        bus.cia_b.tick();
        // CIA-A drives /INT2, CIA-B /INT6.
        if bus.cia_a.irq_active() {
            bus.paula.request_interrupt(int::PORTS);
        }
        if bus.cia_b.irq_active() {
            bus.paula.request_interrupt(int::EXTER);
        }
    }
}

impl<C: Cpu + Clone> Amiga<C> {
    /// Restore a snapshot. Returns the bytes consumed.
    ///
    /// Decoding happens on a scratch copy; on failure the machine is
    /// untouched.
    pub fn load_snapshot(&mut self, data: &[u8]) -> Result<usize, AmigaError> {
        let header = Header::read(data)?;
        header.check(&Header::of(&self.bus))?;

        let mut scratch = self.clone();
        let mut reader = SnapshotReader::new(&data[HEADER_LEN..]);
        if let Err(err) = scratch.load(&mut reader) {
            log::warn!("snapshot rejected: {err}");
            return Err(err.into());
        }
        *self = scratch;
        Ok(HEADER_LEN + reader.position())
    }
}

impl<C: Cpu> Tickable for Amiga<C> {
    fn tick(&mut self) {
        self.bus.master_clock += 1;
        if self.bus.master_clock.is_multiple_of(TICKS_PER_CCK) {
            self.cck_step();
        }
        if self.bus.master_clock.is_multiple_of(TICKS_PER_ECLOCK) {
            self.eclock_step();
        }
    }
}

impl<C: Cpu> Component for Amiga<C> {
    fn name(&self) -> &'static str {
        "amiga"
    }

    fn reset(&mut self, hard: bool) {
        for component in self.components() {
            component.reset(hard);
        }
        self.bus.custom_latch = 0;
        self.bus.clear_unmapped();
        if hard {
            self.bus.master_clock = 0;
        }
        log::debug!("amiga: {} reset", if hard { "hard" } else { "soft" });
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u64(&mut self.bus.master_clock);
        visitor.visit_u8(&mut self.bus.custom_latch);
        for component in self.components() {
            component.visit_state(visitor);
        }
    }
}
