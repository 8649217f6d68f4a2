//! MOS 8520 Complex Interface Adapter (CIA).
//!
//! The 8520 is a general-purpose I/O and timer chip used in the Amiga (two
//! instances: CIA-A and CIA-B). It provides two 8-bit I/O ports, two 16-bit
//! countdown timers, a 24-bit time-of-day counter, a serial shift register,
//! and an interrupt controller.
//!
//! The chip is clocked by the E clock (one tenth of the CPU clock). The
//! machine calls [`Cia8520::tick`] once per E cycle and [`Cia8520::tod_pulse`]
//! on the external TOD signal.

mod timer;
mod tod;

use emu_core::{Component, ConfigError, StateVisitor};
use serde::{Deserialize, Serialize};

pub use timer::TimerInfo;
pub use tod::TodInfo;

use timer::Timer;
use tod::Tod;

/// Interrupt control register bits.
pub mod icr {
    pub const TA: u8 = 0x01;
    pub const TB: u8 = 0x02;
    pub const ALRM: u8 = 0x04;
    pub const SP: u8 = 0x08;
    pub const FLG: u8 = 0x10;
    pub const IR: u8 = 0x80;
    pub const SOURCES: u8 = 0x1F;
}

const CRA_INMODE: u8 = 0x20;
const CRA_SPMODE: u8 = 0x40;
const CRB_INMODE: u8 = 0x60;
const CRB_ALARM: u8 = 0x80;

/// Chip package. The two behave the same except for alarm matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CiaRevision {
    /// 40-pin DIP part: the alarm only fires when the counter ticks.
    #[default]
    Dip8520 = 0,
    /// PLCC part: writing the counter or the alarm also checks for a match.
    Plcc8520 = 1,
}

impl CiaRevision {
    #[must_use]
    pub fn is_valid(value: i64) -> bool {
        Self::try_from(value).is_ok()
    }
}

impl TryFrom<i64> for CiaRevision {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Dip8520),
            1 => Ok(Self::Plcc8520),
            _ => Err(ConfigError::InvalidValue { option: "cia.revision", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CiaConfig {
    pub revision: CiaRevision,
}

/// Inspection view of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub output: u8,
    pub ddr: u8,
    pub pins: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiaInfo {
    pub label: &'static str,
    pub port_a: PortInfo,
    pub port_b: PortInfo,
    pub timer_a: TimerInfo,
    pub timer_b: TimerInfo,
    pub tod: TodInfo,
    pub cra: u8,
    pub crb: u8,
    pub sdr: u8,
    pub ssr: u8,
    pub icr: u8,
    pub imr: u8,
    pub irq: bool,
    pub idle: bool,
    pub idle_since: u64,
    pub idle_total: u64,
    pub idle_percentage: f64,
}

/// MOS 8520 Complex Interface Adapter.
#[derive(Debug, Clone)]
pub struct Cia8520 {
    label: &'static str,
    revision: CiaRevision,
    port_a: u8,
    port_b: u8,
    ddr_a: u8,
    ddr_b: u8,
    /// Levels driven onto the port pins by the outside world.
    pub external_a: u8,
    pub external_b: u8,

    timer_a: Timer,
    timer_b: Timer,
    // Bits of CRA/CRB not owned by the timers (input modes, SPMODE, ALARM).
    cra_high: u8,
    crb_high: u8,
    cnt: bool,

    icr_status: u8,
    icr_mask: u8,

    sdr: u8,
    ssr: u8,
    // Timer A underflows left in the current shift (two per bit).
    serial_steps: u8,
    serial_pending: bool,
    /// Level on the SP pin while shifting out.
    sp: bool,

    tod: Tod,

    cycles: u64,
    idle: bool,
    idle_since: u64,
    idle_total: u64,
}

impl Cia8520 {
    #[must_use]
    pub fn new(label: &'static str, config: CiaConfig) -> Self {
        Self {
            label,
            revision: config.revision,
            port_a: 0xFF,
            port_b: 0xFF,
            ddr_a: 0,
            ddr_b: 0,
            external_a: 0xFF,
            external_b: 0xFF,
            timer_a: Timer::new(),
            timer_b: Timer::new(),
            cra_high: 0,
            crb_high: 0,
            cnt: true,
            icr_status: 0,
            icr_mask: 0,
            sdr: 0,
            ssr: 0,
            serial_steps: 0,
            serial_pending: false,
            sp: true,
            tod: Tod::default(),
            cycles: 0,
            idle: false,
            idle_since: 0,
            idle_total: 0,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    #[must_use]
    pub fn revision(&self) -> CiaRevision {
        self.revision
    }

    pub fn set_revision(&mut self, revision: CiaRevision) {
        self.revision = revision;
    }

    /// Advance one E-clock cycle.
    pub fn tick(&mut self) {
        self.cycles += 1;
        self.timer_a.begin_cycle();
        self.timer_b.begin_cycle();

        let a_counts_phi2 = self.cra_high & CRA_INMODE == 0;
        let a_underflow = a_counts_phi2 && self.timer_a.count_down();
        if a_underflow {
            self.timer_a_underflowed();
        }

        let b_counts = match (self.crb_high & CRB_INMODE) >> 5 {
            0 => true,
            2 => a_underflow,
            3 => a_underflow && self.cnt,
            _ => false,
        };
        if b_counts && self.timer_b.count_down() {
            self.icr_status |= icr::TB;
        }

        self.track_idle();
    }

    fn timer_a_underflowed(&mut self) {
        self.icr_status |= icr::TA;
        if self.cra_high & CRA_SPMODE != 0 && self.serial_steps > 0 {
            self.serial_steps -= 1;
            if self.serial_steps % 2 == 1 {
                self.sp = self.ssr & 0x80 != 0;
                self.ssr <<= 1;
            }
            if self.serial_steps == 0 {
                self.icr_status |= icr::SP;
                if self.serial_pending {
                    self.serial_pending = false;
                    self.load_shift_register();
                }
            }
        }
    }

    fn load_shift_register(&mut self) {
        self.ssr = self.sdr;
        self.serial_steps = 16;
    }

    fn track_idle(&mut self) {
        let idle = !self.timer_a.running && !self.timer_b.running && self.serial_steps == 0;
        if idle {
            if !self.idle {
                self.idle_since = self.cycles;
            }
            self.idle_total += 1;
        }
        self.idle = idle;
    }

    /// A positive edge on the CNT pin. Timers in CNT mode count it.
    pub fn cnt_pulse(&mut self) {
        if self.cra_high & CRA_INMODE != 0 && self.timer_a.count_down() {
            self.timer_a_underflowed();
        }
        if (self.crb_high & CRB_INMODE) >> 5 == 1 && self.timer_b.count_down() {
            self.icr_status |= icr::TB;
        }
    }

    /// Set the CNT pin level (gates timer B mode 3).
    pub fn set_cnt(&mut self, level: bool) {
        self.cnt = level;
    }

    /// A byte shifted in on SP/CNT while the port is in input mode.
    pub fn serial_input(&mut self, byte: u8) {
        if self.cra_high & CRA_SPMODE != 0 {
            log::debug!("{}: serial input {byte:#04X} ignored in output mode", self.label);
            return;
        }
        self.sdr = byte;
        self.icr_status |= icr::SP;
    }

    /// Negative edge on the FLAG pin.
    pub fn flag_pulse(&mut self) {
        self.icr_status |= icr::FLG;
    }

    /// Pulse the TOD counter. Call this from the system when the
    /// appropriate external signal arrives:
    /// - CIA-A: VSYNC (once per frame, ~50 Hz PAL)
    /// - CIA-B: HSYNC (once per scanline, ~15,625 Hz PAL)
    pub fn tod_pulse(&mut self) {
        if self.tod.pulse() {
            self.icr_status |= icr::ALRM;
        }
    }

    #[must_use]
    pub fn irq_active(&self) -> bool {
        (self.icr_status & self.icr_mask & icr::SOURCES) != 0
    }

    fn port_b_pins(&self) -> u8 {
        let mut pins = (self.port_b & self.ddr_b) | (self.external_b & !self.ddr_b);
        if self.timer_a.pb_on {
            pins = (pins & !0x40) | (u8::from(self.timer_a.pb_level()) << 6);
        }
        if self.timer_b.pb_on {
            pins = (pins & !0x80) | (u8::from(self.timer_b.pb_level()) << 7);
        }
        pins
    }

    #[must_use]
    pub fn port_a_output(&self) -> u8 {
        (self.port_a & self.ddr_a) | (self.external_a & !self.ddr_a)
    }

    #[must_use]
    pub fn port_b_output(&self) -> u8 {
        self.port_b_pins()
    }

    /// Register read with side effects (ICR clear, TOD latch).
    pub fn read(&mut self, reg: u8) -> u8 {
        match reg & 0x0F {
            0x08 => self.tod.read(0),
            0x09 => self.tod.read(1),
            0x0A => self.tod.read(2),
            0x0D => self.read_icr_and_clear(),
            r => self.peek(r),
        }
    }

    /// Register read without side effects.
    #[must_use]
    pub fn peek(&self, reg: u8) -> u8 {
        match reg & 0x0F {
            0x00 => self.port_a_output(),
            0x01 => self.port_b_pins(),
            0x02 => self.ddr_a,
            0x03 => self.ddr_b,
            0x04 => self.timer_a.count as u8,
            0x05 => (self.timer_a.count >> 8) as u8,
            0x06 => self.timer_b.count as u8,
            0x07 => (self.timer_b.count >> 8) as u8,
            0x08 => self.tod.peek(0),
            0x09 => self.tod.peek(1),
            0x0A => self.tod.peek(2),
            0x0C => self.sdr,
            0x0D => self.icr_status | if self.irq_active() { icr::IR } else { 0 },
            0x0E => self.timer_a.control_bits() | self.cra_high,
            0x0F => self.timer_b.control_bits() | self.crb_high,
            _ => 0xFF,
        }
    }

    pub fn read_icr_and_clear(&mut self) -> u8 {
        let any = if self.irq_active() { icr::IR } else { 0x00 };
        let result = self.icr_status | any;
        if result != 0 {
            log::trace!("{}: ICR acknowledged {result:#04X}", self.label);
        }
        self.icr_status = 0;
        result
    }

    pub fn write(&mut self, reg: u8, value: u8) {
        match reg & 0x0F {
            0x00 => self.port_a = value,
            0x01 => self.port_b = value,
            0x02 => self.ddr_a = value,
            0x03 => self.ddr_b = value,
            0x04 => self.timer_a.write_latch_lo(value),
            0x05 => self.timer_a.write_latch_hi(value),
            0x06 => self.timer_b.write_latch_lo(value),
            0x07 => self.timer_b.write_latch_hi(value),
            0x08 => self.write_tod(0, value),
            0x09 => self.write_tod(1, value),
            0x0A => self.write_tod(2, value),
            0x0C => {
                self.sdr = value;
                if self.cra_high & CRA_SPMODE != 0 {
                    if self.serial_steps == 0 {
                        self.load_shift_register();
                    } else {
                        self.serial_pending = true;
                    }
                }
            }
            0x0D => {
                if value & 0x80 != 0 {
                    self.icr_mask |= value & icr::SOURCES;
                } else {
                    self.icr_mask &= !(value & icr::SOURCES);
                }
            }
            0x0E => {
                let was_output = self.cra_high & CRA_SPMODE != 0;
                self.timer_a.write_control(value);
                self.cra_high = value & 0xE0;
                if was_output && value & CRA_SPMODE == 0 {
                    self.serial_steps = 0;
                    self.serial_pending = false;
                }
            }
            0x0F => {
                self.timer_b.write_control(value);
                self.crb_high = value & 0xE0;
            }
            _ => {}
        }
    }

    fn write_tod(&mut self, byte: u8, value: u8) {
        self.tod.write(byte, value, self.crb_high & CRB_ALARM != 0);
        if self.revision == CiaRevision::Plcc8520 && self.tod.matches_alarm() {
            self.icr_status |= icr::ALRM;
        }
    }

    #[must_use]
    pub fn tod_counter(&self) -> u32 {
        self.tod.value
    }

    #[must_use]
    pub fn tod_alarm(&self) -> u32 {
        self.tod.alarm
    }

    #[must_use]
    pub fn tod_halted(&self) -> bool {
        self.tod.halted
    }

    #[must_use]
    pub fn timer_a(&self) -> u16 {
        self.timer_a.count
    }

    #[must_use]
    pub fn timer_b(&self) -> u16 {
        self.timer_b.count
    }

    #[must_use]
    pub fn timer_a_running(&self) -> bool {
        self.timer_a.running
    }

    #[must_use]
    pub fn timer_b_running(&self) -> bool {
        self.timer_b.running
    }

    #[must_use]
    pub fn icr_status(&self) -> u8 {
        self.icr_status
    }

    #[must_use]
    pub fn icr_mask(&self) -> u8 {
        self.icr_mask
    }

    /// Cycles ticked since the last reset.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Share of cycles spent with both timers stopped and no serial shift.
    #[must_use]
    pub fn idle_percentage(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.idle_total as f64 * 100.0 / self.cycles as f64
        }
    }

    #[must_use]
    pub fn info(&self) -> CiaInfo {
        CiaInfo {
            label: self.label,
            port_a: PortInfo { output: self.port_a, ddr: self.ddr_a, pins: self.port_a_output() },
            port_b: PortInfo { output: self.port_b, ddr: self.ddr_b, pins: self.port_b_pins() },
            timer_a: self.timer_a.info(),
            timer_b: self.timer_b.info(),
            tod: self.tod.info(),
            cra: self.peek(0x0E),
            crb: self.peek(0x0F),
            sdr: self.sdr,
            ssr: self.ssr,
            icr: self.icr_status,
            imr: self.icr_mask,
            irq: self.irq_active(),
            idle: self.idle,
            idle_since: self.idle_since,
            idle_total: self.idle_total,
            idle_percentage: self.idle_percentage(),
        }
    }
}

impl Component for Cia8520 {
    fn name(&self) -> &'static str {
        self.label
    }

    /// The reset line clears every register but the TOD counter and alarm,
    /// which only power-on clears.
    fn reset(&mut self, hard: bool) {
        let external = (self.external_a, self.external_b);
        let tod = self.tod;
        *self = Self::new(self.label, CiaConfig { revision: self.revision });
        (self.external_a, self.external_b) = external;
        if !hard {
            self.tod.value = tod.value;
            self.tod.alarm = tod.alarm;
        }
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u8(&mut self.port_a);
        visitor.visit_u8(&mut self.port_b);
        visitor.visit_u8(&mut self.ddr_a);
        visitor.visit_u8(&mut self.ddr_b);
        visitor.visit_u8(&mut self.external_a);
        visitor.visit_u8(&mut self.external_b);
        self.timer_a.visit_state(visitor);
        self.timer_b.visit_state(visitor);
        visitor.visit_u8(&mut self.cra_high);
        visitor.visit_u8(&mut self.crb_high);
        visitor.visit_bool(&mut self.cnt);
        visitor.visit_u8(&mut self.icr_status);
        visitor.visit_u8(&mut self.icr_mask);
        visitor.visit_u8(&mut self.sdr);
        visitor.visit_u8(&mut self.ssr);
        visitor.visit_u8(&mut self.serial_steps);
        visitor.visit_bool(&mut self.serial_pending);
        visitor.visit_bool(&mut self.sp);
        self.tod.visit_state(visitor);
        visitor.visit_u64(&mut self.cycles);
        visitor.visit_bool(&mut self.idle);
        visitor.visit_u64(&mut self.idle_since);
        visitor.visit_u64(&mut self.idle_total);
        if self.serial_steps > 16 {
            visitor.reject("cia serial step count");
        }
    }
}
