//! Amiga real-time clock at $DC0000.
//!
//! Two chips were fitted over the years: the OKI MSM6242B (one bank of
//! sixteen 4-bit registers, control registers D/E/F) and the Ricoh RP5C01
//! (four banks selected by the low bits of register D; bank 1 holds the
//! alarm and 12/24 hour select, banks 2 and 3 are battery-backed RAM).
//!
//! The clock is deterministic: its time is the configured base time plus
//! emulated seconds since power-on plus whatever offset software set by
//! writing the time registers. The host clock is never consulted.

mod calendar;

use emu_core::{Component, ConfigError, StateVisitor};
use serde::{Deserialize, Serialize};

pub use calendar::DateTime;

/// Which chip is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RtcModel {
    None = 0,
    #[default]
    Oki = 1,
    Ricoh = 2,
}

impl RtcModel {
    #[must_use]
    pub fn is_valid(value: i64) -> bool {
        Self::try_from(value).is_ok()
    }
}

impl TryFrom<i64> for RtcModel {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Oki),
            2 => Ok(Self::Ricoh),
            _ => Err(ConfigError::InvalidValue { option: "rtc.model", value }),
        }
    }
}

/// 2000-01-01 00:00:00 UTC.
pub const DEFAULT_BASE_TIME: i64 = 946_684_800;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcConfig {
    pub model: RtcModel,
    /// Unix time the clock shows at power-on.
    pub base_time: i64,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self { model: RtcModel::default(), base_time: DEFAULT_BASE_TIME }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtcInfo {
    pub model: RtcModel,
    pub time: i64,
    pub offset: i64,
    pub bank: u8,
    pub registers: [[u8; 16]; 4],
}

// Ricoh bank 1 (alarm) bits that exist.
const RICOH_ALARM_MASK: [u8; 13] = [
    0b0000, 0b0000, 0b1111, 0b0111, 0b1111, 0b0011, 0b0111, 0b1111, 0b0011, 0b0000, 0b0001,
    0b0011, 0b0000,
];

#[derive(Debug, Clone)]
pub struct Rtc {
    model: RtcModel,
    base_time: i64,
    offset: i64,
    reg: [[u8; 16]; 4],
}

impl Rtc {
    #[must_use]
    pub fn new(config: RtcConfig) -> Self {
        let mut rtc = Self {
            model: config.model,
            base_time: config.base_time,
            offset: 0,
            reg: [[0; 16]; 4],
        };
        rtc.reset_control_registers();
        rtc
    }

    #[must_use]
    pub fn model(&self) -> RtcModel {
        self.model
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.model != RtcModel::None
    }

    /// Change the fitted chip. Returns whether anything changed.
    pub fn set_model(&mut self, model: RtcModel) -> bool {
        if self.model == model {
            return false;
        }
        self.model = model;
        self.reset_control_registers();
        true
    }

    fn reset_control_registers(&mut self) {
        let (d, e, f) = match self.model {
            RtcModel::Ricoh => (0b1000, 0b0000, 0b0000),
            RtcModel::Oki => (0b0001, 0b0000, 0b0100),
            RtcModel::None => (0, 0, 0),
        };
        self.reg[0][0xD] = d;
        self.reg[0][0xE] = e;
        self.reg[0][0xF] = f;
    }

    /// Current clock value, `uptime` being emulated seconds since power-on.
    #[must_use]
    pub fn time(&self, uptime: u64) -> i64 {
        self.base_time
            .saturating_add(uptime as i64)
            .saturating_add(self.offset)
    }

    /// Selected register bank. The OKI chip only has bank 0.
    #[must_use]
    pub fn bank(&self) -> usize {
        match self.model {
            RtcModel::Ricoh => usize::from(self.reg[0][0xD] & 0b11),
            _ => 0,
        }
    }

    /// Read register `nr` (0..=15), refreshing the time registers first.
    pub fn peek(&mut self, nr: u8, uptime: u64) -> u8 {
        let regs = self.time_registers(uptime);
        self.reg[0][..13].copy_from_slice(&regs);
        self.spy_peek(nr, uptime)
    }

    /// Read without touching register state.
    #[must_use]
    pub fn spy_peek(&self, nr: u8, uptime: u64) -> u8 {
        let nr = usize::from(nr & 0xF);
        let ricoh = self.model == RtcModel::Ricoh;
        match nr {
            0xD => self.reg[0][0xD],
            0xE | 0xF if ricoh => 0,
            0xE | 0xF => self.reg[0][nr],
            _ if self.bank() == 0 => self.time_registers(uptime)[nr],
            _ => self.reg[self.bank()][nr],
        }
    }

    /// Write register `nr`. Time writes move the clock's offset.
    pub fn poke(&mut self, nr: u8, value: u8, uptime: u64) {
        if !self.is_present() {
            return;
        }
        let nr = usize::from(nr & 0xF);
        let value = value & 0xF;
        if nr >= 0xD {
            self.reg[0][nr] = value;
            return;
        }
        let bank = self.bank();
        if bank != 0 {
            self.reg[bank][nr] = if bank == 1 { value & RICOH_ALARM_MASK[nr] } else { value };
            return;
        }
        let mut regs = self.time_registers(uptime);
        regs[nr] = value;
        self.reg[0][..13].copy_from_slice(&regs);
        let new_time = self.registers_to_time(&regs);
        self.offset = new_time - self.base_time - uptime as i64;
        log::debug!("rtc: register {nr:X} = {value:X}, clock now {new_time}");
    }

    fn twelve_hour(&self) -> bool {
        match self.model {
            RtcModel::Ricoh => self.reg[1][0xA] & 0b0001 == 0,
            _ => self.reg[0][0xF] & 0b0100 == 0,
        }
    }

    /// BCD digits of the current time as the chip lays them out.
    ///
    /// In 12 hour mode only hours 13-23 are folded down and flagged PM;
    /// noon reads as 12 and midnight as 00, both without the PM bit.
    fn time_registers(&self, uptime: u64) -> [u8; 13] {
        let t = DateTime::from_unix(self.time(uptime));
        let year = t.year.rem_euclid(100) as u8;
        let (mut hour, mut pm) = (t.hour, 0);
        if self.twelve_hour() && hour > 12 {
            hour -= 12;
            pm = if self.model == RtcModel::Ricoh { 0b010 } else { 0b100 };
        }
        let mut r = [0u8; 13];
        r[0x0] = t.second % 10;
        r[0x1] = t.second / 10;
        r[0x2] = t.minute % 10;
        r[0x3] = t.minute / 10;
        r[0x4] = hour % 10;
        r[0x5] = hour / 10 | pm;
        if self.model == RtcModel::Ricoh {
            r[0x6] = t.weekday;
            r[0x7] = t.day % 10;
            r[0x8] = t.day / 10;
            r[0x9] = t.month % 10;
            r[0xA] = t.month / 10;
            r[0xB] = year % 10;
            r[0xC] = year / 10;
        } else {
            r[0x6] = t.day % 10;
            r[0x7] = t.day / 10;
            r[0x8] = t.month % 10;
            r[0x9] = t.month / 10;
            r[0xA] = year % 10;
            r[0xB] = year / 10;
            r[0xC] = t.weekday;
        }
        r
    }

    fn registers_to_time(&self, r: &[u8; 13]) -> i64 {
        let ricoh = self.model == RtcModel::Ricoh;
        let (day, month, year) = if ricoh {
            (r[0x7] + 10 * r[0x8], r[0x9] + 10 * r[0xA], r[0xB] + 10 * r[0xC])
        } else {
            (r[0x6] + 10 * r[0x7], r[0x8] + 10 * r[0x9], r[0xA] + 10 * r[0xB])
        };
        let pm_bit = if ricoh { 0b010 } else { 0b100 };
        let ten_hours = if ricoh && self.twelve_hour() { 0b001 } else { 0b011 };
        let mut hour = r[0x4] + 10 * (r[0x5] & ten_hours);
        if self.twelve_hour() && r[0x5] & pm_bit != 0 {
            hour += 12;
        }
        // Amiga convention: two-digit years below 78 are in the 2000s.
        let year = i64::from(year) + if year < 78 { 2000 } else { 1900 };
        DateTime {
            year,
            month,
            day,
            hour,
            minute: r[0x2] + 10 * r[0x3],
            second: r[0x0] + 10 * r[0x1],
            weekday: 0,
        }
        .to_unix()
    }

    #[must_use]
    pub fn info(&self, uptime: u64) -> RtcInfo {
        let mut registers = self.reg;
        registers[0][..13].copy_from_slice(&self.time_registers(uptime));
        RtcInfo {
            model: self.model,
            time: self.time(uptime),
            offset: self.offset,
            bank: self.bank() as u8,
            registers,
        }
    }
}

impl Component for Rtc {
    fn name(&self) -> &'static str {
        "rtc"
    }

    /// The clock is battery backed: only power-on touches it.
    fn reset(&mut self, hard: bool) {
        if hard {
            self.reset_control_registers();
        }
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_i64(&mut self.offset);
        for bank in &mut self.reg {
            visitor.visit_bytes(bank);
        }
    }
}
