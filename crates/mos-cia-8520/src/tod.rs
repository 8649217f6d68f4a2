//! 24-bit time-of-day counter with read latch, write halt and alarm.

use emu_core::StateVisitor;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodInfo {
    pub value: u32,
    pub latch: u32,
    pub alarm: u32,
    pub latched: bool,
    pub halted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Tod {
    pub value: u32,
    pub alarm: u32,
    // Reading the MSB freezes a copy until the LSB is read.
    latch: u32,
    latched: bool,
    // Writing the MSB stops counting until the LSB is written.
    pub halted: bool,
}

impl Tod {
    /// Read byte 0 (LSB), 1 or 2 (MSB).
    pub fn read(&mut self, byte: u8) -> u8 {
        match byte {
            2 => {
                if !self.latched {
                    self.latch = self.value;
                    self.latched = true;
                }
                (self.latch >> 16) as u8
            }
            1 => (self.visible() >> 8) as u8,
            _ => {
                let v = self.visible();
                self.latched = false;
                v as u8
            }
        }
    }

    /// Side-effect free read for debuggers.
    pub fn peek(&self, byte: u8) -> u8 {
        (self.visible() >> (8 * u32::from(byte.min(2)))) as u8
    }

    fn visible(&self) -> u32 {
        if self.latched { self.latch } else { self.value }
    }

    /// Write byte 0..=2 of the counter or the alarm.
    pub fn write(&mut self, byte: u8, value: u8, to_alarm: bool) {
        let shift = 8 * u32::from(byte.min(2));
        let mask = !(0xFFu32 << shift);
        let target = if to_alarm { &mut self.alarm } else { &mut self.value };
        *target = ((*target & mask) | (u32::from(value) << shift)) & 0x00FF_FFFF;
        if !to_alarm {
            match byte {
                2 => self.halted = true,
                0 => self.halted = false,
                _ => {}
            }
        }
    }

    /// Advance on an external sync pulse. Returns true when the new value
    /// matches the alarm.
    pub fn pulse(&mut self) -> bool {
        if self.halted {
            return false;
        }
        self.value = self.value.wrapping_add(1) & 0x00FF_FFFF;
        self.value == self.alarm
    }

    pub fn matches_alarm(&self) -> bool {
        self.value == self.alarm
    }

    pub fn info(&self) -> TodInfo {
        TodInfo {
            value: self.value,
            latch: self.latch,
            alarm: self.alarm,
            latched: self.latched,
            halted: self.halted,
        }
    }

    pub fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u32(&mut self.value);
        visitor.visit_u32(&mut self.alarm);
        visitor.visit_u32(&mut self.latch);
        visitor.visit_bool(&mut self.latched);
        visitor.visit_bool(&mut self.halted);
    }
}
