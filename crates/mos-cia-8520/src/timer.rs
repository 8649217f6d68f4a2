//! 16-bit interval timer with latch and PB output.

use emu_core::StateVisitor;
use serde::Serialize;

/// Control register bits shared by CRA and CRB.
pub(crate) const CR_START: u8 = 0x01;
pub(crate) const CR_PBON: u8 = 0x02;
pub(crate) const CR_OUTMODE: u8 = 0x04;
pub(crate) const CR_RUNMODE: u8 = 0x08;
pub(crate) const CR_LOAD: u8 = 0x10;

/// Inspection view of one timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerInfo {
    pub count: u16,
    pub latch: u16,
    pub running: bool,
    pub one_shot: bool,
    /// Timer output appears on PB6 (A) or PB7 (B).
    pub pb_output_enabled: bool,
    /// Toggle (true) or pulse (false) output mode.
    pub toggle_mode: bool,
    /// Current level of the PB output.
    pub pb_level: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timer {
    pub count: u16,
    pub latch: u16,
    pub running: bool,
    pub one_shot: bool,
    pub force_load: bool,
    pub pb_on: bool,
    pub toggle_mode: bool,
    toggle: bool,
    pulse: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            count: 0xFFFF,
            latch: 0xFFFF,
            running: false,
            one_shot: false,
            force_load: false,
            pb_on: false,
            toggle_mode: false,
            toggle: false,
            pulse: false,
        }
    }

    /// Apply the timer bits of CRA/CRB.
    pub fn write_control(&mut self, value: u8) {
        let start = value & CR_START != 0;
        if start && !self.running {
            // The toggle flip-flop goes high whenever the timer is started.
            self.toggle = true;
        }
        self.running = start;
        self.one_shot = value & CR_RUNMODE != 0;
        self.pb_on = value & CR_PBON != 0;
        self.toggle_mode = value & CR_OUTMODE != 0;
        if value & CR_LOAD != 0 {
            self.force_load = true;
        }
    }

    /// Control register bits the timer owns, for reads.
    pub fn control_bits(&self) -> u8 {
        let mut bits = 0;
        if self.running {
            bits |= CR_START;
        }
        if self.pb_on {
            bits |= CR_PBON;
        }
        if self.toggle_mode {
            bits |= CR_OUTMODE;
        }
        if self.one_shot {
            bits |= CR_RUNMODE;
        }
        bits
    }

    pub fn write_latch_lo(&mut self, value: u8) {
        self.latch = (self.latch & 0xFF00) | u16::from(value);
    }

    /// High byte write. A stopped timer loads the latch; in one-shot mode
    /// the write also starts it (8520 behaviour).
    pub fn write_latch_hi(&mut self, value: u8) {
        self.latch = (self.latch & 0x00FF) | (u16::from(value) << 8);
        if !self.running {
            self.count = self.latch;
            if self.one_shot {
                self.running = true;
                self.toggle = true;
            }
        }
    }

    /// Clear the one-cycle pulse output and apply a pending force load.
    pub fn begin_cycle(&mut self) {
        self.pulse = false;
        if self.force_load {
            self.count = self.latch;
            self.force_load = false;
        }
    }

    /// Count one input event. Returns true on underflow.
    pub fn count_down(&mut self) -> bool {
        if !self.running {
            return false;
        }
        if self.count != 0 {
            self.count -= 1;
            return false;
        }
        self.count = self.latch;
        self.toggle = !self.toggle;
        self.pulse = true;
        if self.one_shot {
            self.running = false;
        }
        true
    }

    pub fn pb_level(&self) -> bool {
        if self.toggle_mode { self.toggle } else { self.pulse }
    }

    pub fn info(&self) -> TimerInfo {
        TimerInfo {
            count: self.count,
            latch: self.latch,
            running: self.running,
            one_shot: self.one_shot,
            pb_output_enabled: self.pb_on,
            toggle_mode: self.toggle_mode,
            pb_level: self.pb_level(),
        }
    }

    pub fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u16(&mut self.count);
        visitor.visit_u16(&mut self.latch);
        visitor.visit_bool(&mut self.running);
        visitor.visit_bool(&mut self.one_shot);
        visitor.visit_bool(&mut self.force_load);
        visitor.visit_bool(&mut self.pb_on);
        visitor.visit_bool(&mut self.toggle_mode);
        visitor.visit_bool(&mut self.toggle);
        visitor.visit_bool(&mut self.pulse);
    }
}
