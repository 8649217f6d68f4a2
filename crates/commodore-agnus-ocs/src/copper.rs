//! Copper - coprocessor for beam-synchronised register writes.

use emu_core::{Component, StateVisitor};
use serde::Serialize;

use crate::chip_memory::ChipMemory;

/// Copper execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum State {
    Idle,
    /// Fetch the first instruction word on the next granted slot.
    Fetch1,
    /// Fetch the second instruction word on the next granted slot.
    Fetch2,
    /// Waiting for the beam (and possibly the blitter).
    Wait,
}

impl State {
    fn encode(self) -> u8 {
        match self {
            State::Idle => 0,
            State::Fetch1 => 1,
            State::Fetch2 => 2,
            State::Wait => 3,
        }
    }

    fn decode(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => State::Idle,
            1 => State::Fetch1,
            2 => State::Fetch2,
            3 => State::Wait,
            _ => return None,
        })
    }
}

/// A register write produced by a MOVE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub reg: u16,
    pub value: u16,
}

/// Inspection snapshot of the copper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopperInfo {
    pub state: State,
    pub pc: u32,
    pub cop1lc: u32,
    pub cop2lc: u32,
    pub active_list: u8,
    pub cdang: bool,
    pub ir1: u16,
    pub ir2: u16,
    pub moves: u64,
    pub discarded_moves: u64,
}

#[derive(Debug, Clone)]
pub struct Copper {
    pub state: State,
    pub cop1lc: u32,
    pub cop2lc: u32,
    pub pc: u32,
    pub ir1: u16,
    pub ir2: u16,
    /// List the PC was last loaded from (1 or 2).
    pub active_list: u8,
    /// COPCON bit 1: allow MOVEs to $040-$07F.
    pub cdang: bool,
    /// A list location register has been written since reset.
    armed: [bool; 2],
    moves: u64,
    discarded_moves: u64,
}

impl Copper {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            cop1lc: 0,
            cop2lc: 0,
            pc: 0,
            ir1: 0,
            ir2: 0,
            active_list: 1,
            cdang: false,
            armed: [false; 2],
            moves: 0,
            discarded_moves: 0,
        }
    }

    pub fn set_location(&mut self, list: u8, hi: bool, value: u16) {
        let lc = if list == 2 { &mut self.cop2lc } else { &mut self.cop1lc };
        *lc = if hi {
            crate::regs::set_ptr_hi(*lc, value)
        } else {
            crate::regs::set_ptr_lo(*lc, value)
        };
        self.armed[usize::from(list == 2)] = true;
    }

    /// Load the PC from list 1 or 2 and fetch from there on the next
    /// granted slot. Jumping to a list that was never set up retires the
    /// copper instead.
    pub fn restart(&mut self, list: u8) {
        let list = if list == 2 { 2 } else { 1 };
        self.active_list = list;
        if !self.armed[usize::from(list == 2)] {
            log::trace!("copper jump to unset list {list}, going idle");
            self.state = State::Idle;
            return;
        }
        self.pc = if list == 2 { self.cop2lc } else { self.cop1lc };
        self.state = State::Fetch1;
        log::trace!("copper restart list {list} at {:#08X}", self.pc);
    }

    /// Vertical blank reloads list 1.
    pub fn vsync(&mut self) {
        self.restart(1);
    }

    /// The copper wants the bus for an instruction fetch.
    #[must_use]
    pub fn needs_bus(&self) -> bool {
        matches!(self.state, State::Fetch1 | State::Fetch2)
    }

    /// OCS protects $000-$03F always and $040-$07F unless CDANG is set.
    #[must_use]
    pub fn is_protected(&self, reg: u16) -> bool {
        reg < 0x40 || (reg < 0x80 && !self.cdang)
    }

    /// Use one granted DMA slot.
    ///
    /// Returns the register write when a MOVE completes. A MOVE to a
    /// protected register is dropped and the list continues.
    pub fn service_slot<M: ChipMemory + ?Sized>(
        &mut self,
        vpos: u16,
        hpos: u16,
        blitter_busy: bool,
        mem: &M,
    ) -> Option<Move> {
        match self.state {
            State::Idle | State::Wait => None,
            State::Fetch1 => {
                self.ir1 = mem.read_chip_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                self.state = State::Fetch2;
                None
            }
            State::Fetch2 => {
                self.ir2 = mem.read_chip_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                self.execute(vpos, hpos, blitter_busy)
            }
        }
    }

    /// Re-evaluate a pending WAIT on a copper-eligible slot. The comparator
    /// does not touch memory, so the slot stays free for blitter or CPU.
    /// Returns true when the wait resolved.
    pub fn poll_wait(&mut self, vpos: u16, hpos: u16, blitter_busy: bool) -> bool {
        if self.state != State::Wait || !self.beam_reached(vpos, hpos, blitter_busy) {
            return false;
        }
        self.state = State::Fetch1;
        true
    }

    fn execute(&mut self, vpos: u16, hpos: u16, blitter_busy: bool) -> Option<Move> {
        if self.ir1 & 1 == 0 {
            self.state = State::Fetch1;
            let reg = self.ir1 & 0x01FE;
            if self.is_protected(reg) {
                self.discarded_moves += 1;
                log::trace!("copper MOVE to protected register {reg:#05X} dropped");
                return None;
            }
            self.moves += 1;
            return Some(Move { reg, value: self.ir2 });
        }

        if self.ir1 == 0xFFFF && self.ir2 == 0xFFFE {
            log::trace!("copper end of list at {:#08X}", self.pc);
            self.state = State::Idle;
            return None;
        }

        if self.ir2 & 1 != 0 {
            // SKIP
            if self.beam_reached(vpos, hpos, blitter_busy) {
                self.pc = self.pc.wrapping_add(4);
            }
            self.state = State::Fetch1;
        } else {
            self.state = State::Wait;
        }
        None
    }

    /// Compare the beam against the current WAIT/SKIP operands.
    ///
    /// V7 has no enable bit and is always compared. With BFD clear the
    /// blitter must also be idle.
    #[must_use]
    pub fn beam_reached(&self, vpos: u16, hpos: u16, blitter_busy: bool) -> bool {
        let vp = (self.ir1 >> 8) & 0xFF;
        let hp = (self.ir1 >> 1) & 0x7F;
        let ve = ((self.ir2 >> 8) & 0x7F) | 0x80;
        let he = (self.ir2 >> 1) & 0x7F;

        let beam_v = vpos & 0xFF & ve;
        let beam_h = (hpos >> 1) & 0x7F & he;
        let wait_v = vp & ve;
        let wait_h = hp & he;

        let reached = beam_v > wait_v || (beam_v == wait_v && beam_h >= wait_h);
        let bfd = self.ir2 & 0x8000 != 0;
        reached && (bfd || !blitter_busy)
    }

    pub fn info(&self) -> CopperInfo {
        CopperInfo {
            state: self.state,
            pc: self.pc,
            cop1lc: self.cop1lc,
            cop2lc: self.cop2lc,
            active_list: self.active_list,
            cdang: self.cdang,
            ir1: self.ir1,
            ir2: self.ir2,
            moves: self.moves,
            discarded_moves: self.discarded_moves,
        }
    }
}

impl Default for Copper {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Copper {
    fn name(&self) -> &'static str {
        "copper"
    }

    fn reset(&mut self, _hard: bool) {
        *self = Self::new();
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        let mut state = self.state.encode();
        visitor.visit_u8(&mut state);
        match State::decode(state) {
            Some(s) => self.state = s,
            None => visitor.reject("copper state"),
        }
        visitor.visit_u32(&mut self.cop1lc);
        visitor.visit_u32(&mut self.cop2lc);
        visitor.visit_u32(&mut self.pc);
        visitor.visit_u16(&mut self.ir1);
        visitor.visit_u16(&mut self.ir2);
        visitor.visit_u8(&mut self.active_list);
        visitor.visit_bool(&mut self.cdang);
        visitor.visit_bool(&mut self.armed[0]);
        visitor.visit_bool(&mut self.armed[1]);
        visitor.visit_u64(&mut self.moves);
        visitor.visit_u64(&mut self.discarded_moves);
    }
}
