//! Blitter - block transfer and line drawing engine.
//!
//! Area mode combines up to three source channels (A, B, C) through an
//! 8-bit minterm into destination D, with barrel shifting, first/last word
//! masks, fill and per-row modulos. Line mode draws one Bresenham pixel per
//! step. Work advances one word (or pixel) per granted DMA slot.

use emu_core::{Component, ConfigError, StateVisitor};
use serde::{Deserialize, Serialize};

use crate::chip_memory::ChipMemory;
use crate::regs;

const USEA: u16 = 0x0800;
const USEB: u16 = 0x0400;
const USEC: u16 = 0x0200;
const USED: u16 = 0x0100;

const LINE: u16 = 0x0001;
const DESC: u16 = 0x0002;
const SING: u16 = 0x0002;
const FCI: u16 = 0x0004;
const IFE: u16 = 0x0008;
const EFE: u16 = 0x0010;
const AUL: u16 = 0x0004;
const SUL: u16 = 0x0008;
const SUD: u16 = 0x0010;

/// How closely blit timing follows the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlitterAccuracy {
    /// The whole blit completes when BLTSIZE is written. No bus cycles used.
    Instant = 0,
    /// The blit is computed at start, but BBUSY stays set for one granted
    /// slot per word.
    Coarse = 1,
    /// One word per granted slot.
    #[default]
    Stepped = 2,
}

impl BlitterAccuracy {
    #[must_use]
    pub fn is_valid(value: i64) -> bool {
        Self::try_from(value).is_ok()
    }
}

impl TryFrom<i64> for BlitterAccuracy {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Instant),
            1 => Ok(Self::Coarse),
            2 => Ok(Self::Stepped),
            _ => Err(ConfigError::InvalidValue { option: "blitter.accuracy", value }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlitterConfig {
    pub accuracy: BlitterAccuracy,
}

/// Outcome of starting or stepping a blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitProgress {
    Idle,
    Busy,
    /// The blit finished on this call. The caller raises the BLIT interrupt.
    Finished,
}

/// Inspection snapshot of the blitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlitterInfo {
    pub bltcon0: u16,
    pub bltcon1: u16,
    pub afwm: u16,
    pub alwm: u16,
    pub apt: u32,
    pub bpt: u32,
    pub cpt: u32,
    pub dpt: u32,
    pub amod: i16,
    pub bmod: i16,
    pub cmod: i16,
    pub dmod: i16,
    pub adat: u16,
    pub bdat: u16,
    pub cdat: u16,
    pub ddat: u16,
    pub width: u16,
    pub height: u16,
    pub busy: bool,
    pub zero: bool,
    pub line_mode: bool,
    pub fill: bool,
    pub words_remaining: u32,
    pub accuracy: BlitterAccuracy,
    pub blits_completed: u64,
}

#[derive(Debug, Clone)]
pub struct Blitter {
    pub bltcon0: u16,
    pub bltcon1: u16,
    pub afwm: u16,
    pub alwm: u16,
    pub apt: u32,
    pub bpt: u32,
    pub cpt: u32,
    pub dpt: u32,
    pub amod: i16,
    pub bmod: i16,
    pub cmod: i16,
    pub dmod: i16,
    /// Holding registers. DMA reads update them, so a disabled channel
    /// keeps supplying the last value.
    pub adat: u16,
    pub bdat: u16,
    pub cdat: u16,
    pub ddat: u16,

    /// Words per row and rows, decoded from BLTSIZE.
    pub width: u16,
    pub height: u16,

    pub busy: bool,
    /// Stays true while every output word of the blit has been zero.
    pub zero: bool,
    pub accuracy: BlitterAccuracy,

    row: u16,
    col: u16,
    a_prev: u16,
    b_prev: u16,
    fill_carry: bool,
    first_word: bool,
    last_word: bool,
    /// Slots still to burn in coarse mode.
    pending_slots: u32,
    /// Line mode: a pixel has been plotted on the current row (SING).
    line_row_drawn: bool,
    blits_completed: u64,
    /// Accuracy the blit in flight was started with.
    active: BlitterAccuracy,
}

impl Blitter {
    pub fn new(config: BlitterConfig) -> Self {
        Self {
            bltcon0: 0,
            bltcon1: 0,
            afwm: 0xFFFF,
            alwm: 0xFFFF,
            apt: 0,
            bpt: 0,
            cpt: 0,
            dpt: 0,
            amod: 0,
            bmod: 0,
            cmod: 0,
            dmod: 0,
            adat: 0,
            bdat: 0,
            cdat: 0,
            ddat: 0,
            width: 0,
            height: 0,
            busy: false,
            zero: true,
            accuracy: config.accuracy,
            row: 0,
            col: 0,
            a_prev: 0,
            b_prev: 0,
            fill_carry: false,
            first_word: false,
            last_word: false,
            pending_slots: 0,
            line_row_drawn: false,
            blits_completed: 0,
            active: config.accuracy,
        }
    }

    #[must_use]
    pub fn line_mode(&self) -> bool {
        self.bltcon1 & LINE != 0
    }

    fn descending(&self) -> bool {
        !self.line_mode() && self.bltcon1 & DESC != 0
    }

    fn fill_enabled(&self) -> bool {
        !self.line_mode() && self.bltcon1 & (IFE | EFE) != 0
    }

    fn total_units(&self) -> u32 {
        if self.line_mode() {
            u32::from(self.height)
        } else {
            u32::from(self.width) * u32::from(self.height)
        }
    }

    /// Whether the blitter asks Agnus for the next free slot.
    #[must_use]
    pub fn wants_bus(&self) -> bool {
        self.busy && self.active != BlitterAccuracy::Instant
    }

    /// Words (or line pixels) not yet processed.
    #[must_use]
    pub fn words_remaining(&self) -> u32 {
        if !self.busy {
            return 0;
        }
        if self.active == BlitterAccuracy::Coarse {
            return self.pending_slots;
        }
        let done = if self.line_mode() {
            u32::from(self.row)
        } else {
            u32::from(self.row) * u32::from(self.width) + u32::from(self.col)
        };
        self.total_units().saturating_sub(done)
    }

    /// DMACONR status bits (BBUSY, BZERO).
    #[must_use]
    pub fn dmaconr_bits(&self) -> u16 {
        let mut bits = 0;
        if self.busy {
            bits |= regs::dmacon::BBUSY;
        }
        if self.zero {
            bits |= regs::dmacon::BZERO;
        }
        bits
    }

    /// Handle a write to a blitter register. Returns true when the write was
    /// to BLTSIZE and a blit should start.
    pub fn write_register(&mut self, offset: u16, value: u16) -> bool {
        match offset {
            regs::BLTCON0 => self.bltcon0 = value,
            regs::BLTCON1 => self.bltcon1 = value,
            regs::BLTAFWM => self.afwm = value,
            regs::BLTALWM => self.alwm = value,
            regs::BLTAPTH => self.apt = regs::set_ptr_hi(self.apt, value),
            regs::BLTAPTL => self.apt = regs::set_ptr_lo(self.apt, value),
            regs::BLTBPTH => self.bpt = regs::set_ptr_hi(self.bpt, value),
            regs::BLTBPTL => self.bpt = regs::set_ptr_lo(self.bpt, value),
            regs::BLTCPTH => self.cpt = regs::set_ptr_hi(self.cpt, value),
            regs::BLTCPTL => self.cpt = regs::set_ptr_lo(self.cpt, value),
            regs::BLTDPTH => self.dpt = regs::set_ptr_hi(self.dpt, value),
            regs::BLTDPTL => self.dpt = regs::set_ptr_lo(self.dpt, value),
            regs::BLTAMOD => self.amod = (value & 0xFFFE) as i16,
            regs::BLTBMOD => self.bmod = (value & 0xFFFE) as i16,
            regs::BLTCMOD => self.cmod = (value & 0xFFFE) as i16,
            regs::BLTDMOD => self.dmod = (value & 0xFFFE) as i16,
            regs::BLTADAT => self.adat = value,
            regs::BLTBDAT => self.bdat = value,
            regs::BLTCDAT => self.cdat = value,
            regs::BLTSIZE => {
                let height = (value >> 6) & 0x03FF;
                let width = value & 0x003F;
                self.height = if height == 0 { 1024 } else { height };
                self.width = if width == 0 { 64 } else { width };
                return true;
            }
            _ => {}
        }
        false
    }

    /// Latch the programmed registers and begin a blit.
    ///
    /// Instant accuracy runs the whole blit here and returns `Finished`;
    /// coarse accuracy computes everything now but stays busy for one slot
    /// per word.
    pub fn start<M: ChipMemory + ?Sized>(&mut self, mem: &mut M) -> BlitProgress {
        self.active = self.accuracy;
        self.busy = true;
        self.zero = true;
        self.row = 0;
        self.col = 0;
        self.a_prev = 0;
        self.b_prev = 0;
        self.fill_carry = self.bltcon1 & FCI != 0;
        self.line_row_drawn = false;
        self.update_word_flags();
        log::trace!(
            "blit start con0={:#06X} con1={:#06X} {}x{} {:?}",
            self.bltcon0,
            self.bltcon1,
            self.width,
            self.height,
            self.accuracy
        );

        match self.active {
            BlitterAccuracy::Stepped => BlitProgress::Busy,
            BlitterAccuracy::Instant => {
                while !self.compute_unit(mem) {}
                self.finish()
            }
            BlitterAccuracy::Coarse => {
                while !self.compute_unit(mem) {}
                self.pending_slots = self.total_units();
                BlitProgress::Busy
            }
        }
    }

    /// Process one word (or line pixel) on a granted DMA slot.
    pub fn step_one_word<M: ChipMemory + ?Sized>(&mut self, mem: &mut M) -> BlitProgress {
        if !self.busy {
            return BlitProgress::Idle;
        }
        let done = match self.active {
            BlitterAccuracy::Coarse => {
                self.pending_slots = self.pending_slots.saturating_sub(1);
                self.pending_slots == 0
            }
            _ => self.compute_unit(mem),
        };
        if done { self.finish() } else { BlitProgress::Busy }
    }

    fn finish(&mut self) -> BlitProgress {
        self.busy = false;
        self.pending_slots = 0;
        self.blits_completed += 1;
        log::trace!("blit done zero={}", self.zero);
        BlitProgress::Finished
    }

    /// Run one unit of work. Returns true when the blit has no more units.
    fn compute_unit<M: ChipMemory + ?Sized>(&mut self, mem: &mut M) -> bool {
        if self.line_mode() {
            self.line_step(mem);
            self.row += 1;
            return self.row >= self.height;
        }

        self.area_word(mem);
        self.col += 1;
        if self.col >= self.width {
            self.col = 0;
            self.row += 1;
            self.fill_carry = self.bltcon1 & FCI != 0;
        }
        self.update_word_flags();
        self.row >= self.height
    }

    fn update_word_flags(&mut self) {
        self.first_word = self.col == 0;
        self.last_word = self.col + 1 >= self.width;
    }

    fn area_word<M: ChipMemory + ?Sized>(&mut self, mem: &mut M) {
        let desc = self.descending();
        let step: i32 = if desc { -2 } else { 2 };

        if self.bltcon0 & USEA != 0 {
            self.adat = mem.read_chip_word(self.apt);
            self.apt = self.apt.wrapping_add_signed(step);
        }
        if self.bltcon0 & USEB != 0 {
            self.bdat = mem.read_chip_word(self.bpt);
            self.bpt = self.bpt.wrapping_add_signed(step);
        }
        if self.bltcon0 & USEC != 0 {
            self.cdat = mem.read_chip_word(self.cpt);
            self.cpt = self.cpt.wrapping_add_signed(step);
        }

        let mut a = self.adat;
        if self.first_word {
            a &= self.afwm;
        }
        if self.last_word {
            a &= self.alwm;
        }
        let a_shifted = barrel_shift(self.a_prev, a, self.bltcon0 >> 12, desc);
        let b_shifted = barrel_shift(self.b_prev, self.bdat, self.bltcon1 >> 12, desc);
        self.a_prev = a;
        self.b_prev = self.bdat;

        let mut d = minterm(a_shifted, b_shifted, self.cdat, self.bltcon0 as u8);
        if self.fill_enabled() {
            d = self.fill(d);
        }
        self.ddat = d;
        if d != 0 {
            self.zero = false;
        }

        if self.bltcon0 & USED != 0 {
            mem.write_chip_word(self.dpt, d);
            self.dpt = self.dpt.wrapping_add_signed(step);
        }

        if self.last_word {
            let sign: i32 = if desc { -1 } else { 1 };
            if self.bltcon0 & USEA != 0 {
                self.apt = self.apt.wrapping_add_signed(i32::from(self.amod) * sign);
            }
            if self.bltcon0 & USEB != 0 {
                self.bpt = self.bpt.wrapping_add_signed(i32::from(self.bmod) * sign);
            }
            if self.bltcon0 & USEC != 0 {
                self.cpt = self.cpt.wrapping_add_signed(i32::from(self.cmod) * sign);
            }
            if self.bltcon0 & USED != 0 {
                self.dpt = self.dpt.wrapping_add_signed(i32::from(self.dmod) * sign);
            }
        }
    }

    /// Area fill from bit 0 upward. Inclusive fill keeps both edge bits,
    /// exclusive fill keeps only the lower one.
    fn fill(&mut self, d: u16) -> u16 {
        let efe = self.bltcon1 & EFE != 0;
        let mut carry = u16::from(self.fill_carry);
        let mut out = 0u16;
        for bit in 0..16 {
            let d_bit = (d >> bit) & 1;
            let o = if efe { d_bit ^ carry } else { d_bit | carry };
            out |= o << bit;
            carry ^= d_bit;
        }
        self.fill_carry = carry != 0;
        out
    }

    /// Plot one line pixel and step the Bresenham state.
    ///
    /// The error term lives in the low word of BLTAPT; BLTBMOD is added
    /// while it is negative, BLTAMOD otherwise. BLTCMOD is the row stride.
    fn line_step<M: ChipMemory + ?Sized>(&mut self, mem: &mut M) {
        let ash = self.bltcon0 >> 12;
        let texture_shift = u32::from(self.bltcon1 >> 12);

        let a = self.adat >> ash;
        // Texture bit for pixel n is bit (BSH - n) mod 16 of BLTBDAT.
        let texture = self.bdat.rotate_right(texture_shift).rotate_left(u32::from(self.row));
        let b = if texture & 1 != 0 {
            0xFFFF
        } else {
            0
        };
        self.cdat = mem.read_chip_word(self.cpt);
        let mut d = minterm(a, b, self.cdat, self.bltcon0 as u8);
        if self.bltcon1 & SING != 0 && self.line_row_drawn {
            d = self.cdat;
        }
        self.line_row_drawn = true;
        self.ddat = d;
        if d != 0 {
            self.zero = false;
        }
        if self.bltcon0 & USED != 0 {
            mem.write_chip_word(self.dpt, d);
        }

        let error = (self.apt & 0xFFFF) as u16 as i16;
        let sud = self.bltcon1 & SUD != 0;
        let sul = self.bltcon1 & SUL != 0;
        let aul = self.bltcon1 & AUL != 0;

        if error >= 0 {
            match (sud, sul) {
                (true, false) => self.line_inc_x(),
                (true, true) => self.line_dec_x(),
                (false, false) => self.line_step_y(false),
                (false, true) => self.line_step_y(true),
            }
        }
        match (sud, aul) {
            (true, false) => self.line_step_y(false),
            (true, true) => self.line_step_y(true),
            (false, false) => self.line_inc_x(),
            (false, true) => self.line_dec_x(),
        }

        let modulo = if error < 0 { self.bmod } else { self.amod };
        let next = error.wrapping_add(modulo) as u16;
        self.apt = (self.apt & 0xFFFF_0000) | u32::from(next);
        self.dpt = self.cpt;
    }

    fn line_inc_x(&mut self) {
        let ash = (self.bltcon0 >> 12) + 1;
        if ash == 16 {
            self.cpt = self.cpt.wrapping_add(2);
        }
        self.bltcon0 = (self.bltcon0 & 0x0FFF) | ((ash & 0xF) << 12);
    }

    fn line_dec_x(&mut self) {
        let ash = self.bltcon0 >> 12;
        if ash == 0 {
            self.cpt = self.cpt.wrapping_sub(2);
        }
        self.bltcon0 = (self.bltcon0 & 0x0FFF) | ((ash.wrapping_sub(1) & 0xF) << 12);
    }

    fn line_step_y(&mut self, up: bool) {
        let stride = i32::from(self.cmod);
        let delta = if up { -stride } else { stride };
        self.cpt = self.cpt.wrapping_add_signed(delta);
        self.line_row_drawn = false;
    }

    pub fn info(&self) -> BlitterInfo {
        BlitterInfo {
            bltcon0: self.bltcon0,
            bltcon1: self.bltcon1,
            afwm: self.afwm,
            alwm: self.alwm,
            apt: self.apt,
            bpt: self.bpt,
            cpt: self.cpt,
            dpt: self.dpt,
            amod: self.amod,
            bmod: self.bmod,
            cmod: self.cmod,
            dmod: self.dmod,
            adat: self.adat,
            bdat: self.bdat,
            cdat: self.cdat,
            ddat: self.ddat,
            width: self.width,
            height: self.height,
            busy: self.busy,
            zero: self.zero,
            line_mode: self.line_mode(),
            fill: self.fill_enabled(),
            words_remaining: self.words_remaining(),
            accuracy: self.accuracy,
            blits_completed: self.blits_completed,
        }
    }
}

impl Default for Blitter {
    fn default() -> Self {
        Self::new(BlitterConfig::default())
    }
}

/// Combine the previous and current source words and shift. Descending
/// blits shift left instead of right.
#[must_use]
pub fn barrel_shift(prev: u16, cur: u16, shift: u16, desc: bool) -> u16 {
    let shift = u32::from(shift & 0xF);
    if desc {
        (((u32::from(cur) << 16) | u32::from(prev)) >> (16 - shift)) as u16
    } else {
        (((u32::from(prev) << 16) | u32::from(cur)) >> shift) as u16
    }
}

/// Evaluate the minterm `lf` bitwise. Bit `(a << 2) | (b << 1) | c` of `lf`
/// is the output for that input combination.
#[must_use]
pub fn minterm(a: u16, b: u16, c: u16, lf: u8) -> u16 {
    let mut d = 0;
    if lf & 0x80 != 0 {
        d |= a & b & c;
    }
    if lf & 0x40 != 0 {
        d |= a & b & !c;
    }
    if lf & 0x20 != 0 {
        d |= a & !b & c;
    }
    if lf & 0x10 != 0 {
        d |= a & !b & !c;
    }
    if lf & 0x08 != 0 {
        d |= !a & b & c;
    }
    if lf & 0x04 != 0 {
        d |= !a & b & !c;
    }
    if lf & 0x02 != 0 {
        d |= !a & !b & c;
    }
    if lf & 0x01 != 0 {
        d |= !a & !b & !c;
    }
    d
}

impl Component for Blitter {
    fn name(&self) -> &'static str {
        "blitter"
    }

    fn reset(&mut self, _hard: bool) {
        *self = Self::new(BlitterConfig { accuracy: self.accuracy });
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u16(&mut self.bltcon0);
        visitor.visit_u16(&mut self.bltcon1);
        visitor.visit_u16(&mut self.afwm);
        visitor.visit_u16(&mut self.alwm);
        visitor.visit_u32(&mut self.apt);
        visitor.visit_u32(&mut self.bpt);
        visitor.visit_u32(&mut self.cpt);
        visitor.visit_u32(&mut self.dpt);
        visitor.visit_i16(&mut self.amod);
        visitor.visit_i16(&mut self.bmod);
        visitor.visit_i16(&mut self.cmod);
        visitor.visit_i16(&mut self.dmod);
        visitor.visit_u16(&mut self.adat);
        visitor.visit_u16(&mut self.bdat);
        visitor.visit_u16(&mut self.cdat);
        visitor.visit_u16(&mut self.ddat);
        visitor.visit_u16(&mut self.width);
        visitor.visit_u16(&mut self.height);
        visitor.visit_bool(&mut self.busy);
        visitor.visit_bool(&mut self.zero);
        visitor.visit_u16(&mut self.row);
        visitor.visit_u16(&mut self.col);
        visitor.visit_u16(&mut self.a_prev);
        visitor.visit_u16(&mut self.b_prev);
        visitor.visit_bool(&mut self.fill_carry);
        visitor.visit_bool(&mut self.first_word);
        visitor.visit_bool(&mut self.last_word);
        visitor.visit_u32(&mut self.pending_slots);
        visitor.visit_bool(&mut self.line_row_drawn);
        visitor.visit_u64(&mut self.blits_completed);
        let mut active = self.active as u8;
        visitor.visit_u8(&mut active);
        match BlitterAccuracy::try_from(i64::from(active)) {
            Ok(accuracy) => self.active = accuracy,
            Err(_) => visitor.reject("blitter accuracy"),
        }
    }
}
