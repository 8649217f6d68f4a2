//! Agnus - beam counter and DMA slot arbitration.
//!
//! Every colour clock (CCK) is one chip bus slot. The slot table below
//! follows the OCS hardware allocation: refresh, disk, audio and sprite DMA
//! sit at fixed odd positions at the start of each line, bitplane DMA takes
//! slots inside the data fetch window, the copper may use any remaining even
//! slot, and the blitter and CPU compete for whatever is left.

use emu_core::{Component, StateVisitor};
use serde::Serialize;

use crate::chip_memory::ChipMemory;
use crate::frame::{Frame, PAL_LONG_FRAME_LINES};
use crate::regs::{self, dmacon};

pub const PAL_CCKS_PER_LINE: u16 = 227;

/// First line on which sprite DMA may run (end of vertical blank).
pub const VBLANK_END_LINE: u16 = 25;

/// Earliest and latest data fetch positions accepted by OCS Agnus.
const DDF_MIN: u16 = 0x18;
const DDF_MAX: u16 = 0xD8;

/// The copper cannot use this even slot.
const COPPER_DENIED_SLOT: u16 = 0xE0;

/// Consecutive blitter wins after which the CPU gets a slot (BLTPRI clear).
const CPU_STARVE_LIMIT: u8 = 3;

/// Maps position (0-7) within an 8-CCK lores fetch group to bitplane index.
/// None = free slot.
pub const LOWRES_DDF_TO_PLANE: [Option<u8>; 8] = [
    None,
    Some(3),
    Some(5),
    Some(1),
    None,
    Some(2),
    Some(4),
    Some(0),
];

/// Hires fetches four planes twice per group.
pub const HIRES_DDF_TO_PLANE: [Option<u8>; 8] = [
    Some(3),
    Some(1),
    Some(2),
    Some(0),
    Some(3),
    Some(1),
    Some(2),
    Some(0),
];

/// Who used the chip bus in one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BusOwner {
    /// Nobody asked for the slot.
    #[default]
    None,
    Cpu,
    Refresh,
    Disk,
    Audio(u8),
    Sprite(u8),
    Bitplane(u8),
    Copper,
    Blitter,
}

impl BusOwner {
    /// Number of distinct owner kinds tracked in usage counters.
    pub const KINDS: usize = 9;

    #[must_use]
    pub fn kind_index(self) -> usize {
        match self {
            BusOwner::None => 0,
            BusOwner::Cpu => 1,
            BusOwner::Refresh => 2,
            BusOwner::Disk => 3,
            BusOwner::Audio(_) => 4,
            BusOwner::Sprite(_) => 5,
            BusOwner::Bitplane(_) => 6,
            BusOwner::Copper => 7,
            BusOwner::Blitter => 8,
        }
    }

    fn encode(self) -> u8 {
        match self {
            BusOwner::None => 0,
            BusOwner::Cpu => 1,
            BusOwner::Refresh => 2,
            BusOwner::Disk => 3,
            BusOwner::Audio(n) => 4 + (n & 3),
            BusOwner::Sprite(n) => 8 + (n & 7),
            BusOwner::Bitplane(n) => 16 + n.min(5),
            BusOwner::Copper => 22,
            BusOwner::Blitter => 23,
        }
    }

    fn decode(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => BusOwner::None,
            1 => BusOwner::Cpu,
            2 => BusOwner::Refresh,
            3 => BusOwner::Disk,
            4..=7 => BusOwner::Audio(raw - 4),
            8..=15 => BusOwner::Sprite(raw - 8),
            16..=21 => BusOwner::Bitplane(raw - 16),
            22 => BusOwner::Copper,
            23 => BusOwner::Blitter,
            _ => return None,
        })
    }
}

/// Which clients want the bus in the current slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusRequests {
    /// Copper is fetching (not waiting) and the slot is copper-eligible.
    pub copper: bool,
    /// Blitter has a word to process.
    pub blitter: bool,
    /// CPU wants a chip bus cycle.
    pub cpu: bool,
}

/// What happened to the beam when it advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamEvent {
    None,
    /// Beam wrapped to cycle 0 of the next line.
    NewLine,
    /// Beam wrapped to line 0 of a new frame.
    NewFrame,
}

/// Inspection snapshot of Agnus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgnusInfo {
    pub vpos: u16,
    pub hpos: u16,
    pub frame: Frame,
    pub dmacon: u16,
    pub bplcon0: u16,
    pub ddfstrt: u16,
    pub ddfstop: u16,
    pub diwstrt: u16,
    pub diwstop: u16,
    pub bpl_pt: [u32; 6],
    pub bpl1mod: i16,
    pub bpl2mod: i16,
    pub spr_pt: [u32; 8],
    pub dsk_pt: u32,
    /// Slot owners of the current line up to the beam.
    pub line_owners: Vec<BusOwner>,
    /// Slots granted per owner kind since power-on, indexed by
    /// [`BusOwner::kind_index`].
    pub usage: [u64; BusOwner::KINDS],
}

#[derive(Debug, Clone)]
pub struct Agnus {
    pub vpos: u16,
    pub hpos: u16, // in CCKs
    pub frame: Frame,

    pub dmacon: u16,
    pub bplcon0: u16,
    pub bpl_pt: [u32; 6],
    pub bpl1mod: i16,
    pub bpl2mod: i16,
    /// Last word fetched per plane, handed on to the display chip.
    pub bpl_dat: [u16; 6],
    pub ddfstrt: u16,
    pub ddfstop: u16,
    pub diwstrt: u16,
    pub diwstop: u16,

    pub spr_pt: [u32; 8],
    pub dsk_pt: u32,

    cpu_denials: u8,
    bus_owner: [BusOwner; PAL_CCKS_PER_LINE as usize],
    usage: [u64; BusOwner::KINDS],
}

impl Agnus {
    pub fn new() -> Self {
        Self {
            vpos: 0,
            hpos: 0,
            frame: Frame::new(),
            dmacon: 0,
            bplcon0: 0,
            bpl_pt: [0; 6],
            bpl1mod: 0,
            bpl2mod: 0,
            bpl_dat: [0; 6],
            ddfstrt: 0,
            ddfstop: 0,
            diwstrt: 0,
            diwstop: 0,
            spr_pt: [0; 8],
            dsk_pt: 0,
            cpu_denials: 0,
            bus_owner: [BusOwner::None; PAL_CCKS_PER_LINE as usize],
            usage: [0; BusOwner::KINDS],
        }
    }

    pub fn num_bitplanes(&self) -> u8 {
        let bpu = ((self.bplcon0 >> 12) & 0x07) as u8;
        let max = if self.hires() { 4 } else { 6 };
        bpu.min(max)
    }

    #[must_use]
    pub fn hires(&self) -> bool {
        self.bplcon0 & 0x8000 != 0
    }

    #[must_use]
    pub fn interlace(&self) -> bool {
        self.bplcon0 & 0x0004 != 0
    }

    pub fn dma_enabled(&self, bit: u16) -> bool {
        (self.dmacon & dmacon::DMAEN) != 0 && (self.dmacon & bit) != 0
    }

    /// `true` when the blitter takes every free slot (BLTPRI set).
    #[must_use]
    pub fn blitter_nasty(&self) -> bool {
        self.dmacon & dmacon::BLTPRI != 0
    }

    /// Owner of the slot at `hpos` in the current line, as recorded so far.
    #[must_use]
    pub fn bus_owner_at(&self, hpos: u16) -> BusOwner {
        self.bus_owner
            .get(usize::from(hpos))
            .copied()
            .unwrap_or_default()
    }

    /// Total slots granted to owners of `kind` since power-on.
    #[must_use]
    pub fn usage(&self, kind: BusOwner) -> u64 {
        self.usage[kind.kind_index()]
    }

    // ---- slot table ------------------------------------------------------

    /// Fixed-function DMA owning the current slot, if any.
    ///
    /// These channels outrank copper, blitter and CPU unconditionally.
    #[must_use]
    pub fn fixed_slot_owner(&self) -> Option<BusOwner> {
        let h = self.hpos;
        match h {
            0x01 | 0x03 | 0x05 | 0xE2 => Some(BusOwner::Refresh),
            0x07 | 0x09 | 0x0B => self.dma_enabled(dmacon::DSKEN).then_some(BusOwner::Disk),
            0x0D | 0x0F | 0x11 | 0x13 => {
                let channel = ((h - 0x0D) / 2) as u8;
                self.dma_enabled(dmacon::AUD0EN << channel)
                    .then_some(BusOwner::Audio(channel))
            }
            0x15..=0x34 if h % 2 == 1 => {
                let sprite = ((h - 0x15) / 4) as u8;
                (self.dma_enabled(dmacon::SPREN)
                    && self.vpos >= VBLANK_END_LINE
                    && self.bitplane_slot().is_none())
                .then_some(BusOwner::Sprite(sprite))
                .or_else(|| self.bitplane_slot().map(BusOwner::Bitplane))
            }
            _ => self.bitplane_slot().map(BusOwner::Bitplane),
        }
    }

    /// Bitplane fetched in the current slot, if the fetch window and the
    /// vertical display window both cover it.
    #[must_use]
    pub fn bitplane_slot(&self) -> Option<u8> {
        if !self.dma_enabled(dmacon::BPLEN) || !self.in_vertical_window() {
            return None;
        }
        let planes = self.num_bitplanes();
        if planes == 0 {
            return None;
        }
        let (start, stop) = self.fetch_window();
        if self.hpos < start || self.hpos > stop + 7 {
            return None;
        }
        let pos = usize::from((self.hpos - start) % 8);
        let table = if self.hires() { &HIRES_DDF_TO_PLANE } else { &LOWRES_DDF_TO_PLANE };
        table[pos].filter(|&plane| plane < planes)
    }

    fn fetch_window(&self) -> (u16, u16) {
        let start = self.ddfstrt.clamp(DDF_MIN, DDF_MAX);
        let stop = self.ddfstop.clamp(start, DDF_MAX);
        (start, stop)
    }

    fn in_vertical_window(&self) -> bool {
        let start = self.diwstrt >> 8;
        // V8 of the stop position is the inverse of V7.
        let stop = (self.diwstop >> 8) | if self.diwstop & 0x8000 == 0 { 0x100 } else { 0 };
        (start..stop).contains(&self.vpos)
    }

    /// Whether the copper may use the current slot.
    #[must_use]
    pub fn copper_slot_free(&self) -> bool {
        self.dma_enabled(dmacon::COPEN)
            && self.hpos % 2 == 0
            && self.hpos != COPPER_DENIED_SLOT
            && self.fixed_slot_owner().is_none()
    }

    /// Resolve the owner of the current slot and record it.
    ///
    /// Exactly one owner is recorded per slot. With BLTPRI clear the CPU is
    /// handed a slot after it has lost [`CPU_STARVE_LIMIT`] in a row to the
    /// blitter.
    pub fn allocate_slot(&mut self, requests: BusRequests) -> BusOwner {
        let owner = if let Some(fixed) = self.fixed_slot_owner() {
            fixed
        } else if requests.copper && self.copper_slot_free() {
            BusOwner::Copper
        } else {
            let blitter = requests.blitter && self.dma_enabled(dmacon::BLTEN);
            match (blitter, requests.cpu) {
                (true, true) => {
                    if self.blitter_nasty() || self.cpu_denials < CPU_STARVE_LIMIT {
                        self.cpu_denials = self.cpu_denials.saturating_add(1);
                        BusOwner::Blitter
                    } else {
                        self.cpu_denials = 0;
                        BusOwner::Cpu
                    }
                }
                (true, false) => BusOwner::Blitter,
                (false, true) => {
                    self.cpu_denials = 0;
                    BusOwner::Cpu
                }
                (false, false) => BusOwner::None,
            }
        };
        self.record(owner);
        owner
    }

    fn record(&mut self, owner: BusOwner) {
        if let Some(slot) = self.bus_owner.get_mut(usize::from(self.hpos)) {
            *slot = owner;
        }
        self.usage[owner.kind_index()] += 1;
    }

    // ---- DMA callbacks -----------------------------------------------------

    /// Fetch one bitplane word and step the pointer. The last fetch group of
    /// the line adds the plane's modulo.
    pub fn fetch_bitplane<M: ChipMemory + ?Sized>(&mut self, plane: u8, mem: &M) {
        let p = usize::from(plane.min(5));
        self.bpl_dat[p] = mem.read_chip_word(self.bpl_pt[p]);
        self.bpl_pt[p] = self.bpl_pt[p].wrapping_add(2);

        let (start, stop) = self.fetch_window();
        let last_group = (stop - start) & !7;
        if self.hpos - start >= last_group {
            let modulo = if p % 2 == 0 { self.bpl1mod } else { self.bpl2mod };
            self.bpl_pt[p] = self.bpl_pt[p].wrapping_add_signed(i32::from(modulo));
        }
    }

    // ---- beam --------------------------------------------------------------

    /// Move the beam one CCK forward.
    pub fn advance_beam(&mut self) -> BeamEvent {
        self.hpos += 1;
        if self.hpos < PAL_CCKS_PER_LINE {
            return BeamEvent::None;
        }
        self.hpos = 0;
        self.vpos += 1;
        if self.vpos < self.frame.num_lines() {
            return BeamEvent::NewLine;
        }
        self.vpos = 0;
        self.frame.next(self.interlace());
        BeamEvent::NewFrame
    }

    // ---- registers -----------------------------------------------------------

    /// VPOSR: LOF in bit 15, V8 in bit 0. OCS PAL Agnus reports ID 0.
    #[must_use]
    pub fn read_vposr(&self) -> u16 {
        (u16::from(self.frame.lof) << 15) | ((self.vpos >> 8) & 1)
    }

    /// VHPOSR: V7-V0 in the high byte, H8-H1 in the low byte.
    #[must_use]
    pub fn read_vhposr(&self) -> u16 {
        ((self.vpos & 0xFF) << 8) | (self.hpos & 0xFF)
    }

    /// Handle a write to a register Agnus owns. Returns false if the
    /// register belongs to someone else.
    pub fn write_register(&mut self, offset: u16, value: u16) -> bool {
        match offset {
            regs::DMACON => self.dmacon = regs::set_clr(self.dmacon, value, dmacon::WRITABLE),
            regs::VPOSW => self.frame.lof = value & 0x8000 != 0,
            regs::BPLCON0 => self.bplcon0 = value,
            regs::DIWSTRT => self.diwstrt = value,
            regs::DIWSTOP => self.diwstop = value,
            regs::DDFSTRT => self.ddfstrt = value & 0x00FC,
            regs::DDFSTOP => self.ddfstop = value & 0x00FC,
            regs::BPL1MOD => self.bpl1mod = (value & 0xFFFE) as i16,
            regs::BPL2MOD => self.bpl2mod = (value & 0xFFFE) as i16,
            regs::DSKPTH => self.dsk_pt = regs::set_ptr_hi(self.dsk_pt, value),
            regs::DSKPTL => self.dsk_pt = regs::set_ptr_lo(self.dsk_pt, value),
            regs::BPL1PTH..=regs::BPL6PTL => {
                let plane = usize::from((offset - regs::BPL1PTH) / 4);
                let ptr = &mut self.bpl_pt[plane];
                *ptr = if offset & 2 == 0 {
                    regs::set_ptr_hi(*ptr, value)
                } else {
                    regs::set_ptr_lo(*ptr, value)
                };
            }
            regs::SPR0PTH..=regs::SPR7PTL => {
                let sprite = usize::from((offset - regs::SPR0PTH) / 4);
                let ptr = &mut self.spr_pt[sprite];
                *ptr = if offset & 2 == 0 {
                    regs::set_ptr_hi(*ptr, value)
                } else {
                    regs::set_ptr_lo(*ptr, value)
                };
            }
            _ => return false,
        }
        true
    }

    pub fn info(&self) -> AgnusInfo {
        AgnusInfo {
            vpos: self.vpos,
            hpos: self.hpos,
            frame: self.frame,
            dmacon: self.dmacon,
            bplcon0: self.bplcon0,
            ddfstrt: self.ddfstrt,
            ddfstop: self.ddfstop,
            diwstrt: self.diwstrt,
            diwstop: self.diwstop,
            bpl_pt: self.bpl_pt,
            bpl1mod: self.bpl1mod,
            bpl2mod: self.bpl2mod,
            spr_pt: self.spr_pt,
            dsk_pt: self.dsk_pt,
            line_owners: self.bus_owner[..usize::from(self.hpos)].to_vec(),
            usage: self.usage,
        }
    }
}

impl Default for Agnus {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Agnus {
    fn name(&self) -> &'static str {
        "agnus"
    }

    fn reset(&mut self, hard: bool) {
        if hard {
            *self = Self::new();
            return;
        }
        // The reset line leaves the beam counter and frame running.
        let (vpos, hpos, frame, usage) = (self.vpos, self.hpos, self.frame, self.usage);
        *self = Self { vpos, hpos, frame, usage, ..Self::new() };
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u16(&mut self.vpos);
        visitor.visit_u16(&mut self.hpos);
        self.frame.visit_state(visitor);
        visitor.visit_u16(&mut self.dmacon);
        visitor.visit_u16(&mut self.bplcon0);
        visitor.visit_u32_slice(&mut self.bpl_pt);
        visitor.visit_i16(&mut self.bpl1mod);
        visitor.visit_i16(&mut self.bpl2mod);
        visitor.visit_u16_slice(&mut self.bpl_dat);
        visitor.visit_u16(&mut self.ddfstrt);
        visitor.visit_u16(&mut self.ddfstop);
        visitor.visit_u16(&mut self.diwstrt);
        visitor.visit_u16(&mut self.diwstop);
        visitor.visit_u32_slice(&mut self.spr_pt);
        visitor.visit_u32(&mut self.dsk_pt);
        visitor.visit_u8(&mut self.cpu_denials);
        for slot in &mut self.bus_owner {
            let mut raw = slot.encode();
            visitor.visit_u8(&mut raw);
            match BusOwner::decode(raw) {
                Some(owner) => *slot = owner,
                None => visitor.reject("agnus bus owner"),
            }
        }
        for count in &mut self.usage {
            visitor.visit_u64(count);
        }
        // VPOSW can clear LOF on line 312, so only the long frame bounds vpos.
        if self.hpos >= PAL_CCKS_PER_LINE || self.vpos >= PAL_LONG_FRAME_LINES {
            visitor.reject("agnus beam position");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_DMA: u16 = dmacon::DMAEN
        | dmacon::BPLEN
        | dmacon::COPEN
        | dmacon::BLTEN
        | dmacon::SPREN
        | dmacon::DSKEN
        | 0x000F;

    fn agnus_at(hpos: u16, dmacon: u16) -> Agnus {
        let mut agnus = Agnus::new();
        agnus.hpos = hpos;
        agnus.vpos = 100;
        agnus.dmacon = dmacon;
        agnus
    }

    #[test]
    fn refresh_slots_are_always_taken() {
        for h in [0x01, 0x03, 0x05, 0xE2] {
            let mut agnus = agnus_at(h, 0);
            let owner = agnus.allocate_slot(BusRequests { copper: true, blitter: true, cpu: true });
            assert_eq!(owner, BusOwner::Refresh, "hpos {h:#04X}");
        }
    }

    #[test]
    fn fixed_dma_slots_follow_enable_bits() {
        assert_eq!(agnus_at(0x07, ALL_DMA).fixed_slot_owner(), Some(BusOwner::Disk));
        assert_eq!(agnus_at(0x07, dmacon::DMAEN).fixed_slot_owner(), None);
        assert_eq!(agnus_at(0x0D, ALL_DMA).fixed_slot_owner(), Some(BusOwner::Audio(0)));
        assert_eq!(agnus_at(0x13, ALL_DMA).fixed_slot_owner(), Some(BusOwner::Audio(3)));
        assert_eq!(agnus_at(0x15, ALL_DMA).fixed_slot_owner(), Some(BusOwner::Sprite(0)));
        assert_eq!(agnus_at(0x17, ALL_DMA).fixed_slot_owner(), Some(BusOwner::Sprite(0)));
        assert_eq!(agnus_at(0x33, ALL_DMA).fixed_slot_owner(), Some(BusOwner::Sprite(7)));
        assert_eq!(agnus_at(0x16, ALL_DMA).fixed_slot_owner(), None);
    }

    #[test]
    fn sprite_slots_are_free_during_vertical_blank() {
        let mut agnus = agnus_at(0x15, ALL_DMA);
        agnus.vpos = 10;
        assert_eq!(agnus.fixed_slot_owner(), None);
    }

    #[test]
    fn lowres_fetch_order_within_group() {
        let mut agnus = agnus_at(0x38, ALL_DMA);
        agnus.bplcon0 = 6 << 12;
        agnus.ddfstrt = 0x38;
        agnus.ddfstop = 0xD0;
        agnus.diwstrt = 0x2C81;
        agnus.diwstop = 0x2CC1;
        let planes: Vec<_> = (0x38..0x40)
            .map(|h| {
                agnus.hpos = h;
                agnus.bitplane_slot()
            })
            .collect();
        assert_eq!(
            planes,
            vec![None, Some(3), Some(5), Some(1), None, Some(2), Some(4), Some(0)]
        );
    }

    #[test]
    fn bitplane_dma_stops_outside_vertical_window() {
        let mut agnus = agnus_at(0x3F, ALL_DMA);
        agnus.bplcon0 = 1 << 12;
        agnus.ddfstrt = 0x38;
        agnus.ddfstop = 0xD0;
        agnus.diwstrt = 0x2C81;
        agnus.diwstop = 0x2CC1; // stop line 0x12C
        agnus.vpos = 0x2C;
        assert_eq!(agnus.bitplane_slot(), Some(0));
        agnus.vpos = 0x12C;
        assert_eq!(agnus.bitplane_slot(), None);
        agnus.vpos = 0x2B;
        assert_eq!(agnus.bitplane_slot(), None);
    }

    #[test]
    fn copper_uses_even_slots_only() {
        let mut agnus = agnus_at(0x40, dmacon::DMAEN | dmacon::COPEN);
        assert!(agnus.copper_slot_free());
        agnus.hpos = 0x41;
        assert!(!agnus.copper_slot_free());
        agnus.hpos = 0xE0;
        assert!(!agnus.copper_slot_free());
    }

    #[test]
    fn copper_outranks_blitter_and_cpu() {
        let mut agnus = agnus_at(0x40, ALL_DMA);
        let owner = agnus.allocate_slot(BusRequests { copper: true, blitter: true, cpu: true });
        assert_eq!(owner, BusOwner::Copper);
    }

    #[test]
    fn cpu_gets_slot_after_three_blitter_wins() {
        let mut agnus = agnus_at(0x41, dmacon::DMAEN | dmacon::BLTEN);
        let all = BusRequests { copper: false, blitter: true, cpu: true };
        let owners: Vec<_> = (0..8).map(|_| agnus.allocate_slot(all)).collect();
        assert_eq!(
            owners,
            vec![
                BusOwner::Blitter,
                BusOwner::Blitter,
                BusOwner::Blitter,
                BusOwner::Cpu,
                BusOwner::Blitter,
                BusOwner::Blitter,
                BusOwner::Blitter,
                BusOwner::Cpu,
            ]
        );
    }

    #[test]
    fn nasty_blitter_starves_cpu() {
        let mut agnus = agnus_at(0x41, dmacon::DMAEN | dmacon::BLTEN | dmacon::BLTPRI);
        let all = BusRequests { copper: false, blitter: true, cpu: true };
        assert!((0..10).all(|_| agnus.allocate_slot(all) == BusOwner::Blitter));
    }

    #[test]
    fn disabled_blitter_dma_leaves_slot_to_cpu() {
        let mut agnus = agnus_at(0x41, dmacon::DMAEN);
        let owner = agnus.allocate_slot(BusRequests { copper: false, blitter: true, cpu: true });
        assert_eq!(owner, BusOwner::Cpu);
    }

    #[test]
    fn beam_wraps_lines_and_frames() {
        let mut agnus = Agnus::new();
        agnus.hpos = PAL_CCKS_PER_LINE - 2;
        assert_eq!(agnus.advance_beam(), BeamEvent::None);
        assert_eq!(agnus.advance_beam(), BeamEvent::NewLine);
        assert_eq!((agnus.vpos, agnus.hpos), (1, 0));

        agnus.vpos = 311;
        agnus.hpos = PAL_CCKS_PER_LINE - 1;
        assert_eq!(agnus.advance_beam(), BeamEvent::NewFrame);
        assert_eq!(agnus.vpos, 0);
        assert_eq!(agnus.frame.nr, 1);
    }

    #[test]
    fn interlace_produces_long_frames() {
        let mut agnus = Agnus::new();
        agnus.write_register(regs::BPLCON0, 0x0004);
        agnus.vpos = 311;
        agnus.hpos = PAL_CCKS_PER_LINE - 1;
        agnus.advance_beam();
        assert!(agnus.frame.is_long_frame());
        agnus.vpos = 311;
        agnus.hpos = PAL_CCKS_PER_LINE - 1;
        assert_eq!(agnus.advance_beam(), BeamEvent::NewLine, "long frame has line 312");
        assert_eq!(agnus.vpos, 312);
        assert_eq!(agnus.read_vposr() & 0x8001, 0x8001);
    }

    #[test]
    fn bitplane_fetch_applies_modulo_in_last_group() {
        let mut agnus = agnus_at(0x3F, ALL_DMA);
        agnus.ddfstrt = 0x38;
        agnus.ddfstop = 0x40;
        agnus.bpl1mod = 4;
        agnus.bpl_pt[0] = 0x100;
        let ram = vec![0u8; 0x1000];

        agnus.fetch_bitplane(0, &ram[..]);
        assert_eq!(agnus.bpl_pt[0], 0x102, "first group has no modulo");
        agnus.hpos = 0x47;
        agnus.fetch_bitplane(0, &ram[..]);
        assert_eq!(agnus.bpl_pt[0], 0x108);
    }

    #[test]
    fn every_slot_has_exactly_one_recorded_owner() {
        let mut agnus = Agnus::new();
        agnus.dmacon = ALL_DMA;
        agnus.vpos = 50;
        for _ in 0..PAL_CCKS_PER_LINE {
            agnus.allocate_slot(BusRequests { copper: true, blitter: true, cpu: true });
            agnus.advance_beam();
        }
        let total: u64 = (0..BusOwner::KINDS).map(|k| agnus.usage[k]).sum();
        assert_eq!(total, u64::from(PAL_CCKS_PER_LINE));
    }

    #[test]
    fn pointer_registers_split_into_halves() {
        let mut agnus = Agnus::new();
        assert!(agnus.write_register(regs::BPL1PTH + 8, 0x0001));
        assert!(agnus.write_register(regs::BPL1PTH + 10, 0x8000));
        assert_eq!(agnus.bpl_pt[2], 0x0001_8000);
        assert!(agnus.write_register(regs::SPR0PTH + 4 * 7 + 2, 0x1234));
        assert_eq!(agnus.spr_pt[7], 0x1234);
        assert!(!agnus.write_register(regs::BLTSIZE, 0));
    }

    #[test]
    fn snapshot_round_trip() {
        let mut agnus = agnus_at(0x41, ALL_DMA);
        agnus.allocate_slot(BusRequests { copper: false, blitter: false, cpu: true });
        let mut writer = emu_core::SnapshotWriter::new();
        agnus.save(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), agnus.serialized_size());

        let mut copy = Agnus::new();
        copy.load(&mut emu_core::SnapshotReader::new(&bytes)).expect("load");
        assert_eq!(copy.bus_owner_at(0x41), BusOwner::Cpu);
        assert_eq!(copy.info(), agnus.info());
    }

    #[test]
    fn short_frame_on_line_312_still_loads() {
        let mut agnus = Agnus::new();
        agnus.vpos = 312;
        agnus.hpos = PAL_CCKS_PER_LINE - 1;
        agnus.frame.lof = false;
        let mut writer = emu_core::SnapshotWriter::new();
        agnus.save(&mut writer);
        let bytes = writer.into_bytes();

        let mut copy = Agnus::new();
        copy.load(&mut emu_core::SnapshotReader::new(&bytes)).expect("load");
        assert_eq!(copy.vpos, 312);
        assert_eq!(copy.advance_beam(), BeamEvent::NewFrame);
        assert_eq!((copy.vpos, copy.hpos), (0, 0));

        agnus.vpos = PAL_LONG_FRAME_LINES;
        let mut writer = emu_core::SnapshotWriter::new();
        agnus.save(&mut writer);
        let bytes = writer.into_bytes();
        assert!(Agnus::new().load(&mut emu_core::SnapshotReader::new(&bytes)).is_err());
    }
}
