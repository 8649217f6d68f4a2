//! Commodore 8364 Paula: interrupt controller.
//!
//! Paula manages the Amiga's interrupt priority system, mapping 14 interrupt
//! sources to 6 CPU interrupt levels. Audio and disk DMA are not emulated;
//! their request bits can still be set by software through INTREQ.

use emu_core::{Component, StateVisitor};
use serde::Serialize;

/// INTENA/INTREQ bit numbers.
pub mod int {
    pub const TBE: u8 = 0;
    pub const DSKBLK: u8 = 1;
    pub const SOFT: u8 = 2;
    pub const PORTS: u8 = 3;
    pub const COPER: u8 = 4;
    pub const VERTB: u8 = 5;
    pub const BLIT: u8 = 6;
    pub const AUD0: u8 = 7;
    pub const RBF: u8 = 11;
    pub const DSKSYN: u8 = 12;
    pub const EXTER: u8 = 13;
    /// INTENA master enable.
    pub const INTEN: u8 = 14;
}

const SETCLR: u16 = 0x8000;

/// Request mask for each CPU level, highest first.
const LEVELS: [(u8, u16); 6] = [
    (6, 0x2000), // EXTER (CIA-B)
    (5, 0x1800), // DSKSYN, RBF
    (4, 0x0780), // AUD3-0
    (3, 0x0070), // BLIT, VERTB, COPER
    (2, 0x0008), // PORTS (CIA-A)
    (1, 0x0007), // SOFT, DSKBLK, TBE
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterruptInfo {
    pub intena: u16,
    pub intreq: u16,
    pub ipl: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Paula8364 {
    pub intena: u16,
    pub intreq: u16,
}

impl Paula8364 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_intena(&mut self, val: u16) {
        set_clr(&mut self.intena, val);
    }

    pub fn write_intreq(&mut self, val: u16) {
        set_clr(&mut self.intreq, val);
    }

    pub fn request_interrupt(&mut self, bit: u8) {
        if bit < int::INTEN {
            self.intreq |= 1 << bit;
        } else {
            log::warn!("paula: ignoring request for interrupt bit {bit}");
        }
    }

    /// CPU interrupt priority level (0 = none).
    #[must_use]
    pub fn compute_ipl(&self) -> u8 {
        if self.intena & (1 << int::INTEN) == 0 {
            return 0;
        }
        let active = self.intena & self.intreq & 0x3FFF;
        LEVELS
            .iter()
            .find(|&&(_, mask)| active & mask != 0)
            .map_or(0, |&(level, _)| level)
    }

    #[must_use]
    pub fn info(&self) -> InterruptInfo {
        InterruptInfo { intena: self.intena, intreq: self.intreq, ipl: self.compute_ipl() }
    }
}

fn set_clr(reg: &mut u16, val: u16) {
    if val & SETCLR != 0 {
        *reg |= val & 0x7FFF;
    } else {
        *reg &= !(val & 0x7FFF);
    }
}

impl Component for Paula8364 {
    fn name(&self) -> &'static str {
        "paula"
    }

    fn reset(&mut self, _hard: bool) {
        *self = Self::new();
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u16(&mut self.intena);
        visitor.visit_u16(&mut self.intreq);
        if (self.intena | self.intreq) & SETCLR != 0 {
            visitor.reject("paula interrupt registers");
        }
    }
}
