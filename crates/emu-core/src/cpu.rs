//! CPU interface consumed by the chipset.

use crate::{Bus, Component, StateVisitor};

/// A CPU core driven by the machine.
///
/// The machine calls [`Cpu::tick`] once per CPU clock on which the chip bus
/// was granted to the CPU. The interrupt priority level is pushed in before
/// each tick; the CPU samples it at instruction boundaries.
pub trait Cpu: Component {
    /// Advance by one CPU clock.
    fn tick<B: Bus>(&mut self, bus: &mut B);

    /// Returns the current program counter.
    fn pc(&self) -> u32;

    /// Drive the IPL inputs (0 = no interrupt, 1..=7).
    fn set_ipl(&mut self, level: u8);

    /// Whether the CPU wants the chip bus on the next cycle. A CPU running
    /// out of ROM or Fast RAM returns false and leaves the slot free.
    fn wants_bus(&self) -> bool {
        true
    }
}

/// A CPU that never executes anything.
///
/// Lets the chipset run on its own in tests and when a host steps only
/// the custom chips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdleCpu {
    ipl: u8,
    clocks: u64,
}

impl IdleCpu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ipl(&self) -> u8 {
        self.ipl
    }

    #[must_use]
    pub fn clocks(&self) -> u64 {
        self.clocks
    }
}

impl Component for IdleCpu {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn reset(&mut self, _hard: bool) {
        *self = Self::default();
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u8(&mut self.ipl);
        visitor.visit_u64(&mut self.clocks);
    }
}

impl Cpu for IdleCpu {
    fn tick<B: Bus>(&mut self, _bus: &mut B) {
        self.clocks += 1;
    }

    fn pc(&self) -> u32 {
        0
    }

    fn set_ipl(&mut self, level: u8) {
        self.ipl = level & 7;
    }

    fn wants_bus(&self) -> bool {
        false
    }
}
