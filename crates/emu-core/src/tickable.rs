//! Trait for components advanced by master clock ticks.

use crate::Ticks;

/// A component advanced by crystal ticks.
///
/// Components track their own phase relative to the master clock and only
/// do work on the ticks that matter to them (a colour clock every 8 ticks,
/// a CIA E-clock every 40).
pub trait Tickable {
    /// Advance by one master clock tick.
    fn tick(&mut self);

    /// Advance by several ticks. Overrides must match repeated `tick()`
    /// calls exactly.
    fn tick_n(&mut self, count: Ticks) {
        for _ in 0..count.get() {
            self.tick();
        }
    }
}
