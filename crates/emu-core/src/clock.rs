//! Master clock and the tick count that measures everything against it.

/// A count of master clock ticks.
///
/// All timing is expressed in ticks of the master crystal oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

/// Master crystal of a system.
///
/// Components may run at divided rates, but everything derives from this
/// frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Crystal frequency in Hz (e.g. `28_375_160` for a PAL Amiga).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Whole seconds elapsed after `ticks` crystal ticks.
    #[must_use]
    pub const fn whole_seconds(&self, ticks: Ticks) -> u64 {
        if self.frequency_hz == 0 {
            0
        } else {
            ticks.0 / self.frequency_hz
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    quickcheck! {
        fn whole_seconds_never_runs_backwards(a: u64, b: u64, hz: u32) -> bool {
            let clock = MasterClock::new(u64::from(hz));
            let (lo, hi) = (a.min(b), a.max(b));
            clock.whole_seconds(Ticks::new(lo)) <= clock.whole_seconds(Ticks::new(hi))
        }
    }

    #[test]
    fn whole_seconds_truncates() {
        let clock = MasterClock::new(1_000);
        assert_eq!(clock.whole_seconds(Ticks::new(999)), 0);
        assert_eq!(clock.whole_seconds(Ticks::new(2_500)), 2);
    }

    #[test]
    fn tick_subtraction_saturates() {
        assert_eq!(Ticks::new(3) - Ticks::new(5), Ticks::ZERO);
        let mut t = Ticks::new(1);
        t += Ticks::new(2);
        assert_eq!(t.get(), 3);
    }
}
