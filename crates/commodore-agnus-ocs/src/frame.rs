//! Frame counter and the long/short frame flip-flop.

use emu_core::StateVisitor;
use serde::{Deserialize, Serialize};

/// Lines in a short PAL frame.
pub const PAL_SHORT_FRAME_LINES: u16 = 312;
/// Lines in a long PAL frame.
pub const PAL_LONG_FRAME_LINES: u16 = 313;

/// One video frame as seen by the beam counter.
///
/// `lof` is the long frame flip-flop. It only toggles while interlace is
/// enabled, so a non-interlaced display keeps whatever length it had.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Frames completed since power-on.
    pub nr: u64,
    pub lof: bool,
    /// `lof` of the previous frame.
    pub prev_lof: bool,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once at each vertical retrace.
    pub fn next(&mut self, interlace: bool) {
        self.nr += 1;
        self.prev_lof = self.lof;
        if interlace {
            self.lof = !self.lof;
        }
    }

    #[must_use]
    pub fn is_long_frame(&self) -> bool {
        self.lof
    }

    #[must_use]
    pub fn was_long_frame(&self) -> bool {
        self.prev_lof
    }

    #[must_use]
    pub fn num_lines(&self) -> u16 {
        if self.lof { PAL_LONG_FRAME_LINES } else { PAL_SHORT_FRAME_LINES }
    }

    pub fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u64(&mut self.nr);
        visitor.visit_bool(&mut self.lof);
        visitor.visit_bool(&mut self.prev_lof);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;

    #[test]
    fn interlace_alternates_frame_length() {
        let mut frame = Frame::new();
        assert_eq!(frame.num_lines(), 312);
        frame.next(true);
        assert!(frame.is_long_frame());
        assert!(!frame.was_long_frame());
        assert_eq!(frame.num_lines(), 313);
        frame.next(true);
        assert_eq!(frame.num_lines(), 312);
        assert!(frame.was_long_frame());
        assert_eq!(frame.nr, 2);
    }

    #[test]
    fn progressive_frames_keep_length() {
        let mut frame = Frame { lof: true, ..Frame::default() };
        for _ in 0..5 {
            frame.next(false);
            assert_eq!(frame.num_lines(), 313);
        }
    }

    quickcheck! {
        fn line_count_follows_lof(toggles: Vec<bool>) -> bool {
            let mut frame = Frame::new();
            toggles.into_iter().all(|lace| {
                frame.next(lace);
                let expected = if frame.is_long_frame() { 313 } else { 312 };
                frame.num_lines() == expected
            })
        }
    }
}
