//! Whole-machine properties: determinism and frame timing.

use machine_amiga::commodore_agnus_ocs::regs::{self, dmacon};
use machine_amiga::commodore_agnus_ocs::{
    PAL_CCKS_PER_LINE, PAL_LONG_FRAME_LINES, PAL_SHORT_FRAME_LINES,
};
use machine_amiga::{Amiga, AmigaConfig};
use quickcheck::quickcheck;

/// Custom registers the generated programs poke.
const TARGETS: [u16; 6] = [
    regs::DMACON,
    regs::INTENA,
    regs::INTREQ,
    regs::BLTCON0,
    regs::BLTDPTL,
    regs::BLTSIZE,
];

fn run_program(program: &[(u8, u16, u8)]) -> Vec<u8> {
    let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
    amiga.bus.write_custom(regs::DMACON, dmacon::SETCLR | dmacon::DMAEN);
    for &(target, value, cycles) in program.iter().take(32) {
        let reg = TARGETS[usize::from(target) % TARGETS.len()];
        // Keep blits small so a case finishes quickly.
        let value = if reg == regs::BLTSIZE { (1 << 6) | (value & 0x7).max(1) } else { value };
        amiga.bus.write_custom(reg, value);
        amiga.run_cycles(u64::from(cycles) * 4);
    }
    amiga.snapshot()
}

quickcheck! {
    fn identical_programs_end_in_identical_states(program: Vec<(u8, u16, u8)>) -> bool {
        run_program(&program) == run_program(&program)
    }

    fn beam_position_is_cycles_mod_line(cycles: u16) -> bool {
        let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
        let cycles = u64::from(cycles);
        amiga.run_cycles(cycles);
        let line = u64::from(PAL_CCKS_PER_LINE);
        u64::from(amiga.bus.agnus.hpos) == cycles % line
            && u64::from(amiga.bus.agnus.vpos) == cycles / line
    }

    fn snapshots_load_at_any_beam_position(cycles: u32, long: bool, flip: bool) -> bool {
        let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
        amiga.bus.write_custom(regs::VPOSW, if long { 0x8000 } else { 0 });
        let span = u32::from(PAL_CCKS_PER_LINE) * u32::from(PAL_LONG_FRAME_LINES) + 500;
        amiga.run_cycles(u64::from(cycles % span));
        if flip {
            // Change the frame length under the beam, wherever it is.
            amiga.bus.write_custom(regs::VPOSW, if long { 0 } else { 0x8000 });
            amiga.advance_one_cycle();
        }

        let data = amiga.snapshot();
        let mut restored = Amiga::new(AmigaConfig::default()).expect("machine");
        if restored.load_snapshot(&data) != Ok(data.len()) {
            return false;
        }
        amiga.run_cycles(300);
        restored.run_cycles(300);
        restored.snapshot() == amiga.snapshot()
    }
}

fn frame_lengths(amiga: &mut Amiga, frames: usize) -> Vec<u16> {
    (0..frames)
        .map(|_| {
            let lines = amiga.bus.agnus.frame.num_lines();
            amiga.run_frame();
            lines
        })
        .collect()
}

#[test]
fn interlace_alternates_long_and_short_frames() {
    let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
    amiga.bus.write_custom(regs::BPLCON0, 0x0004);
    let lengths = frame_lengths(&mut amiga, 100);
    for pair in lengths.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    assert_eq!(lengths[0], PAL_SHORT_FRAME_LINES);
    assert_eq!(lengths[1], PAL_LONG_FRAME_LINES);
    let ccks = u64::from(PAL_CCKS_PER_LINE) * (50 * 312 + 50 * 313);
    assert_eq!(amiga.master_clock().get(), ccks * 8);
}

#[test]
fn progressive_frames_keep_their_length() {
    let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
    let lengths = frame_lengths(&mut amiga, 100);
    assert!(lengths.iter().all(|&lines| lines == PAL_SHORT_FRAME_LINES));
    assert_eq!(amiga.bus.agnus.frame.nr, 100);

    // Software can force a long frame through VPOSW; it then sticks.
    amiga.bus.write_custom(regs::VPOSW, 0x8000);
    assert_eq!(frame_lengths(&mut amiga, 3), vec![PAL_LONG_FRAME_LINES; 3]);
}
