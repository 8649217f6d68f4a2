//! Blitter DMA against the CPU on the shared chip bus.

use emu_core::{Bus, Component, Cpu, StateVisitor};
use machine_amiga::commodore_agnus_ocs::regs::{self, dmacon};
use machine_amiga::commodore_agnus_ocs::BusOwner;
use machine_amiga::commodore_paula_8364::int;
use machine_amiga::{Amiga, AmigaConfig};

/// A CPU that always wants chip RAM and counts the clocks it was given.
#[derive(Debug, Clone, Default)]
struct CountingCpu {
    clocks: u64,
}

impl Component for CountingCpu {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn reset(&mut self, _hard: bool) {
        self.clocks = 0;
    }

    fn visit_state(&mut self, visitor: &mut dyn StateVisitor) {
        visitor.visit_u64(&mut self.clocks);
    }
}

impl Cpu for CountingCpu {
    fn tick<B: Bus>(&mut self, _bus: &mut B) {
        self.clocks += 1;
    }

    fn pc(&self) -> u32 {
        0
    }

    fn set_ipl(&mut self, _level: u8) {}

    fn wants_bus(&self) -> bool {
        true
    }
}

fn start_fill(amiga: &mut Amiga<impl Cpu>, dest: u32, width: u16, height: u16) {
    amiga.bus.write_custom(regs::BLTCON0, 0x01FF); // D only, minterm all ones
    amiga.bus.write_custom(regs::BLTCON1, 0);
    amiga.bus.write_custom(regs::BLTDPTH, (dest >> 16) as u16);
    amiga.bus.write_custom(regs::BLTDPTL, dest as u16);
    amiga.bus.write_custom(regs::BLTDMOD, 0);
    amiga.bus.write_custom(regs::BLTSIZE, (height << 6) | width);
}

#[test]
fn stepped_blit_writes_memory_and_raises_blit() {
    let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
    amiga
        .bus
        .write_custom(regs::DMACON, dmacon::SETCLR | dmacon::DMAEN | dmacon::BLTEN);
    start_fill(&mut amiga, 0x1000, 2, 2);
    assert!(amiga.bus.blitter.busy);
    assert_eq!(amiga.bus.read_custom(regs::DMACONR) & dmacon::BBUSY, dmacon::BBUSY);

    let mut ccks = 0;
    while amiga.bus.blitter.busy {
        amiga.advance_one_cycle();
        ccks += 1;
        assert!(ccks < 100, "blit never finished");
    }
    assert_eq!(amiga.bus.agnus.usage(BusOwner::Blitter), 4);
    assert!(amiga.bus.memory.chip_ram[0x1000..0x1008].iter().all(|&b| b == 0xFF));
    assert_eq!(amiga.bus.memory.chip_ram[0x1008], 0);
    assert_ne!(amiga.bus.paula.intreq & (1 << int::BLIT), 0);
    assert_eq!(amiga.bus.read_custom(regs::DMACONR) & dmacon::BBUSY, 0);
}

#[test]
fn blit_without_blitter_dma_stalls() {
    let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
    start_fill(&mut amiga, 0x1000, 1, 1);
    amiga.run_cycles(500);
    assert!(amiga.bus.blitter.busy);
    assert_eq!(amiga.bus.memory.chip_ram[0x1000], 0);
    assert_eq!(amiga.bus.agnus.usage(BusOwner::Blitter), 0);
}

fn cpu_clocks_during_blit(dmacon_bits: u16) -> u64 {
    let mut amiga =
        Amiga::with_cpu(CountingCpu::default(), AmigaConfig::default()).expect("machine");
    amiga.bus.write_custom(regs::DMACON, dmacon::SETCLR | dmacon_bits);
    start_fill(&mut amiga, 0x4000, 64, 16);
    amiga.run_cycles(200);
    assert!(amiga.bus.blitter.busy, "blit should outlast the window");
    amiga.cpu.clocks
}

#[test]
fn cpu_gets_every_fourth_slot_while_blitter_is_polite() {
    // 200 slots, three of them refresh; the rest go blitter, blitter,
    // blitter, CPU.
    let clocks = cpu_clocks_during_blit(dmacon::DMAEN | dmacon::BLTEN);
    assert_eq!(clocks, 49 * 2);
}

#[test]
fn nasty_blitter_starves_the_cpu() {
    let clocks = cpu_clocks_during_blit(dmacon::DMAEN | dmacon::BLTEN | dmacon::BLTPRI);
    assert_eq!(clocks, 0);
}

#[test]
fn cpu_runs_freely_without_a_blit() {
    let mut amiga =
        Amiga::with_cpu(CountingCpu::default(), AmigaConfig::default()).expect("machine");
    amiga.run_cycles(10);
    // Refresh owns slots 1, 3 and 5.
    assert_eq!(amiga.cpu.clocks, 7 * 2);
}
