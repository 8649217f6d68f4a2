//! Inspection views for debuggers.

use commodore_agnus_ocs::{AgnusInfo, BlitterInfo, CopperInfo};
use commodore_buster::ZorroInfo;
use commodore_paula_8364::InterruptInfo;
use emu_core::{Cpu, Observable, Value};
use mos_cia_8520::{Cia8520, CiaInfo};
use peripheral_amiga_rtc::RtcInfo;
use serde::Serialize;

use crate::{Amiga, BusError};

/// Everything a debugger view shows, gathered in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmigaInfo {
    pub master_clock: u64,
    pub cpu_pc: u32,
    pub overlay: bool,
    pub agnus: AgnusInfo,
    pub copper: CopperInfo,
    pub blitter: BlitterInfo,
    pub interrupts: InterruptInfo,
    pub cia_a: CiaInfo,
    pub cia_b: CiaInfo,
    pub zorro: ZorroInfo,
    pub rtc: RtcInfo,
    pub last_unmapped: Option<BusError>,
    pub unmapped_accesses: u64,
}

impl AmigaInfo {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl<C: Cpu> Amiga<C> {
    #[must_use]
    pub fn info(&self) -> AmigaInfo {
        let bus = &self.bus;
        AmigaInfo {
            master_clock: bus.master_clock,
            cpu_pc: self.cpu.pc(),
            overlay: bus.memory.overlay,
            agnus: bus.agnus.info(),
            copper: bus.copper.info(),
            blitter: bus.blitter.info(),
            interrupts: bus.paula.info(),
            cia_a: bus.cia_a.info(),
            cia_b: bus.cia_b.info(),
            zorro: bus.zorro.info(),
            rtc: bus.rtc.info(bus.uptime()),
            last_unmapped: bus.last_unmapped(),
            unmapped_accesses: bus.unmapped_accesses(),
        }
    }
}

const PATHS: &[&str] = &[
    "master_clock",
    "cpu.pc",
    "agnus.vpos",
    "agnus.hpos",
    "agnus.dmacon",
    "agnus.bplcon0",
    "agnus.frame",
    "agnus.lof",
    "agnus.lines",
    "copper.state",
    "copper.pc",
    "copper.cop1lc",
    "copper.cop2lc",
    "copper.list",
    "copper.cdang",
    "blitter.busy",
    "blitter.zero",
    "blitter.remaining",
    "blitter.accuracy",
    "paula.intena",
    "paula.intreq",
    "paula.ipl",
    "cia_a.pra",
    "cia_a.prb",
    "cia_a.timer_a",
    "cia_a.timer_b",
    "cia_a.icr",
    "cia_a.imr",
    "cia_a.tod",
    "cia_a.alarm",
    "cia_a.irq",
    "cia_b.pra",
    "cia_b.prb",
    "cia_b.timer_a",
    "cia_b.timer_b",
    "cia_b.icr",
    "cia_b.imr",
    "cia_b.tod",
    "cia_b.alarm",
    "cia_b.irq",
    "zorro.state",
    "zorro.base",
    "rtc.time",
    "memory.overlay",
    "bus.unmapped",
];

fn query_cia(cia: &Cia8520, field: &str) -> Option<Value> {
    Some(match field {
        "pra" => cia.port_a_output().into(),
        "prb" => cia.port_b_output().into(),
        "timer_a" => cia.timer_a().into(),
        "timer_b" => cia.timer_b().into(),
        "icr" => cia.icr_status().into(),
        "imr" => cia.icr_mask().into(),
        "tod" => cia.tod_counter().into(),
        "alarm" => cia.tod_alarm().into(),
        "irq" => cia.irq_active().into(),
        _ => return None,
    })
}

impl<C: Cpu> Observable for Amiga<C> {
    fn query(&self, path: &str) -> Option<Value> {
        let bus = &self.bus;
        if path == "master_clock" {
            Some(bus.master_clock.into())
        } else if path == "cpu.pc" {
            Some(self.cpu.pc().into())
        } else if let Some(rest) = path.strip_prefix("agnus.") {
            let agnus = &bus.agnus;
            match rest {
                "vpos" => Some(agnus.vpos.into()),
                "hpos" => Some(agnus.hpos.into()),
                "dmacon" => Some(agnus.dmacon.into()),
                "bplcon0" => Some(agnus.info().bplcon0.into()),
                "frame" => Some(agnus.frame.nr.into()),
                "lof" => Some(agnus.frame.lof.into()),
                "lines" => Some(agnus.frame.num_lines().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("copper.") {
            let copper = &bus.copper;
            match rest {
                "state" => Some(format!("{:?}", copper.state).into()),
                "pc" => Some(copper.pc.into()),
                "cop1lc" => Some(copper.cop1lc.into()),
                "cop2lc" => Some(copper.cop2lc.into()),
                "list" => Some(copper.active_list.into()),
                "cdang" => Some(copper.cdang.into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("blitter.") {
            let blitter = &bus.blitter;
            match rest {
                "busy" => Some(blitter.busy.into()),
                "zero" => Some(blitter.zero.into()),
                "remaining" => Some(blitter.words_remaining().into()),
                "accuracy" => Some(format!("{:?}", blitter.accuracy).into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("paula.") {
            match rest {
                "intena" => Some(bus.paula.intena.into()),
                "intreq" => Some(bus.paula.intreq.into()),
                "ipl" => Some(bus.paula.compute_ipl().into()),
                _ => None,
            }
        } else if let Some(rest) = path.strip_prefix("cia_a.") {
            query_cia(&bus.cia_a, rest)
        } else if let Some(rest) = path.strip_prefix("cia_b.") {
            query_cia(&bus.cia_b, rest)
        } else if let Some(rest) = path.strip_prefix("zorro.") {
            match rest {
                "state" => Some(bus.zorro.fast_ram_config_state().into()),
                "base" => Some(bus.zorro.base().into()),
                _ => None,
            }
        } else {
            match path {
                "rtc.time" => Some(bus.rtc.time(bus.uptime()).into()),
                "memory.overlay" => Some(bus.memory.overlay.into()),
                "bus.unmapped" => Some(bus.unmapped_accesses().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AmigaConfig;

    #[test]
    fn every_listed_path_answers() {
        let amiga = Amiga::new(AmigaConfig::default()).expect("machine");
        for path in PATHS {
            assert!(amiga.query(path).is_some(), "{path} did not answer");
        }
        assert_eq!(amiga.query("agnus.lines"), Some(Value::U16(312)));
        assert_eq!(amiga.query("copper.state"), Some(Value::String("Idle".into())));
        assert_eq!(amiga.query("denise.palette.0"), None);
    }

    #[test]
    fn info_serializes_to_json() {
        let mut amiga = Amiga::new(AmigaConfig::default()).expect("machine");
        amiga.run_cycles(10);
        let info = amiga.info();
        assert_eq!(info.agnus.hpos, 10);
        let json = info.to_json().expect("json");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed["agnus"]["hpos"], 10);
        assert_eq!(parsed["cia_a"]["label"], "cia_a");
        assert!(parsed["last_unmapped"].is_null());
    }
}
