//! Custom chip register offsets from $DFF000.

pub const BLTDDAT: u16 = 0x000;
pub const DMACONR: u16 = 0x002;
pub const VPOSR: u16 = 0x004;
pub const VHPOSR: u16 = 0x006;
pub const INTENAR: u16 = 0x01C;
pub const INTREQR: u16 = 0x01E;
pub const DSKPTH: u16 = 0x020;
pub const DSKPTL: u16 = 0x022;
pub const VPOSW: u16 = 0x02A;
pub const VHPOSW: u16 = 0x02C;
pub const COPCON: u16 = 0x02E;

pub const BLTCON0: u16 = 0x040;
pub const BLTCON1: u16 = 0x042;
pub const BLTAFWM: u16 = 0x044;
pub const BLTALWM: u16 = 0x046;
pub const BLTCPTH: u16 = 0x048;
pub const BLTCPTL: u16 = 0x04A;
pub const BLTBPTH: u16 = 0x04C;
pub const BLTBPTL: u16 = 0x04E;
pub const BLTAPTH: u16 = 0x050;
pub const BLTAPTL: u16 = 0x052;
pub const BLTDPTH: u16 = 0x054;
pub const BLTDPTL: u16 = 0x056;
pub const BLTSIZE: u16 = 0x058;
pub const BLTCMOD: u16 = 0x060;
pub const BLTBMOD: u16 = 0x062;
pub const BLTAMOD: u16 = 0x064;
pub const BLTDMOD: u16 = 0x066;
pub const BLTCDAT: u16 = 0x070;
pub const BLTBDAT: u16 = 0x072;
pub const BLTADAT: u16 = 0x074;

pub const COP1LCH: u16 = 0x080;
pub const COP1LCL: u16 = 0x082;
pub const COP2LCH: u16 = 0x084;
pub const COP2LCL: u16 = 0x086;
pub const COPJMP1: u16 = 0x088;
pub const COPJMP2: u16 = 0x08A;

pub const DIWSTRT: u16 = 0x08E;
pub const DIWSTOP: u16 = 0x090;
pub const DDFSTRT: u16 = 0x092;
pub const DDFSTOP: u16 = 0x094;
pub const DMACON: u16 = 0x096;
pub const INTENA: u16 = 0x09A;
pub const INTREQ: u16 = 0x09C;

/// BPL1PTH; plane `n` high/low words sit at `+ 4n` / `+ 4n + 2`.
pub const BPL1PTH: u16 = 0x0E0;
pub const BPL6PTL: u16 = 0x0F6;
pub const BPLCON0: u16 = 0x100;
pub const BPL1MOD: u16 = 0x108;
pub const BPL2MOD: u16 = 0x10A;
/// SPR0PTH; sprite `n` high/low words sit at `+ 4n` / `+ 4n + 2`.
pub const SPR0PTH: u16 = 0x120;
pub const SPR7PTL: u16 = 0x13E;

/// DMACON bits.
pub mod dmacon {
    pub const SETCLR: u16 = 0x8000;
    pub const BBUSY: u16 = 0x4000;
    pub const BZERO: u16 = 0x2000;
    pub const BLTPRI: u16 = 0x0400;
    pub const DMAEN: u16 = 0x0200;
    pub const BPLEN: u16 = 0x0100;
    pub const COPEN: u16 = 0x0080;
    pub const BLTEN: u16 = 0x0040;
    pub const SPREN: u16 = 0x0020;
    pub const DSKEN: u16 = 0x0010;
    pub const AUD0EN: u16 = 0x0001;
    /// Bits software can write.
    pub const WRITABLE: u16 = 0x07FF;
}

/// Apply a SET/CLR style write (bit 15 selects set or clear) to `reg`.
#[must_use]
pub fn set_clr(reg: u16, value: u16, writable: u16) -> u16 {
    if value & 0x8000 != 0 {
        reg | (value & writable)
    } else {
        reg & !(value & writable)
    }
}

/// Replace the high word of a chip pointer. OCS Agnus drives 19 address
/// lines; the mask keeps 512 KB .. 2 MB chip RAM reachable.
#[must_use]
pub fn set_ptr_hi(ptr: u32, value: u16) -> u32 {
    (ptr & 0x0000_FFFF) | ((u32::from(value) & 0x001F) << 16)
}

/// Replace the low word of a chip pointer. Pointers are word aligned.
#[must_use]
pub fn set_ptr_lo(ptr: u32, value: u16) -> u32 {
    (ptr & 0xFFFF_0000) | u32::from(value & 0xFFFE)
}
