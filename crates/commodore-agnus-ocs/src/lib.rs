//! Commodore Agnus OCS: beam counter, DMA slot arbitration, copper, and
//! blitter.
//!
//! Agnus is the master DMA controller in the Original Chip Set. It owns the
//! chip bus during DMA slots, generates the beam position counters, and
//! contains the copper and blitter sub-units. The machine crate drives one
//! colour clock at a time: resolve the slot owner with [`Agnus::allocate_slot`],
//! run that owner's callback, then [`Agnus::advance_beam`].

mod agnus;
mod blitter;
mod chip_memory;
mod copper;
mod frame;
pub mod regs;

pub use agnus::{
    Agnus, AgnusInfo, BeamEvent, BusOwner, BusRequests, HIRES_DDF_TO_PLANE, LOWRES_DDF_TO_PLANE,
    PAL_CCKS_PER_LINE, VBLANK_END_LINE,
};
pub use blitter::{
    BlitProgress, Blitter, BlitterAccuracy, BlitterConfig, BlitterInfo, barrel_shift, minterm,
};
pub use chip_memory::ChipMemory;
pub use copper::{Copper, CopperInfo, Move as CopperMove, State as CopperState};
pub use frame::{Frame, PAL_LONG_FRAME_LINES, PAL_SHORT_FRAME_LINES};
