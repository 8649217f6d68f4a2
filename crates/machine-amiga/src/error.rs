//! Errors surfaced by the machine.

use emu_core::{ConfigError, SnapshotError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmigaError {
    #[error("Kickstart image must be 256 KB or 512 KB, got {0} bytes")]
    RomSize(usize),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A bus cycle nothing answered.
///
/// The bus still completes the cycle (reads float high, writes vanish) so a
/// host stepping into unimplemented address space stays in control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum BusError {
    #[error("unmapped access at ${address:06X} (write: {write})")]
    Unmapped { address: u32, write: bool },
}
