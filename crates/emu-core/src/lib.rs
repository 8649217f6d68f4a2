//! Core traits and types for cycle-accurate chipset emulation.
//!
//! Everything ticks at the master crystal frequency. All component timing
//! derives from this. No exceptions.
//!
//! Components implement [`Component`] so the machine can reset, size, save
//! and load them through one flat list. State crosses threads only through
//! [`Shared`], whose [`CriticalSection`] guard is the single way in.

mod bus;
mod clock;
mod component;
mod cpu;
mod error;
mod observable;
mod snapshot;
mod sync;
mod tickable;

pub use bus::Bus;
pub use clock::{MasterClock, Ticks};
pub use component::Component;
pub use cpu::{Cpu, IdleCpu};
pub use error::{ConfigError, SnapshotError};
pub use observable::{Observable, Value};
pub use snapshot::{SizeCounter, SnapshotReader, SnapshotWriter, StateVisitor};
pub use sync::{CriticalSection, Shared};
pub use tickable::Tickable;
