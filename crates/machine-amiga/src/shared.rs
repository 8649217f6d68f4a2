//! A machine shared between the emulation thread and a host thread.
//!
//! Every method takes the lock for exactly the duration of the call, so a
//! host never sees a burst of cycles half applied.

use emu_core::{CriticalSection, Cpu, IdleCpu, Shared};

use crate::{Amiga, AmigaError, AmigaInfo, ConfigOption};

#[derive(Debug)]
pub struct AmigaHandle<C: Cpu = IdleCpu> {
    shared: Shared<Amiga<C>>,
}

impl<C: Cpu> Clone for AmigaHandle<C> {
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<C: Cpu> AmigaHandle<C> {
    pub fn new(amiga: Amiga<C>) -> Self {
        Self { shared: Shared::new(amiga) }
    }

    /// Hold the machine across several calls.
    pub fn lock(&self) -> CriticalSection<'_, Amiga<C>> {
        self.shared.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Amiga<C>) -> R) -> R {
        self.shared.with(f)
    }

    pub fn inspect<R>(&self, f: impl FnOnce(&Amiga<C>) -> R) -> R {
        let section = self.shared.lock();
        let amiga: &Amiga<C> = &section;
        f(amiga)
    }

    /// Run `cycles` colour clocks as one atomic burst.
    pub fn run_cycles(&self, cycles: u64) {
        self.shared.with(|amiga| amiga.run_cycles(cycles));
    }

    pub fn reset(&self, hard: bool) {
        self.shared.with(|amiga| amiga.reset(hard));
    }

    pub fn configure(&self, option: ConfigOption, value: i64) -> Result<bool, AmigaError> {
        self.shared.with(|amiga| amiga.configure(option, value))
    }

    #[must_use]
    pub fn peek(&self, addr: u32) -> u8 {
        self.inspect(|amiga| amiga.peek(addr))
    }

    pub fn poke(&self, addr: u32, value: u8) {
        self.shared.with(|amiga| amiga.poke(addr, value));
    }

    #[must_use]
    pub fn info(&self) -> AmigaInfo {
        self.inspect(Amiga::info)
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<u8> {
        self.shared.with(Amiga::snapshot)
    }
}

impl<C: Cpu + Clone> AmigaHandle<C> {
    pub fn load_snapshot(&self, data: &[u8]) -> Result<usize, AmigaError> {
        self.shared.with(|amiga| amiga.load_snapshot(data))
    }
}
