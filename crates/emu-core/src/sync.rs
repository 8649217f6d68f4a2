//! Scoped critical sections around state shared with a host thread.
//!
//! The emulation thread and a host UI thread both reach the same machine.
//! Every access goes through [`Shared::lock`]; the returned guard releases
//! the lock on every exit path, including early returns and panics.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// A value owned jointly by several threads.
#[derive(Debug, Default)]
pub struct Shared<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// Exclusive access to a [`Shared`] value for the lifetime of the guard.
#[derive(Debug)]
pub struct CriticalSection<'a, T> {
    guard: MutexGuard<'a, T>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self { inner: Arc::new(Mutex::new(value)) }
    }

    /// Block until the lock is free and enter the critical section.
    ///
    /// A holder that panicked leaves the value in whatever state it reached;
    /// the lock is recovered rather than propagated so the host stays
    /// responsive.
    pub fn lock(&self) -> CriticalSection<'_, T> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("recovering lock poisoned by a panicking holder");
            poisoned.into_inner()
        });
        CriticalSection { guard }
    }

    /// Enter the critical section only if nobody else holds it.
    pub fn try_lock(&self) -> Option<CriticalSection<'_, T>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(CriticalSection { guard }),
            Err(TryLockError::Poisoned(poisoned)) => {
                log::warn!("recovering lock poisoned by a panicking holder");
                Some(CriticalSection { guard: poisoned.into_inner() })
            }
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Run `f` inside one critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut section = self.lock();
        f(&mut section)
    }

    /// Number of live handles to this value.
    #[must_use]
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T> Deref for CriticalSection<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for CriticalSection<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn guard_releases_on_scope_exit() {
        let shared = Shared::new(0u32);
        {
            let mut section = shared.lock();
            *section += 1;
            assert!(shared.try_lock().is_none(), "held lock must block others");
        }
        assert_eq!(*shared.try_lock().expect("lock released"), 1);
    }

    #[test]
    fn increments_from_many_threads_are_not_lost() {
        let shared = Shared::new(0u64);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        shared.with(|n| *n += 1);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("worker");
        }
        assert_eq!(*shared.lock(), 4000);
        assert_eq!(shared.handles(), 1);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let shared = Shared::new(5u8);
        let clone = shared.clone();
        let _ = thread::spawn(move || {
            let _section = clone.lock();
            panic!("holder dies");
        })
        .join();
        assert_eq!(*shared.lock(), 5);
    }
}
