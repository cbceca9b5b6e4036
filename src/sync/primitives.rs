//! Critical-section cell underlying the shared driver wrapper.

use core::cell::RefCell;
use critical_section::Mutex;

/// Interior mutability guarded by a critical section.
///
/// Wraps a value in `critical_section::Mutex<RefCell<T>>` so the same
/// instance can be mutated from thread context and from interrupt
/// handlers; every access runs inside a closure with the critical
/// section held.
pub struct CriticalSectionCell<T> {
    slot: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Wrap a value. Const, so cells can back a `static`.
    pub const fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access to the value, critical section held
    /// throughout.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.slot.borrow_ref_mut(cs)))
    }

    /// Like [`Self::with`], but yields `None` instead of panicking when
    /// the value is already borrowed (a re-entrant call from the same
    /// context).
    #[inline]
    pub fn try_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| {
            let mut value = self.slot.borrow(cs).try_borrow_mut().ok()?;
            Some(f(&mut value))
        })
    }
}

// SAFETY: the inner value is only ever reached through a critical
// section, which serializes access.
unsafe impl<T> Sync for CriticalSectionCell<T> {}
