//! Completion event signalling between the ISR and the driver.
//!
//! In interrupt completion mode the platform's completion ISR calls
//! [`RingEvents::notify`] for the ring that raised the interrupt, and
//! the driver's completion wait consumes the flag with
//! [`RingEvents::take`]. The flags are plain atomics so the structure
//! can live in a `static` and be touched from interrupt context without
//! a critical section.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::constants::NUM_RINGS;

/// One completion event flag per ring.
pub struct RingEvents {
    flags: [AtomicBool; NUM_RINGS],
}

impl RingEvents {
    /// All flags clear.
    #[allow(clippy::new_without_default)]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: [const { AtomicBool::new(false) }; NUM_RINGS],
        }
    }

    /// Signal a completion event for `ring`. ISR-safe.
    #[inline]
    pub fn notify(&self, ring: usize) {
        self.flags[ring].store(true, Ordering::Release);
    }

    /// Consume a pending event for `ring`, returning whether one was
    /// pending. Events coalesce; one `take` covers any number of
    /// notifications since the last one.
    #[inline]
    #[must_use]
    pub fn take(&self, ring: usize) -> bool {
        self.flags[ring].swap(false, Ordering::Acquire)
    }

    /// Whether an event is pending without consuming it.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, ring: usize) -> bool {
        self.flags[ring].load(Ordering::Acquire)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_consumes_event() {
        let events = RingEvents::new();
        assert!(!events.take(0));

        events.notify(0);
        assert!(events.is_pending(0));
        assert!(events.take(0));
        assert!(!events.take(0));
    }

    #[test]
    fn rings_are_independent() {
        let events = RingEvents::new();
        events.notify(2);
        assert!(!events.take(0));
        assert!(!events.take(1));
        assert!(events.take(2));
        assert!(!events.take(3));
    }

    #[test]
    fn notifications_coalesce() {
        let events = RingEvents::new();
        events.notify(1);
        events.notify(1);
        assert!(events.take(1));
        assert!(!events.take(1));
    }

    #[test]
    fn works_in_a_static() {
        static EVENTS: RingEvents = RingEvents::new();
        EVENTS.notify(3);
        assert!(EVENTS.take(3));
    }
}
