//! ISR-safe ring manager wrapper using critical sections.

use embedded_hal::delay::DelayNs;

use super::primitives::CriticalSectionCell;
use crate::constants::{SLOTS_PER_BUFFER, SPLIT_RING_BUFFERS};
use crate::driver::RingManager;
use crate::hal::{HostMemory, RegisterBus};

/// ISR-safe ring manager wrapper.
///
/// All access goes through `critical_section::with()`, disabling
/// interrupts for the duration of the closure. Intended for sharing one
/// driver instance between thread context and a completion ISR that
/// inspects ring state.
///
/// # Example
///
/// ```ignore
/// static RM: SharedRingManagerDefault<MmioBus, EpDma, Delay> =
///     SharedRingManager::new(bus, host, delay);
///
/// RM.with(|rm| {
///     rm.init(RmConfig::new()).unwrap();
/// });
/// ```
pub struct SharedRingManager<
    B,
    H,
    D,
    const BUFS: usize = SPLIT_RING_BUFFERS,
    const SLOTS: usize = SLOTS_PER_BUFFER,
> {
    inner: CriticalSectionCell<RingManager<B, H, D, BUFS, SLOTS>>,
}

impl<B, H, D, const BUFS: usize, const SLOTS: usize> SharedRingManager<B, H, D, BUFS, SLOTS>
where
    B: RegisterBus,
    H: HostMemory,
    D: DelayNs,
{
    /// Create a new shared instance (const, suitable for static
    /// initialization).
    pub const fn new(bus: B, host: H, delay: D) -> Self {
        Self {
            inner: CriticalSectionCell::new(RingManager::new(bus, host, delay)),
        }
    }

    /// Run `f` with exclusive access to the driver, critical section
    /// held throughout.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut RingManager<B, H, D, BUFS, SLOTS>) -> R) -> R {
        self.inner.with(f)
    }

    /// Like [`Self::with`], but yields `None` instead of panicking on a
    /// re-entrant call.
    #[inline]
    pub fn try_with<R>(
        &self,
        f: impl FnOnce(&mut RingManager<B, H, D, BUFS, SLOTS>) -> R,
    ) -> Option<R> {
        self.inner.try_with(f)
    }
}

/// Shared ring manager with the default ring geometry.
pub type SharedRingManagerDefault<B, H, D> = SharedRingManager<B, H, D>;
