//! Ring manager device handle.
//!
//! [`RingManager`] owns the register bus, the host-memory transport, the
//! delay source, and the software state of all four rings. Bring-up
//! isolates per-ring failures: a ring that cannot be flushed or
//! programmed is left out of service and the remaining rings come up
//! normally.

use embedded_hal::delay::DelayNs;

use crate::config::{ActivationMode, CompletionCallback, RmConfig};
use crate::constants::{NUM_RINGS, SLOTS_PER_BUFFER, SPLIT_RING_BUFFERS};
use crate::error::{Error, InitError, Result};
use crate::hal::{HostMemory, RegisterBus};
use crate::ring::lifecycle::{self, RingState};
use crate::ring::{Ring, RingStats};

/// Ring manager driver.
///
/// # Type Parameters
/// * `B` - register access to the device block
/// * `H` - host memory access over the PCIe endpoint
/// * `D` - delay source for bounded polls
/// * `BUFS` - descriptor buffers per ring (storage; the active variant
///   may use fewer)
/// * `SLOTS` - descriptor slots per buffer
///
/// # Example
/// ```ignore
/// static mut RM: RingManagerDefault<MmioBus, EpDma, Delay> =
///     RingManager::new(bus, host, delay);
///
/// let rm = unsafe { &mut RM };
/// rm.init(RmConfig::new().with_active_rings(2))?;
/// ```
pub struct RingManager<
    B,
    H,
    D,
    const BUFS: usize = SPLIT_RING_BUFFERS,
    const SLOTS: usize = SLOTS_PER_BUFFER,
> {
    pub(super) bus: B,
    pub(super) host: H,
    pub(super) delay: D,
    pub(super) config: RmConfig,
    pub(super) rings: [Ring<BUFS, SLOTS>; NUM_RINGS],
    pub(super) callback: Option<CompletionCallback>,
}

/// Ring manager with the default ring geometry.
pub type RingManagerDefault<B, H, D> = RingManager<B, H, D>;

impl<B, H, D, const BUFS: usize, const SLOTS: usize> RingManager<B, H, D, BUFS, SLOTS>
where
    B: RegisterBus,
    H: HostMemory,
    D: DelayNs,
{
    /// Create an uninitialized driver.
    ///
    /// Const, suitable for static allocation; the descriptor and
    /// completion areas live inside this structure and must have a
    /// stable address before [`Self::init`] programs their bases.
    pub const fn new(bus: B, host: H, delay: D) -> Self {
        Self {
            bus,
            host,
            delay,
            config: RmConfig::new(),
            rings: [const { Ring::new() }; NUM_RINGS],
            callback: None,
        }
    }

    // =========================================================================
    // Bring-Up
    // =========================================================================

    /// Initialize the device and bring up the configured rings.
    ///
    /// Each ring is flushed, reset, and programmed independently; a ring
    /// that fails bring-up stays out of service without affecting the
    /// others. Fails outright only when the device never reports ready,
    /// the configuration is invalid, or no ring survives bring-up.
    pub fn init(&mut self, config: RmConfig) -> Result<()> {
        config.validate()?;
        self.config = config;

        lifecycle::wait_device_ready(&mut self.bus, &mut self.delay)?;

        let mut first_failure: Option<InitError> = None;
        for idx in 0..config.active_rings {
            match Self::bring_up_ring(
                &mut self.bus,
                &mut self.delay,
                &mut self.rings[idx],
                idx,
                &config,
            ) {
                Ok(()) => {}
                Err(e) => {
                    #[cfg(feature = "log")]
                    log::warn!("ring {idx} bring-up failed: {e}");
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }

        if self.usable_rings() == 0 {
            return Err(Error::Init(
                first_failure.unwrap_or(InitError::InvalidConfig),
            ));
        }
        Ok(())
    }

    fn bring_up_ring(
        bus: &mut B,
        delay: &mut D,
        ring: &mut Ring<BUFS, SLOTS>,
        idx: usize,
        config: &RmConfig,
    ) -> core::result::Result<(), InitError> {
        lifecycle::flush_ring(bus, delay, idx)?;
        ring.reset(config.format.ring_buffers());
        lifecycle::program_ring(
            bus,
            idx,
            ring.arena.base_addr(),
            ring.cq.base_addr(),
            config.cmpl_threshold,
            config.cmpl_timer,
        )?;
        // In doorbell mode the ring stays enabled; batches are exposed
        // by doorbell counts alone.
        if matches!(config.activation, ActivationMode::Doorbell) {
            lifecycle::activate_ring(bus, idx);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Active configuration.
    #[inline(always)]
    pub fn config(&self) -> &RmConfig {
        &self.config
    }

    /// Number of rings that survived bring-up.
    pub fn usable_rings(&self) -> usize {
        self.rings.iter().filter(|r| r.is_usable()).count()
    }

    /// Whether `ring` survived bring-up.
    pub fn is_ring_usable(&self, ring: usize) -> bool {
        ring < NUM_RINGS && self.rings[ring].is_usable()
    }

    /// Lifecycle state of `ring`.
    pub fn ring_state(&self, ring: usize) -> RingState {
        self.rings[ring].state()
    }

    /// Counters for `ring`.
    pub fn ring_stats(&self, ring: usize) -> RingStats {
        self.rings[ring].stats()
    }

    /// Register a callback invoked when a batch's local completion is
    /// decoded, before write-sync confirmation.
    pub fn set_completion_callback(&mut self, callback: CompletionCallback) {
        self.callback = Some(callback);
    }

    /// Remove the completion callback.
    pub fn clear_completion_callback(&mut self) {
        self.callback = None;
    }
}
