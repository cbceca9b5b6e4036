//! Ring bring-up and register programming.
//!
//! Bring-up order per ring: flush, program the area bases and
//! notification knobs, clear statistics. The flush quiesces whatever a
//! previous owner (boot firmware, a crashed driver) left in flight
//! before the bases are repointed; skipping it risks the engine chasing
//! stale descriptor chains.

use embedded_hal::delay::DelayNs;

use crate::constants::{
    CMPL_AREA_ALIGN, DESC_AREA_ALIGN, FLUSH_POLL_BUDGET, FLUSH_POLL_INTERVAL_US, READY_POLL_BUDGET,
};
use crate::error::{InitError, InitResult};
use crate::hal::RegisterBus;
use crate::regs;

/// Lifecycle state of one ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RingState {
    /// Not yet brought up, or bring-up failed
    #[default]
    Uninitialized,
    /// Configured, no batch in flight
    Idle,
    /// Batch exposed to the engine
    Active,
}

/// Poll the global status register until the device reports ready.
pub fn wait_device_ready<B: RegisterBus, D: DelayNs>(bus: &mut B, delay: &mut D) -> InitResult<()> {
    for _ in 0..READY_POLL_BUDGET {
        if bus.read32(regs::GLOBAL_STATUS) & regs::GLOBAL_STATUS_READY != 0 {
            return Ok(());
        }
        delay.delay_us(FLUSH_POLL_INTERVAL_US);
    }
    Err(InitError::NotReady)
}

/// Request a flush of one ring and poll it to completion.
pub fn flush_ring<B: RegisterBus, D: DelayNs>(
    bus: &mut B,
    delay: &mut D,
    ring: usize,
) -> InitResult<()> {
    let ctrl = regs::ring_reg(ring, regs::RING_CTRL);
    let status = regs::ring_reg(ring, regs::RING_STATUS);

    let value = bus.read32(ctrl);
    bus.write32(ctrl, value | regs::RING_CTRL_FLUSH);

    for _ in 0..FLUSH_POLL_BUDGET {
        if bus.read32(status) & regs::RING_STATUS_FLUSH_DONE != 0 {
            let value = bus.read32(ctrl);
            bus.write32(ctrl, value & !regs::RING_CTRL_FLUSH);
            return Ok(());
        }
        delay.delay_us(FLUSH_POLL_INTERVAL_US);
    }
    Err(InitError::FlushTimeout)
}

/// Program one ring's area bases and completion notification knobs.
///
/// Rejects misaligned bases before any register is touched.
pub fn program_ring<B: RegisterBus>(
    bus: &mut B,
    ring: usize,
    desc_base: u64,
    cmpl_base: u64,
    threshold: u32,
    timer: u32,
) -> InitResult<()> {
    if desc_base % DESC_AREA_ALIGN as u64 != 0 || cmpl_base % CMPL_AREA_ALIGN as u64 != 0 {
        return Err(InitError::BadAlignment);
    }

    bus.write32(regs::ring_reg(ring, regs::RING_DESC_BASE_LO), desc_base as u32);
    bus.write32(
        regs::ring_reg(ring, regs::RING_DESC_BASE_HI),
        (desc_base >> 32) as u32,
    );
    bus.write32(regs::ring_reg(ring, regs::RING_CMPL_BASE_LO), cmpl_base as u32);
    bus.write32(
        regs::ring_reg(ring, regs::RING_CMPL_BASE_HI),
        (cmpl_base >> 32) as u32,
    );
    bus.write32(regs::ring_reg(ring, regs::RING_CMPL_THRESHOLD), threshold);
    bus.write32(regs::ring_reg(ring, regs::RING_CMPL_TIMER), timer);
    bus.write32(regs::ring_reg(ring, regs::RING_CMPL_READ_PTR), 0);
    bus.write32(regs::ring_reg(ring, regs::RING_STATS_CTRL), regs::RING_STATS_CLEAR);
    Ok(())
}

/// Set the ring's activate bit.
pub fn activate_ring<B: RegisterBus>(bus: &mut B, ring: usize) {
    let ctrl = regs::ring_reg(ring, regs::RING_CTRL);
    let value = bus.read32(ctrl);
    bus.write32(ctrl, value | regs::RING_CTRL_ACTIVATE);
}

/// Clear the ring's activate bit.
pub fn deactivate_ring<B: RegisterBus>(bus: &mut B, ring: usize) {
    let ctrl = regs::ring_reg(ring, regs::RING_CTRL);
    let value = bus.read32(ctrl);
    bus.write32(ctrl, value & !regs::RING_CTRL_ACTIVATE);
}

/// Post a descriptor count to the ring's doorbell.
pub fn ring_doorbell<B: RegisterBus>(bus: &mut B, ring: usize, count: u32) {
    bus.write32(regs::ring_reg(ring, regs::RING_DOORBELL), count);
}

/// Mirror the completion read counter back to the device.
pub fn mirror_read_ptr<B: RegisterBus>(bus: &mut B, ring: usize, read_ptr: u32) {
    bus.write32(regs::ring_reg(ring, regs::RING_CMPL_READ_PTR), read_ptr);
}

// =============================================================================
// Tests
// =============================================================================
