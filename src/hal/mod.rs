//! Hardware abstraction seams.
//!
//! Two collaborators are external to this core and reach it only through
//! traits: the memory-mapped register space of the RM block
//! ([`RegisterBus`]) and the PCIe-endpoint primitive that touches host
//! memory ([`HostMemory`]). Platform code supplies the implementations;
//! host tests supply mocks.

use core::sync::atomic::{Ordering, fence};

// =============================================================================
// Register Bus
// =============================================================================

/// 32-bit memory-mapped register access at device-relative offsets.
///
/// No semantics beyond raw load/store are assumed. Offsets come from
/// [`crate::regs`].
pub trait RegisterBus {
    /// Read a 32-bit register.
    fn read32(&mut self, offset: u32) -> u32;
    /// Write a 32-bit register.
    fn write32(&mut self, offset: u32, value: u32);
}

/// Direct MMIO implementation of [`RegisterBus`] at a fixed base address.
pub struct MmioBus {
    base: usize,
}

impl MmioBus {
    /// Create a bus for the RM register space at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the virtual address of the RM register block,
    /// valid and 4-byte aligned for the lifetime of the bus.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }
}

impl RegisterBus for MmioBus {
    #[inline(always)]
    fn read32(&mut self, offset: u32) -> u32 {
        // SAFETY: constructor contract guarantees base validity.
        unsafe { core::ptr::read_volatile((self.base + offset as usize) as *const u32) }
    }

    #[inline(always)]
    fn write32(&mut self, offset: u32, value: u32) {
        // SAFETY: constructor contract guarantees base validity.
        unsafe { core::ptr::write_volatile((self.base + offset as usize) as *mut u32, value) }
    }
}

// =============================================================================
// Host Memory
// =============================================================================

/// Host-memory transfer failure reported by the platform transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HostMemError;

/// Blocking reads/writes of remote host memory over the PCIe endpoint.
///
/// Used exclusively by the write-sync handshake to discover, poll, and
/// clear the host scratch word.
pub trait HostMemory {
    /// Read a 32-bit word from host memory.
    fn read32(&mut self, addr: u64) -> Result<u32, HostMemError>;
    /// Write a 32-bit word to host memory.
    fn write32(&mut self, addr: u64, value: u32) -> Result<(), HostMemError>;
    /// Read a 64-bit word from host memory.
    fn read64(&mut self, addr: u64) -> Result<u64, HostMemError>;
}

// =============================================================================
// Memory Barriers
// =============================================================================

/// Barrier between descriptor fill and the toggle/doorbell write that
/// exposes it to the engine.
#[inline(always)]
pub fn dma_wmb() {
    fence(Ordering::SeqCst);
}

/// Barrier between observing the completion write pointer and reading the
/// completion payload behind it.
#[inline(always)]
pub fn dma_rmb() {
    fence(Ordering::SeqCst);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmio_bus_round_trip() {
        // Back the "registers" with an ordinary array on the host.
        let mut regs = [0u32; 8];
        let base = regs.as_mut_ptr() as usize;
        // SAFETY: base points at live, aligned storage for the test.
        let mut bus = unsafe { MmioBus::new(base) };

        bus.write32(0x00, 0xDEAD_BEEF);
        bus.write32(0x04, 42);
        assert_eq!(bus.read32(0x00), 0xDEAD_BEEF);
        assert_eq!(bus.read32(0x04), 42);
        assert_eq!(regs[1], 42);
    }

    #[test]
    fn barriers_do_not_panic() {
        dma_wmb();
        dma_rmb();
    }
}
