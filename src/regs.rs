//! Ring-manager register block layout.
//!
//! The driver talks to the RM through a common block and one block per
//! ring, addressed as offsets from the device base supplied by the
//! platform. Only raw 32-bit load/store semantics are assumed; all
//! access goes through the [`RegisterBus`](crate::hal::RegisterBus)
//! trait.

// =============================================================================
// Common Block
// =============================================================================

/// Common block base offset
pub const COMMON_BASE: u32 = 0x000;

/// Global status register offset
pub const GLOBAL_STATUS: u32 = COMMON_BASE + 0x00;
/// Global control register offset
pub const GLOBAL_CTRL: u32 = COMMON_BASE + 0x04;

/// Global status: RM hardware finished internal init and is ready
pub const GLOBAL_STATUS_READY: u32 = 1 << 0;

// =============================================================================
// Per-Ring Blocks
// =============================================================================

/// First ring block offset
pub const RING_BLOCK_BASE: u32 = 0x100;
/// Stride between consecutive ring blocks
pub const RING_BLOCK_STRIDE: u32 = 0x40;

/// Ring control register offset (within a ring block)
pub const RING_CTRL: u32 = 0x00;
/// Ring status register offset
pub const RING_STATUS: u32 = 0x04;
/// Descriptor area base address, low 32 bits
pub const RING_DESC_BASE_LO: u32 = 0x08;
/// Descriptor area base address, high 32 bits
pub const RING_DESC_BASE_HI: u32 = 0x0C;
/// Completion area base address, low 32 bits
pub const RING_CMPL_BASE_LO: u32 = 0x10;
/// Completion area base address, high 32 bits
pub const RING_CMPL_BASE_HI: u32 = 0x14;
/// Completion write pointer (hardware-maintained, read-only)
pub const RING_CMPL_WRITE_PTR: u32 = 0x18;
/// Completion read pointer (software mirror)
pub const RING_CMPL_READ_PTR: u32 = 0x1C;
/// Doorbell: count of newly posted descriptors (doorbell mode)
pub const RING_DOORBELL: u32 = 0x20;
/// Completion-notification threshold
pub const RING_CMPL_THRESHOLD: u32 = 0x24;
/// Completion-notification timer
pub const RING_CMPL_TIMER: u32 = 0x28;
/// Statistics control
pub const RING_STATS_CTRL: u32 = 0x2C;

/// Ring control: activate the ring (toggle mode flips this per batch)
pub const RING_CTRL_ACTIVATE: u32 = 1 << 0;
/// Ring control: request a descriptor/completion flush
pub const RING_CTRL_FLUSH: u32 = 1 << 1;

/// Ring status: flush completed
pub const RING_STATUS_FLUSH_DONE: u32 = 1 << 0;
/// Ring status: ring configured and idle
pub const RING_STATUS_READY: u32 = 1 << 1;

/// Statistics control: clear all counters for this ring
pub const RING_STATS_CLEAR: u32 = 1 << 0;

/// Compute the device-relative offset of a ring block register.
#[inline(always)]
#[must_use]
pub const fn ring_reg(ring: usize, reg: u32) -> u32 {
    RING_BLOCK_BASE + (ring as u32) * RING_BLOCK_STRIDE + reg
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NUM_RINGS;

    #[test]
    fn ring_blocks_do_not_overlap() {
        // Largest register offset inside a block must fit the stride.
        assert!(RING_STATS_CTRL + 4 <= RING_BLOCK_STRIDE);
    }

    #[test]
    fn ring_reg_addresses() {
        assert_eq!(ring_reg(0, RING_CTRL), 0x100);
        assert_eq!(ring_reg(1, RING_CTRL), 0x140);
        assert_eq!(ring_reg(3, RING_DOORBELL), 0x100 + 3 * 0x40 + 0x20);
    }

    #[test]
    fn ring_blocks_clear_common_block() {
        for ring in 0..NUM_RINGS {
            assert!(ring_reg(ring, RING_CTRL) >= RING_BLOCK_BASE);
        }
        assert!(GLOBAL_CTRL < RING_BLOCK_BASE);
    }
}
