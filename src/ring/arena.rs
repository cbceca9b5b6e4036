//! Descriptor arena: the chained buffers backing one ring.
//!
//! Each ring owns `BUFS` fixed-size buffers of `SLOTS` descriptor slots.
//! The last slot of every buffer is reserved for the next-pointer
//! sentinel chaining it to the following buffer, so only `SLOTS - 1`
//! slots per buffer carry packets. The engine reads this memory
//! concurrently with software writes, so all slot access is volatile.

use crate::descriptor::{BdSlot, NextPtrBd};

/// Descriptor buffers for one ring.
///
/// Alignment matches the device contract for the descriptor area base.
#[repr(align(4096))]
pub struct DescriptorArena<const BUFS: usize, const SLOTS: usize> {
    buffers: [[BdSlot; SLOTS]; BUFS],
}

impl<const BUFS: usize, const SLOTS: usize> DescriptorArena<BUFS, SLOTS> {
    /// Create a zeroed arena. Sentinels are seeded by [`Self::reset`]
    /// once the arena has its final address.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffers: [[BdSlot::EMPTY; SLOTS]; BUFS],
        }
    }

    /// Data slots available per buffer (excludes the sentinel).
    #[must_use]
    pub const fn data_slots_per_buffer() -> usize {
        SLOTS - 1
    }

    /// Total data slots in the arena.
    #[must_use]
    pub const fn data_slots() -> usize {
        BUFS * (SLOTS - 1)
    }

    /// Bus address of the arena (the first buffer).
    #[inline(always)]
    #[must_use]
    pub fn base_addr(&self) -> u64 {
        self.buffers.as_ptr() as u64
    }

    /// Bus address of buffer `buf`.
    #[inline(always)]
    #[must_use]
    pub fn buffer_addr(&self, buf: usize) -> u64 {
        self.buffers[buf].as_ptr() as u64
    }

    /// Volatile read of one slot.
    #[inline(always)]
    #[must_use]
    pub fn read_slot(&self, buf: usize, slot: usize) -> BdSlot {
        let src = &raw const self.buffers[buf][slot];
        // SAFETY: indices are bounds-checked by the borrow above.
        unsafe { core::ptr::read_volatile(src) }
    }

    /// Volatile write of one slot.
    #[inline(always)]
    pub fn write_slot(&mut self, buf: usize, slot: usize, value: &BdSlot) {
        let dst = &raw mut self.buffers[buf][slot];
        // SAFETY: indices are bounds-checked by the borrow above.
        unsafe { core::ptr::write_volatile(dst, *value) }
    }

    /// Zero the arena and seed the sentinel chain over the first `bufs`
    /// buffers, each sentinel carrying the first-lap toggle for its
    /// target. Storage is sized for the largest variant; a variant using
    /// fewer buffers chains only its own and the rest stay zeroed.
    pub fn reset(&mut self, bufs: usize) {
        for buf in 0..BUFS {
            for slot in 0..SLOTS {
                self.write_slot(buf, slot, &BdSlot::EMPTY);
            }
        }
        for buf in 0..bufs {
            let target = self.buffer_addr((buf + 1) % bufs);
            let sentinel = NextPtrBd {
                toggle: ((buf + 1) % 2) as u8,
                target,
            };
            self.write_slot(buf, SLOTS - 1, &sentinel.encode());
        }
    }
}

impl<const BUFS: usize, const SLOTS: usize> Default for DescriptorArena<BUFS, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
