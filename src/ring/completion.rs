//! Completion queue: the hardware-written ring of completion packets.
//!
//! Hardware appends one packet per consumed header and advances the
//! write pointer register; software mirrors its progress back through
//! the read pointer register. Both pointers are free-running counters
//! and index the ring modulo its depth, so the full/empty distinction
//! never collapses.
//!
//! Under bursty completion traffic only the most recent packet of a
//! burst is decoded; everything older in the burst is superseded by it
//! and is claimed without inspection.

use crate::constants::CMPL_RING_DEPTH;
use crate::descriptor::completion::CompletionPacket;

/// Completion packet storage for one ring.
///
/// Alignment matches the device contract for the completion area base.
#[repr(align(8192))]
pub struct CompletionQueue {
    slots: [[u32; 2]; CMPL_RING_DEPTH],
    /// Free-running read counter, mirrored to the read pointer register
    /// by the caller after every claim.
    read: u32,
}

impl CompletionQueue {
    /// Create a zeroed queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [[0; 2]; CMPL_RING_DEPTH],
            read: 0,
        }
    }

    /// Bus address of the completion area.
    #[inline(always)]
    #[must_use]
    pub fn base_addr(&self) -> u64 {
        self.slots.as_ptr() as u64
    }

    /// Free-running read counter (the register mirror value).
    #[inline(always)]
    #[must_use]
    pub const fn read_ptr(&self) -> u32 {
        self.read
    }

    /// Packets available given the hardware write counter.
    #[inline(always)]
    #[must_use]
    pub const fn available(&self, write_ptr: u32) -> u32 {
        write_ptr.wrapping_sub(self.read)
    }

    /// Decode the most recent packet of the pending burst, if any.
    ///
    /// The caller must issue a read barrier between observing the write
    /// pointer and calling this.
    #[must_use]
    pub fn latest(&self, write_ptr: u32) -> Option<CompletionPacket> {
        if self.available(write_ptr) == 0 {
            return None;
        }
        let index = write_ptr.wrapping_sub(1) as usize % CMPL_RING_DEPTH;
        let src = &raw const self.slots[index];
        // SAFETY: index is reduced modulo the ring depth.
        let words = unsafe { core::ptr::read_volatile(src) };
        Some(CompletionPacket::decode(words))
    }

    /// Claim everything up to the write counter, returning the number of
    /// packets claimed. The read pointer mirror advances monotonically;
    /// a stale write counter claims nothing. Hardware can never have
    /// more than one ring depth outstanding, so a diff beyond that is a
    /// stale (already claimed) pointer.
    pub const fn claim(&mut self, write_ptr: u32) -> u32 {
        let claimed = self.available(write_ptr);
        if claimed as usize > CMPL_RING_DEPTH {
            return 0;
        }
        self.read = self.read.wrapping_add(claimed);
        claimed
    }

    /// Forget all pending packets and restart the counters. Bring-up
    /// only, paired with a ring flush.
    pub fn reset(&mut self) {
        self.read = 0;
        for slot in &mut self.slots {
            let dst = &raw mut *slot;
            // SAFETY: dst is a live slot in this queue.
            unsafe { core::ptr::write_volatile(dst, [0; 2]) }
        }
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
