//! Write cursor over a descriptor arena.
//!
//! The cursor owns the software side of the toggle protocol. It walks the
//! data slots of each buffer in order and, just before crossing into the
//! next buffer, rewrites that buffer's sentinel with the flipped toggle
//! so the engine follows the chain with the parity the next packets will
//! carry. The engine stops at any header whose toggle does not match its
//! own expectation. Parity alone only hides slots that never held a
//! header with the current toggle — a chain of even length returns the
//! toggle to its starting value after one full lap — so the ring layer
//! scrubs each batch's slots once its completions are drained, keeping
//! everything ahead of the cursor unreadable to the engine.

use super::arena::DescriptorArena;
use crate::constants::MAX_BDS_PER_HEADER;
use crate::descriptor::header::HeaderBd;
use crate::descriptor::{BdSlot, NextPtrBd};
use crate::error::{TransferError, TransferResult};

/// Per-packet header fields supplied by the orchestrator; the cursor
/// fills in the toggle and descriptor count itself.
#[derive(Debug, Clone, Copy)]
pub struct PacketHeader {
    /// First packet of its batch
    pub batch_start: bool,
    /// Last packet of its batch
    pub batch_end: bool,
    /// 5-bit wrapping packet id
    pub packet_id: u8,
    /// Host address bits 63:32 (split variant; zero for compact)
    pub host_addr_hi: u32,
}

/// Write position within one ring's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingCursor {
    buf: usize,
    slot: usize,
    toggle: u8,
    posted: u32,
    /// Free-running count of data slots ever written. Survives
    /// `take_posted`, so the span between two snapshots is always the
    /// difference of their counts.
    written: u32,
    /// Buffers the active variant chains (may be fewer than storage)
    bufs: usize,
}

impl RingCursor {
    /// Cursor at the start of a freshly reset arena chaining `bufs`
    /// buffers.
    #[must_use]
    pub const fn new(bufs: usize) -> Self {
        Self {
            buf: 0,
            slot: 0,
            toggle: 0,
            posted: 0,
            written: 0,
            bufs,
        }
    }

    /// Buffers this cursor walks before wrapping.
    #[inline(always)]
    #[must_use]
    pub const fn buffer_count(&self) -> usize {
        self.bufs
    }

    /// Toggle parity the next header will carry.
    #[inline(always)]
    #[must_use]
    pub const fn toggle(&self) -> u8 {
        self.toggle
    }

    /// Current (buffer, slot) position.
    #[inline(always)]
    #[must_use]
    pub const fn position(&self) -> (usize, usize) {
        (self.buf, self.slot)
    }

    /// Free-running count of data slots written through this cursor.
    #[inline(always)]
    #[must_use]
    pub const fn written(&self) -> u32 {
        self.written
    }

    /// Take the count of descriptors posted since the last call. Fed to
    /// the doorbell register in doorbell activation mode.
    pub const fn take_posted(&mut self) -> u32 {
        let posted = self.posted;
        self.posted = 0;
        posted
    }

    /// Write one packet: a header followed by its descriptors. The
    /// header toggle is the cursor's current parity even when the
    /// descriptors spill into the next buffer.
    pub fn write_packet<const BUFS: usize, const SLOTS: usize>(
        &mut self,
        arena: &mut DescriptorArena<BUFS, SLOTS>,
        header: PacketHeader,
        bds: &[BdSlot],
    ) -> TransferResult<()> {
        if bds.len() > MAX_BDS_PER_HEADER {
            return Err(TransferError::CapacityExceeded);
        }

        let encoded = HeaderBd {
            toggle: self.toggle,
            batch_start: header.batch_start,
            batch_end: header.batch_end,
            packet_id: header.packet_id,
            bd_count: bds.len() as u8,
            host_addr_hi: header.host_addr_hi,
        }
        .encode();
        self.push(arena, &encoded);
        for bd in bds {
            self.push(arena, bd);
        }
        Ok(())
    }

    /// Write one slot at the cursor and advance, crossing the sentinel
    /// when the buffer's data slots are exhausted.
    fn push<const BUFS: usize, const SLOTS: usize>(
        &mut self,
        arena: &mut DescriptorArena<BUFS, SLOTS>,
        value: &BdSlot,
    ) {
        arena.write_slot(self.buf, self.slot, value);
        self.posted += 1;
        self.written = self.written.wrapping_add(1);
        self.slot += 1;
        if self.slot == SLOTS - 1 {
            self.cross_sentinel(arena);
        }
    }

    /// Rewrite the current buffer's sentinel with the flipped toggle and
    /// step into the next buffer.
    fn cross_sentinel<const BUFS: usize, const SLOTS: usize>(
        &mut self,
        arena: &mut DescriptorArena<BUFS, SLOTS>,
    ) {
        let next_buf = (self.buf + 1) % self.bufs;
        let next_toggle = self.toggle ^ 1;
        let sentinel = NextPtrBd {
            toggle: next_toggle,
            target: arena.buffer_addr(next_buf),
        };
        arena.write_slot(self.buf, SLOTS - 1, &sentinel.encode());
        self.toggle = next_toggle;
        self.buf = next_buf;
        self.slot = 0;
    }
}

// =============================================================================
// Tests
// =============================================================================
