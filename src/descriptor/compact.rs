//! Compact transfer descriptor.
//!
//! The compact variant expresses a whole transfer chunk in one record:
//! local address, host address (40 bits), length, and direction. One
//! compact BD follows each header; chunks above
//! [`COMPACT_MAX_BD_LEN`](crate::constants::COMPACT_MAX_BD_LEN) are cut
//! by the orchestrator before encoding, so encoding itself never fails.

use super::{BdSlot, TAG_MASK, tag};
use crate::config::Direction;
use crate::constants::COMPACT_MAX_BD_LEN;

/// Direction bit position in word 0 (1 = card to host)
const DIR_SHIFT: u32 = 3;
/// Length field mask in word 3 (length in 4-byte units, 24 bits)
const LEN_MASK: u32 = 0x00FF_FFFF;
/// Host address bits 39:32 position in word 3
const HOST_HI_SHIFT: u32 = 24;

/// Compact transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactBd {
    /// Transfer direction
    pub direction: Direction,
    /// Card-local bus address
    pub local_addr: u32,
    /// Host address (40 bits expressible)
    pub host_addr: u64,
    /// Length in bytes (4-byte aligned, at most 1 MiB)
    pub len: usize,
}

impl CompactBd {
    /// Encode to a raw slot.
    #[must_use]
    pub fn encode(&self) -> BdSlot {
        debug_assert!(self.len <= COMPACT_MAX_BD_LEN);
        debug_assert_eq!(self.len % 4, 0);

        let mut w0 = tag::COMPACT;
        if matches!(self.direction, Direction::CardToHost) {
            w0 |= 1 << DIR_SHIFT;
        }
        let w3 = ((self.len as u32 / 4) & LEN_MASK)
            | ((((self.host_addr >> 32) & 0xFF) as u32) << HOST_HI_SHIFT);
        BdSlot([w0, self.local_addr, self.host_addr as u32, w3])
    }

    /// Decode from a raw slot; `None` if the tag does not match.
    #[must_use]
    pub fn decode(slot: &BdSlot) -> Option<Self> {
        if slot.0[0] & TAG_MASK != tag::COMPACT {
            return None;
        }
        let direction = if slot.0[0] >> DIR_SHIFT & 1 != 0 {
            Direction::CardToHost
        } else {
            Direction::HostToCard
        };
        let host_hi = (slot.0[3] >> HOST_HI_SHIFT) as u64;
        Some(Self {
            direction,
            local_addr: slot.0[1],
            host_addr: slot.0[2] as u64 | (host_hi << 32),
            len: ((slot.0[3] & LEN_MASK) as usize) * 4,
        })
    }
}

/// Chunk lengths for a compact-variant transfer: full 1 MiB chunks plus a
/// remainder. Every chunk becomes its own packet.
#[derive(Debug, Clone, Copy)]
pub struct CompactChunks {
    remaining: usize,
}

impl CompactChunks {
    /// Plan the decomposition of `len` bytes.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self { remaining: len }
    }

    /// Number of chunks this plan will yield.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.remaining.div_ceil(COMPACT_MAX_BD_LEN)
    }
}

impl Iterator for CompactChunks {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let chunk = self.remaining.min(COMPACT_MAX_BD_LEN);
        self.remaining -= chunk;
        Some(chunk)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn compact_round_trip() {
        let bd = CompactBd {
            direction: Direction::CardToHost,
            local_addr: 0x8010_0000,
            host_addr: 0x0000_00AB_CDEF_0120,
            len: 64 * 1024,
        };
        let slot = bd.encode();
        assert_eq!(slot.tag(), tag::COMPACT);
        assert_eq!(CompactBd::decode(&slot), Some(bd));
    }

    #[test]
    fn compact_direction_bit() {
        let to_host = CompactBd {
            direction: Direction::CardToHost,
            local_addr: 0,
            host_addr: 0,
            len: 4,
        };
        assert_eq!(to_host.encode().0[0] & (1 << 3), 1 << 3);

        let to_card = CompactBd {
            direction: Direction::HostToCard,
            ..to_host
        };
        assert_eq!(to_card.encode().0[0] & (1 << 3), 0);
    }

    #[test]
    fn compact_length_in_dwords() {
        let bd = CompactBd {
            direction: Direction::HostToCard,
            local_addr: 0,
            host_addr: 0,
            len: 256,
        };
        assert_eq!(bd.encode().0[3] & 0x00FF_FFFF, 64);
    }

    #[test]
    fn compact_max_length_round_trip() {
        let bd = CompactBd {
            direction: Direction::HostToCard,
            local_addr: 0,
            host_addr: 0,
            len: COMPACT_MAX_BD_LEN,
        };
        assert_eq!(CompactBd::decode(&bd.encode()).unwrap().len, COMPACT_MAX_BD_LEN);
    }

    #[test]
    fn chunks_small_transfer_is_one_chunk() {
        let chunks: Vec<usize> = CompactChunks::new(4096).collect();
        assert_eq!(chunks, [4096]);
        assert_eq!(CompactChunks::new(4096).count(), 1);
    }

    #[test]
    fn chunks_oversized_transfer_splits() {
        let chunks: Vec<usize> = CompactChunks::new(COMPACT_MAX_BD_LEN + 4096).collect();
        assert_eq!(chunks, [COMPACT_MAX_BD_LEN, 4096]);
    }

    #[test]
    fn chunks_sixteen_mib_is_sixteen_packets() {
        let plan = CompactChunks::new(16 * 1024 * 1024);
        assert_eq!(plan.count(), 16);
        let total: usize = plan.sum();
        assert_eq!(total, 16 * 1024 * 1024);
    }
}
