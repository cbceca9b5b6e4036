//! Split transfer descriptors.
//!
//! The split variant expresses one transfer chunk as a pair of records
//! behind the packet header: a host-address BD carrying the low 32 bits
//! of the host address (the high bits travel in the header) and a local
//! BD carrying the card address, length, and opcode.
//!
//! Lengths come in two tiers. The normal tier carries up to 64 KiB in
//! 4-byte units; the mega tier carries multiples of the 64 KiB granule.
//! Requests above the normal tier are decomposed into one mega chunk
//! followed by one remainder chunk.

use super::{BdSlot, TAG_MASK, tag};
use crate::config::Direction;
use crate::constants::{MEGA_GRANULE, MEGA_MAX_BD_LEN, SPLIT_MAX_BD_LEN};

/// Direction bit position in word 0 (1 = card to host)
const DIR_SHIFT: u32 = 3;
/// Mega-tier flag position in word 0
const MEGA_SHIFT: u32 = 4;

// =============================================================================
// Host-Address BD
// =============================================================================

/// Host-address record: low 32 bits of the chunk's host address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAddrBd {
    /// Host address bits 31:0
    pub host_addr_lo: u32,
}

impl HostAddrBd {
    /// Encode to a raw slot.
    #[must_use]
    pub const fn encode(&self) -> BdSlot {
        BdSlot([tag::HOST_ADDR, self.host_addr_lo, 0, 0])
    }

    /// Decode from a raw slot; `None` if the tag does not match.
    #[must_use]
    pub const fn decode(slot: &BdSlot) -> Option<Self> {
        if slot.0[0] & TAG_MASK != tag::HOST_ADDR {
            return None;
        }
        Some(Self {
            host_addr_lo: slot.0[1],
        })
    }
}

// =============================================================================
// Local BD
// =============================================================================

/// Local address/length/opcode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalBd {
    /// Transfer direction
    pub direction: Direction,
    /// Card-local bus address
    pub local_addr: u32,
    /// Length in bytes. Normal tier: at most 64 KiB, 4-byte aligned.
    /// Mega tier: a multiple of the 64 KiB granule.
    pub len: usize,
    /// Mega-tier length encoding
    pub mega: bool,
}

impl LocalBd {
    /// Encode to a raw slot.
    #[must_use]
    pub fn encode(&self) -> BdSlot {
        let mut w0 = tag::LOCAL;
        if matches!(self.direction, Direction::CardToHost) {
            w0 |= 1 << DIR_SHIFT;
        }
        let w2 = if self.mega {
            debug_assert_eq!(self.len % MEGA_GRANULE, 0);
            debug_assert!(self.len <= MEGA_MAX_BD_LEN);
            w0 |= 1 << MEGA_SHIFT;
            (self.len / MEGA_GRANULE) as u32
        } else {
            debug_assert!(self.len <= SPLIT_MAX_BD_LEN);
            debug_assert_eq!(self.len % 4, 0);
            (self.len / 4) as u32
        };
        BdSlot([w0, self.local_addr, w2, 0])
    }

    /// Decode from a raw slot; `None` if the tag does not match.
    #[must_use]
    pub fn decode(slot: &BdSlot) -> Option<Self> {
        if slot.0[0] & TAG_MASK != tag::LOCAL {
            return None;
        }
        let mega = slot.0[0] >> MEGA_SHIFT & 1 != 0;
        let len = if mega {
            slot.0[2] as usize * MEGA_GRANULE
        } else {
            slot.0[2] as usize * 4
        };
        let direction = if slot.0[0] >> DIR_SHIFT & 1 != 0 {
            Direction::CardToHost
        } else {
            Direction::HostToCard
        };
        Some(Self {
            direction,
            local_addr: slot.0[1],
            len,
            mega,
        })
    }
}

// =============================================================================
// Chunk Decomposition
// =============================================================================

/// One chunk of a split-variant transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitChunk {
    /// Chunk length in bytes
    pub len: usize,
    /// Encode with the mega-tier length field
    pub mega: bool,
}

/// Decomposition of one request into at most two chunks: a mega chunk
/// covering the largest granule multiple, then the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitChunks {
    chunks: [SplitChunk; 2],
    count: usize,
    next: usize,
}

impl SplitChunks {
    /// Plan the decomposition of `len` bytes.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        let empty = SplitChunk { len: 0, mega: false };
        if len <= SPLIT_MAX_BD_LEN {
            return Self {
                chunks: [SplitChunk { len, mega: false }, empty],
                count: 1,
                next: 0,
            };
        }
        let mega_len = (len / MEGA_GRANULE) * MEGA_GRANULE;
        let remainder = len - mega_len;
        if remainder == 0 {
            Self {
                chunks: [
                    SplitChunk {
                        len: mega_len,
                        mega: true,
                    },
                    empty,
                ],
                count: 1,
                next: 0,
            }
        } else {
            Self {
                chunks: [
                    SplitChunk {
                        len: mega_len,
                        mega: true,
                    },
                    SplitChunk {
                        len: remainder,
                        mega: false,
                    },
                ],
                count: 2,
                next: 0,
            }
        }
    }

    /// Number of chunks this plan yields.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

impl Iterator for SplitChunks {
    type Item = SplitChunk;

    fn next(&mut self) -> Option<SplitChunk> {
        if self.next >= self.count {
            return None;
        }
        let chunk = self.chunks[self.next];
        self.next += 1;
        Some(chunk)
    }
}

// =============================================================================
// Tests
// =============================================================================
