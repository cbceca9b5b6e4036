//! Packet header descriptor.
//!
//! Every packet opens with a header naming the count of non-header
//! descriptors that follow it. The header carries the toggle bit the
//! engine checks before consuming the packet; writing the wrong toggle
//! stalls the engine on that slot until the caller's timeout fires.

use super::{BdSlot, TAG_MASK, tag};
use crate::constants::MAX_BDS_PER_HEADER;

/// Toggle bit position in word 0
const TOGGLE_SHIFT: u32 = 3;
/// Batch-start flag position
const START_SHIFT: u32 = 4;
/// Batch-end flag position
const END_SHIFT: u32 = 5;
/// Packet id field position (5 bits)
const PKT_ID_SHIFT: u32 = 6;
/// Packet id field mask
const PKT_ID_MASK: u32 = 0x1F << PKT_ID_SHIFT;
/// BD count field position (8 bits)
const BD_COUNT_SHIFT: u32 = 11;
/// BD count field mask
const BD_COUNT_MASK: u32 = 0xFF << BD_COUNT_SHIFT;

/// Packet header record.
///
/// In the split variant word 1 carries the high 32 bits of the host
/// address for the BDs that follow; the compact variant leaves it zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBd {
    /// Toggle parity the engine expects for this slot
    pub toggle: u8,
    /// First packet of its batch
    pub batch_start: bool,
    /// Last packet of its batch
    pub batch_end: bool,
    /// 5-bit wrapping packet id echoed by the completion
    pub packet_id: u8,
    /// Count of non-header descriptors following this header
    pub bd_count: u8,
    /// Host address bits 63:32 (split variant only)
    pub host_addr_hi: u32,
}

impl HeaderBd {
    /// Encode to a raw slot.
    ///
    /// `bd_count` above [`MAX_BDS_PER_HEADER`] is a caller bug; the
    /// orchestrator enforces the cap before encoding.
    #[must_use]
    pub const fn encode(&self) -> BdSlot {
        let mut w0 = tag::HEADER;
        w0 |= ((self.toggle & 1) as u32) << TOGGLE_SHIFT;
        if self.batch_start {
            w0 |= 1 << START_SHIFT;
        }
        if self.batch_end {
            w0 |= 1 << END_SHIFT;
        }
        w0 |= (((self.packet_id & 0x1F) as u32) << PKT_ID_SHIFT) & PKT_ID_MASK;
        w0 |= ((self.bd_count as u32) << BD_COUNT_SHIFT) & BD_COUNT_MASK;
        BdSlot([w0, self.host_addr_hi, 0, 0])
    }

    /// Decode from a raw slot; `None` if the tag does not match.
    #[must_use]
    pub const fn decode(slot: &BdSlot) -> Option<Self> {
        if slot.0[0] & TAG_MASK != tag::HEADER {
            return None;
        }
        let w0 = slot.0[0];
        Some(Self {
            toggle: ((w0 >> TOGGLE_SHIFT) & 1) as u8,
            batch_start: (w0 >> START_SHIFT) & 1 != 0,
            batch_end: (w0 >> END_SHIFT) & 1 != 0,
            packet_id: ((w0 & PKT_ID_MASK) >> PKT_ID_SHIFT) as u8,
            bd_count: ((w0 & BD_COUNT_MASK) >> BD_COUNT_SHIFT) as u8,
            host_addr_hi: slot.0[1],
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
