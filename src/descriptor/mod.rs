//! Descriptor wire formats.
//!
//! Every ring slot is one fixed-width 16-byte record. Word 0 bits `[2:0]`
//! carry the type tag; all packing is explicit shift-and-mask on `u32`
//! words so the layout is bit-exact regardless of toolchain.
//!
//! The two transfer formats (compact and split) are mutually exclusive
//! per ring and selected at configuration time via
//! [`DescriptorFormat`](crate::config::DescriptorFormat).

pub mod compact;
pub mod completion;
pub mod header;
pub mod split;

use crate::constants::BD_WORDS;

// =============================================================================
// Type Tags
// =============================================================================

/// Descriptor type tags (word 0, bits `[2:0]`).
pub mod tag {
    /// Packet header
    pub const HEADER: u32 = 0b001;
    /// Compact transfer record (address + length + opcode combined)
    pub const COMPACT: u32 = 0b010;
    /// Split-format host-address record
    pub const HOST_ADDR: u32 = 0b011;
    /// Split-format local address/length/opcode record
    pub const LOCAL: u32 = 0b100;
    /// Next-pointer sentinel chaining ring buffers
    pub const NEXT_PTR: u32 = 0b111;
}

/// Mask selecting the type tag in word 0.
pub const TAG_MASK: u32 = 0b111;

// =============================================================================
// Raw Slot
// =============================================================================

/// One raw descriptor slot: four 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BdSlot(pub [u32; BD_WORDS]);

impl BdSlot {
    /// An all-zero slot (tag 0, matching no descriptor type).
    pub const EMPTY: BdSlot = BdSlot([0; BD_WORDS]);

    /// Type tag of this slot.
    #[inline(always)]
    #[must_use]
    pub const fn tag(&self) -> u32 {
        self.0[0] & TAG_MASK
    }
}

// =============================================================================
// Next-Pointer Sentinel
// =============================================================================

/// Next-pointer sentinel: placed as the reserved last slot of every ring
/// buffer, naming the bus address of the next buffer and the toggle value
/// that becomes valid there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPtrBd {
    /// Toggle value valid in the target buffer
    pub toggle: u8,
    /// Bus address of the target buffer
    pub target: u64,
}

impl NextPtrBd {
    /// Encode to a raw slot.
    #[must_use]
    pub const fn encode(&self) -> BdSlot {
        BdSlot([
            tag::NEXT_PTR | (((self.toggle & 1) as u32) << 3),
            self.target as u32,
            (self.target >> 32) as u32,
            0,
        ])
    }

    /// Decode from a raw slot; `None` if the tag does not match.
    #[must_use]
    pub const fn decode(slot: &BdSlot) -> Option<Self> {
        if slot.tag() != tag::NEXT_PTR {
            return None;
        }
        Some(Self {
            toggle: ((slot.0[0] >> 3) & 1) as u8,
            target: slot.0[1] as u64 | ((slot.0[2] as u64) << 32),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
