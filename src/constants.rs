//! Shared driver constants.
//!
//! Ring geometry, protocol limits, and retry budgets live here so the
//! rest of the driver never hard-codes a magic number.

// =============================================================================
// Ring Geometry
// =============================================================================

/// Number of hardware rings. Rings are statically indexed 0..NUM_RINGS.
pub const NUM_RINGS: usize = 4;

/// Descriptor buffers per ring in the compact protocol variant.
pub const COMPACT_RING_BUFFERS: usize = 8;

/// Descriptor buffers per ring in the split protocol variant.
pub const SPLIT_RING_BUFFERS: usize = 9;

/// Maximum descriptor buffers per ring (storage is sized for this).
pub const MAX_RING_BUFFERS: usize = SPLIT_RING_BUFFERS;

/// Size of one descriptor buffer in bytes.
pub const DESC_BUFFER_SIZE: usize = 4096;

/// Size of one descriptor slot in bytes.
pub const BD_SIZE: usize = 16;

/// Number of 32-bit words in one descriptor slot.
pub const BD_WORDS: usize = BD_SIZE / 4;

/// Descriptor slots per buffer (the last one is the next-pointer sentinel).
pub const SLOTS_PER_BUFFER: usize = DESC_BUFFER_SIZE / BD_SIZE;

/// Completion ring depth in packets. Independent of the descriptor area.
pub const CMPL_RING_DEPTH: usize = 128;

/// Size of one completion packet in bytes.
pub const CMPL_PACKET_SIZE: usize = 8;

/// Required alignment of the descriptor area base address.
pub const DESC_AREA_ALIGN: usize = 4096;

/// Required alignment of the completion area base address.
pub const CMPL_AREA_ALIGN: usize = 8192;

// =============================================================================
// Protocol Limits
// =============================================================================

/// Minimum transfer length in bytes.
pub const MIN_TRANSFER_LEN: usize = 4;

/// Maximum transfer length in bytes (16 MiB).
pub const MAX_TRANSFER_LEN: usize = 16 * 1024 * 1024;

/// Transfer lengths and both addresses must be multiples of this.
pub const TRANSFER_ALIGN: usize = 4;

/// Maximum entries in a split-variant block list.
pub const MAX_BLOCK_LIST_LEN: usize = 1024;

/// Maximum non-header descriptors one header may announce.
pub const MAX_BDS_PER_HEADER: usize = 30;

/// Packet ids are 5 bits wide and wrap at this modulus.
pub const PACKET_ID_MODULUS: u8 = 32;

/// Largest payload one compact transfer BD can carry (1 MiB).
pub const COMPACT_MAX_BD_LEN: usize = 1024 * 1024;

/// Largest payload one split local BD can carry in the normal tier (64 KiB).
pub const SPLIT_MAX_BD_LEN: usize = 64 * 1024;

/// Granularity of the split mega tier. Mega BD lengths are multiples of this.
pub const MEGA_GRANULE: usize = 64 * 1024;

/// Largest payload one mega-tier BD can carry.
pub const MEGA_MAX_BD_LEN: usize = MAX_TRANSFER_LEN;

/// Length of the write-sync micro-transfer in bytes.
pub const SYNC_TRANSFER_LEN: usize = 4;

/// Signature constant carried in every write-sync record.
pub const SYNC_SIGNATURE: u16 = 0x524D;

// =============================================================================
// Retry Budgets
// =============================================================================

/// Iterations of the ring-flush poll before giving up.
pub const FLUSH_POLL_BUDGET: u32 = 10_000;

/// Microseconds between ring-flush poll iterations.
pub const FLUSH_POLL_INTERVAL_US: u32 = 10;

/// Iterations of the completion busy-poll before giving up (poll mode).
pub const CMPL_POLL_BUDGET: u32 = 1_000_000;

/// Microseconds between completion poll iterations.
pub const CMPL_POLL_INTERVAL_US: u32 = 1;

/// Milliseconds to wait for a completion event (interrupt mode).
pub const CMPL_EVENT_TIMEOUT_MS: u32 = 1_000;

/// Iterations of the write-sync host poll before giving up (~1 s budget).
pub const SYNC_POLL_BUDGET: u32 = 100_000;

/// Microseconds between write-sync poll iterations.
pub const SYNC_POLL_INTERVAL_US: u32 = 10;

/// Iterations of the RM hardware-ready poll during bring-up.
pub const READY_POLL_BUDGET: u32 = 10_000;

// =============================================================================
// Tests
// =============================================================================
