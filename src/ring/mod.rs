//! Per-ring state: descriptor arena, write cursor, completion queue,
//! and lifecycle bookkeeping.

pub mod arena;
pub mod completion;
pub mod cursor;
pub mod lifecycle;

use arena::DescriptorArena;
use completion::CompletionQueue;
use cursor::RingCursor;
use lifecycle::RingState;

use crate::config::TransferRequest;
use crate::constants::PACKET_ID_MODULUS;

/// Per-ring counters. Cleared on bring-up alongside the hardware
/// statistics block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingStats {
    /// Batches started
    pub batches: u32,
    /// Packets posted (headers written, including write-sync packets)
    pub packets: u32,
    /// Batches that ended in an error
    pub errors: u32,
}

/// Cursor and id-counter snapshot taken before a batch is encoded. Marks
/// the start of the batch's slot span: a discarded batch is unwound to
/// it, a finished batch is scrubbed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchCheckpoint {
    pub(crate) cursor: RingCursor,
    pub(crate) next_packet_id: u8,
    pub(crate) last_packet_id: u8,
}

/// Batch staged by channel configuration, consumed by channel start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum StagedBatch {
    /// Nothing staged
    #[default]
    None,
    /// Compact variant: the single request, encoded at start time
    Compact(TransferRequest),
    /// Split variant: packets already encoded into the arena
    Split {
        /// Transfer packets written (sync packet not included)
        packets: u32,
        /// State to restore if the batch is discarded before start
        restore: BatchCheckpoint,
    },
}

/// All software state for one hardware ring.
pub struct Ring<const BUFS: usize, const SLOTS: usize> {
    pub(crate) arena: DescriptorArena<BUFS, SLOTS>,
    pub(crate) cursor: RingCursor,
    pub(crate) cq: CompletionQueue,
    pub(crate) state: RingState,
    /// A batch is in flight; configure/start are rejected until it ends.
    pub(crate) busy: bool,
    pub(crate) staged: StagedBatch,
    /// Next 5-bit packet id to hand out.
    pub(crate) next_packet_id: u8,
    /// Id of the most recently posted packet. The final completion of a
    /// batch must echo this.
    pub(crate) last_packet_id: u8,
    /// Packets exposed to the engine and not yet completed.
    pub(crate) outstanding: u32,
    /// Host scratch word address, discovered lazily on first sync.
    pub(crate) scratch_addr: Option<u64>,
    /// Payload word the write-sync micro-transfer reads from. Lives in
    /// the ring so it has a stable bus address while the batch runs.
    pub(crate) sync_payload: u32,
    pub(crate) stats: RingStats,
}

impl<const BUFS: usize, const SLOTS: usize> Ring<BUFS, SLOTS> {
    /// Create an uninitialized ring.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            arena: DescriptorArena::new(),
            cursor: RingCursor::new(BUFS),
            cq: CompletionQueue::new(),
            state: RingState::Uninitialized,
            busy: false,
            staged: StagedBatch::None,
            next_packet_id: 0,
            last_packet_id: 0,
            outstanding: 0,
            scratch_addr: None,
            sync_payload: 0,
            stats: RingStats {
                batches: 0,
                packets: 0,
                errors: 0,
            },
        }
    }

    /// Reset all software state after a successful flush. The ring comes
    /// out idle with a fresh arena, cursor, and completion queue, all
    /// chaining the active variant's buffer count.
    pub fn reset(&mut self, bufs: usize) {
        self.arena.reset(bufs);
        self.cursor = RingCursor::new(bufs);
        self.cq.reset();
        self.state = RingState::Idle;
        self.busy = false;
        self.staged = StagedBatch::None;
        self.next_packet_id = 0;
        self.last_packet_id = 0;
        self.outstanding = 0;
        self.scratch_addr = None;
        self.sync_payload = 0;
        self.stats = RingStats::default();
    }

    /// Whether bring-up succeeded for this ring.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        !matches!(self.state, RingState::Uninitialized)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> RingState {
        self.state
    }

    /// Per-ring counters.
    #[must_use]
    pub const fn stats(&self) -> RingStats {
        self.stats
    }

    /// Snapshot the cursor and id counters before encoding a batch.
    pub(crate) const fn checkpoint(&self) -> BatchCheckpoint {
        BatchCheckpoint {
            cursor: self.cursor,
            next_packet_id: self.next_packet_id,
            last_packet_id: self.last_packet_id,
        }
    }

    /// Unwind to a pre-encode snapshot.
    ///
    /// The discarded slots are cleared: they carry the toggle parity the
    /// engine currently accepts, so a shorter follow-up batch would
    /// otherwise leave them reachable past its own last descriptor.
    /// Stale sentinels need no repair; every crossing rewrites the
    /// sentinel before exposing it.
    pub(crate) fn restore(&mut self, checkpoint: BatchCheckpoint) {
        let discarded = self
            .cursor
            .written()
            .wrapping_sub(checkpoint.cursor.written());
        self.clear_slots(checkpoint.cursor, discarded);
        self.cursor = checkpoint.cursor;
        self.next_packet_id = checkpoint.next_packet_id;
        self.last_packet_id = checkpoint.last_packet_id;
    }

    /// Scrub a finished batch's descriptors without moving the cursor.
    ///
    /// Called once the batch's completions are drained. Headers left in
    /// place come back around with the accepted parity after a full lap
    /// of an even-length buffer chain, so consumed slots are cleared as
    /// soon as the engine is past them.
    pub(crate) fn retire_batch(&mut self, from: BatchCheckpoint) {
        let consumed = self.cursor.written().wrapping_sub(from.cursor.written());
        self.clear_slots(from.cursor, consumed);
    }

    /// Zero `count` data slots starting at `from`, skipping sentinels.
    fn clear_slots(&mut self, from: RingCursor, count: u32) {
        let bufs = from.buffer_count();
        let (mut buf, mut slot) = from.position();
        for _ in 0..count {
            self.arena.write_slot(buf, slot, &crate::descriptor::BdSlot::EMPTY);
            slot += 1;
            if slot == SLOTS - 1 {
                slot = 0;
                buf = (buf + 1) % bufs;
            }
        }
    }

    /// Hand out the next wrapping packet id and remember it as the most
    /// recently posted one.
    pub(crate) const fn alloc_packet_id(&mut self) -> u8 {
        let id = self.next_packet_id;
        self.next_packet_id = (self.next_packet_id + 1) % PACKET_ID_MODULUS;
        self.last_packet_id = id;
        id
    }
}

impl<const BUFS: usize, const SLOTS: usize> Default for Ring<BUFS, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
