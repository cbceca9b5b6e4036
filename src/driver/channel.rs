//! Channel operations: configure, start, and stop batches.
//!
//! A channel maps one-to-one onto a hardware ring. A batch moves through
//! three phases: configuration stages the caller's requests (split
//! batches are encoded into the arena immediately, compact batches at
//! start), start exposes the descriptors to the engine and blocks until
//! the batch completes locally and, when enabled, until the host
//! write-sync record confirms end-to-end visibility.
//!
//! Every transfer chunk becomes its own packet: one header plus one
//! compact record, or one header plus a host-address/local pair in the
//! split variant. Requests larger than the variant's per-record limit
//! are decomposed into multiple chunks before encoding.

use embedded_hal::delay::DelayNs;

use super::manager::RingManager;
use crate::config::{ActivationMode, CompletionMode, DescriptorFormat, Direction, TransferRequest};
use crate::constants::{
    CMPL_EVENT_TIMEOUT_MS, CMPL_POLL_BUDGET, CMPL_POLL_INTERVAL_US, MAX_BLOCK_LIST_LEN, NUM_RINGS,
    SYNC_TRANSFER_LEN,
};
use crate::descriptor::compact::{CompactBd, CompactChunks};
use crate::descriptor::completion::CompletionPacket;
use crate::descriptor::split::{HostAddrBd, LocalBd, SplitChunks};
use crate::error::{Error, InitError, Result, TransferError, TransferResult};
use crate::hal::{HostMemory, RegisterBus, dma_rmb, dma_wmb};
use crate::hostsync::{self, SyncRecord};
use crate::regs;
use crate::ring::cursor::PacketHeader;
use crate::ring::lifecycle::{self, RingState};
use crate::ring::{BatchCheckpoint, Ring, StagedBatch};
use crate::wait::RingEvents;

impl<B, H, D, const BUFS: usize, const SLOTS: usize> RingManager<B, H, D, BUFS, SLOTS>
where
    B: RegisterBus,
    H: HostMemory,
    D: DelayNs,
{
    // =========================================================================
    // Configure
    // =========================================================================

    /// Stage a batch of transfer requests on `channel`.
    ///
    /// The compact variant accepts exactly one request per batch; the
    /// split variant accepts a block list of up to
    /// [`MAX_BLOCK_LIST_LEN`] requests, encoded into the arena here so
    /// start only has to expose them. A staged or in-flight batch must
    /// finish (or be stopped) before the channel can be reconfigured.
    pub fn configure_channel(
        &mut self,
        channel: usize,
        requests: &[TransferRequest],
    ) -> Result<()> {
        if channel >= NUM_RINGS {
            return Err(Error::Transfer(TransferError::InvalidRequest));
        }
        if !self.rings[channel].is_usable() {
            return Err(Error::Init(InitError::NotReady));
        }
        if self.rings[channel].busy || !matches!(self.rings[channel].staged, StagedBatch::None) {
            return Err(Error::Transfer(TransferError::Busy));
        }

        if requests.is_empty() {
            return Err(Error::Transfer(TransferError::InvalidRequest));
        }
        let config = self.config;
        if matches!(config.format, DescriptorFormat::Compact) && requests.len() > 1 {
            return Err(Error::Transfer(TransferError::Unsupported));
        }
        if requests.len() > MAX_BLOCK_LIST_LEN {
            return Err(Error::Transfer(TransferError::CapacityExceeded));
        }

        let mut packets = 0usize;
        for request in requests {
            if !request.is_valid() {
                return Err(Error::Transfer(TransferError::InvalidRequest));
            }
            packets += chunk_count(config.format, request.len);
        }
        // The whole batch, write-sync packet included, must fit the
        // variant's chained buffers: descriptors are only reclaimed at
        // batch granularity.
        let total_packets = packets + usize::from(config.write_sync_enabled());
        let slots_needed = total_packets * (1 + config.format.bds_per_chunk());
        if slots_needed > config.format.ring_buffers() * (SLOTS - 1) {
            return Err(Error::Transfer(TransferError::CapacityExceeded));
        }

        let sync_enabled = config.write_sync_enabled();
        let ring = &mut self.rings[channel];
        match config.format {
            DescriptorFormat::Compact => {
                ring.staged = StagedBatch::Compact(requests[0]);
            }
            DescriptorFormat::Split => {
                let restore = ring.checkpoint();
                let mut written = 0;
                let last = requests.len() - 1;
                for (i, request) in requests.iter().enumerate() {
                    written += encode_request_packets(
                        ring,
                        config.format,
                        request,
                        i == 0,
                        !sync_enabled && i == last,
                    )?;
                }
                ring.staged = StagedBatch::Split {
                    packets: written,
                    restore,
                };
            }
        }
        Ok(())
    }

    // =========================================================================
    // Start
    // =========================================================================

    /// Run the staged batch on `channel` to completion.
    ///
    /// Blocks through four stages: encode (compact variant), expose
    /// (toggle or doorbell), local completion wait (poll or event), and
    /// the host write-sync handshake when enabled. The completion
    /// callback, if registered, fires after the local completion is
    /// decoded and before write-sync confirmation.
    ///
    /// `events` supplies the ISR-fed completion flags and is required in
    /// interrupt completion mode; poll mode ignores it.
    ///
    /// Whatever the outcome, the channel comes back idle with the
    /// staged batch consumed, its descriptor slots reclaimed, and the
    /// busy flag clear. A batch that fails before activation is unwound
    /// completely; the engine never sees any of its descriptors.
    pub fn start_channel(&mut self, channel: usize, events: Option<&RingEvents>) -> Result<()> {
        if channel >= NUM_RINGS {
            return Err(Error::Transfer(TransferError::InvalidRequest));
        }
        if !self.rings[channel].is_usable() {
            return Err(Error::Init(InitError::NotReady));
        }
        if self.rings[channel].busy {
            return Err(Error::Transfer(TransferError::Busy));
        }
        if matches!(self.rings[channel].staged, StagedBatch::None) {
            return Err(Error::Transfer(TransferError::InvalidRequest));
        }

        // The slot span this batch occupies: split batches were encoded
        // at configure time, compact batches start at the current cursor.
        let span = match self.rings[channel].staged {
            StagedBatch::Split { restore, .. } => restore,
            _ => self.rings[channel].checkpoint(),
        };

        self.rings[channel].busy = true;
        let result = self.run_batch(channel, events, span);

        // Wind down no matter how the batch ended.
        if matches!(self.config.activation, ActivationMode::Toggle) {
            lifecycle::deactivate_ring(&mut self.bus, channel);
        }
        let ring = &mut self.rings[channel];
        // Scrub the batch's descriptors. An even-length buffer chain
        // brings the toggle back to its starting parity after one lap,
        // so a header left behind would be walked again.
        ring.retire_batch(span);
        ring.busy = false;
        ring.staged = StagedBatch::None;
        ring.outstanding = 0;
        ring.state = RingState::Idle;
        if let Err(_e) = &result {
            ring.stats.errors += 1;
            #[cfg(feature = "log")]
            log::warn!("ring {channel} batch failed: {_e}");
        }
        result.map_err(Error::Transfer)
    }

    fn run_batch(
        &mut self,
        channel: usize,
        events: Option<&RingEvents>,
        span: BatchCheckpoint,
    ) -> TransferResult<()> {
        let config = self.config;

        // A failure before the engine sees anything unwinds the encoded
        // packets; from activation onward the slots belong to the engine
        // until the wind-down scrub.
        let (total, sync_wait) = match self.stage_batch(channel) {
            Ok(staged) => staged,
            Err(e) => {
                self.rings[channel].restore(span);
                return Err(e);
            }
        };

        let ring = &mut self.rings[channel];
        ring.outstanding = total;
        ring.stats.batches += 1;
        ring.stats.packets = ring.stats.packets.wrapping_add(total);
        ring.state = RingState::Active;

        // Descriptor fill must be globally visible before the engine is
        // pointed at it.
        dma_wmb();
        match config.activation {
            ActivationMode::Toggle => lifecycle::activate_ring(&mut self.bus, channel),
            ActivationMode::Doorbell => {
                let posted = ring.cursor.take_posted();
                lifecycle::ring_doorbell(&mut self.bus, channel, posted);
            }
        }

        let final_packet = match config.completion {
            CompletionMode::Poll => self.wait_poll(channel)?,
            CompletionMode::Interrupt => self.wait_event(channel, events)?,
        };

        if let Some(callback) = self.callback {
            callback(channel, u32::from(final_packet.status));
        }
        if let Err(e) = final_packet.classify() {
            #[cfg(feature = "log")]
            log::warn!(
                "ring {channel} packet {} failed: status {:#x}, bus_error={}, endpoint_error={}",
                final_packet.packet_id,
                final_packet.status,
                final_packet.bus_error,
                final_packet.endpoint_error,
            );
            return Err(e);
        }

        if let Some((scratch, record)) = sync_wait {
            hostsync::wait_record(&mut self.host, &mut self.delay, scratch, record)?;
        }
        Ok(())
    }

    /// Encode whatever configuration staged, plus the write-sync packet
    /// when enabled. Returns the total packet count and the pending sync
    /// wait.
    fn stage_batch(
        &mut self,
        channel: usize,
    ) -> TransferResult<(u32, Option<(u64, SyncRecord)>)> {
        let config = self.config;
        let sync_enabled = config.write_sync_enabled();

        let ring = &mut self.rings[channel];
        let transfer_packets = match ring.staged {
            StagedBatch::Compact(request) => {
                encode_request_packets(ring, config.format, &request, true, !sync_enabled)?
            }
            StagedBatch::Split { packets, .. } => packets,
            StagedBatch::None => return Err(TransferError::InvalidRequest),
        };

        let mut sync_wait = None;
        if sync_enabled {
            let scratch = match ring.scratch_addr {
                Some(addr) => addr,
                None => {
                    let addr = hostsync::discover_scratch(
                        &mut self.host,
                        config.scratch_discovery_addr,
                        channel,
                    )?;
                    ring.scratch_addr = Some(addr);
                    addr
                }
            };
            let packet_id = ring.alloc_packet_id();
            let record = SyncRecord {
                ring: channel as u8,
                packet_id,
                count: (transfer_packets + 1) as u8,
            };
            ring.sync_payload = record.pack();
            encode_sync_packet(ring, config.format, scratch, packet_id)?;
            sync_wait = Some((scratch, record));
        }

        Ok((transfer_packets + u32::from(sync_enabled), sync_wait))
    }

    fn wait_poll(&mut self, channel: usize) -> TransferResult<CompletionPacket> {
        for _ in 0..CMPL_POLL_BUDGET {
            if let Some(packet) =
                drain_completions(&mut self.bus, &mut self.rings[channel], channel)?
            {
                return Ok(packet);
            }
            self.delay.delay_us(CMPL_POLL_INTERVAL_US);
        }
        Err(TransferError::Timeout)
    }

    fn wait_event(
        &mut self,
        channel: usize,
        events: Option<&RingEvents>,
    ) -> TransferResult<CompletionPacket> {
        let events = events.ok_or(TransferError::Unsupported)?;
        for _ in 0..CMPL_EVENT_TIMEOUT_MS {
            if events.take(channel)
                && let Some(packet) =
                    drain_completions(&mut self.bus, &mut self.rings[channel], channel)?
            {
                return Ok(packet);
            }
            self.delay.delay_ms(1);
        }
        Err(TransferError::Timeout)
    }

    // =========================================================================
    // Stop
    // =========================================================================

    /// Discard the staged batch on `channel`, if any.
    ///
    /// A batch that has been started cannot be aborted mid-flight; the
    /// engine has no safe cancellation point, so a busy channel reports
    /// [`TransferError::Busy`] instead. Stopping a split batch unwinds
    /// the cursor to its pre-encode position.
    pub fn stop_channel(&mut self, channel: usize) -> Result<()> {
        if channel >= NUM_RINGS {
            return Err(Error::Transfer(TransferError::InvalidRequest));
        }
        let ring = &mut self.rings[channel];
        if ring.busy {
            return Err(Error::Transfer(TransferError::Busy));
        }
        if let StagedBatch::Split { restore, .. } = ring.staged {
            ring.restore(restore);
        }
        ring.staged = StagedBatch::None;
        Ok(())
    }
}

// =============================================================================
// Encoding Helpers
// =============================================================================

/// Packets one request decomposes into under `format`.
fn chunk_count(format: DescriptorFormat, len: usize) -> usize {
    match format {
        DescriptorFormat::Compact => CompactChunks::new(len).count(),
        DescriptorFormat::Split => SplitChunks::new(len).count(),
    }
}

/// Encode all packets for one request at the ring's cursor. Returns the
/// number of packets written.
fn encode_request_packets<const BUFS: usize, const SLOTS: usize>(
    ring: &mut Ring<BUFS, SLOTS>,
    format: DescriptorFormat,
    request: &TransferRequest,
    first_in_batch: bool,
    close_batch: bool,
) -> TransferResult<u32> {
    let mut local = request.local_addr;
    let mut host = request.host_addr;
    let mut written = 0u32;

    match format {
        DescriptorFormat::Compact => {
            let plan = CompactChunks::new(request.len);
            let count = plan.count();
            for (i, len) in plan.enumerate() {
                let header = PacketHeader {
                    batch_start: first_in_batch && i == 0,
                    batch_end: close_batch && i == count - 1,
                    packet_id: ring.alloc_packet_id(),
                    host_addr_hi: 0,
                };
                let bd = CompactBd {
                    direction: request.direction,
                    local_addr: local,
                    host_addr: host,
                    len,
                }
                .encode();
                ring.cursor.write_packet(&mut ring.arena, header, &[bd])?;
                local = local.wrapping_add(len as u32);
                host += len as u64;
                written += 1;
            }
        }
        DescriptorFormat::Split => {
            let plan = SplitChunks::new(request.len);
            let count = plan.count();
            for (i, chunk) in plan.enumerate() {
                let header = PacketHeader {
                    batch_start: first_in_batch && i == 0,
                    batch_end: close_batch && i == count - 1,
                    packet_id: ring.alloc_packet_id(),
                    host_addr_hi: (host >> 32) as u32,
                };
                let bds = [
                    HostAddrBd {
                        host_addr_lo: host as u32,
                    }
                    .encode(),
                    LocalBd {
                        direction: request.direction,
                        local_addr: local,
                        len: chunk.len,
                        mega: chunk.mega,
                    }
                    .encode(),
                ];
                ring.cursor.write_packet(&mut ring.arena, header, &bds)?;
                local = local.wrapping_add(chunk.len as u32);
                host += chunk.len as u64;
                written += 1;
            }
        }
    }
    Ok(written)
}

/// Encode the write-sync micro-transfer: a 4-byte card-to-host packet
/// moving the ring's sync payload word into the host scratch word. It
/// always closes the batch.
fn encode_sync_packet<const BUFS: usize, const SLOTS: usize>(
    ring: &mut Ring<BUFS, SLOTS>,
    format: DescriptorFormat,
    scratch_addr: u64,
    packet_id: u8,
) -> TransferResult<()> {
    // Card-local bus addresses are 32 bits wide.
    let local = (&raw const ring.sync_payload) as usize as u32;
    match format {
        DescriptorFormat::Compact => {
            let header = PacketHeader {
                batch_start: false,
                batch_end: true,
                packet_id,
                host_addr_hi: 0,
            };
            let bd = CompactBd {
                direction: Direction::CardToHost,
                local_addr: local,
                host_addr: scratch_addr,
                len: SYNC_TRANSFER_LEN,
            }
            .encode();
            ring.cursor.write_packet(&mut ring.arena, header, &[bd])
        }
        DescriptorFormat::Split => {
            let header = PacketHeader {
                batch_start: false,
                batch_end: true,
                packet_id,
                host_addr_hi: (scratch_addr >> 32) as u32,
            };
            let bds = [
                HostAddrBd {
                    host_addr_lo: scratch_addr as u32,
                }
                .encode(),
                LocalBd {
                    direction: Direction::CardToHost,
                    local_addr: local,
                    len: SYNC_TRANSFER_LEN,
                    mega: false,
                }
                .encode(),
            ];
            ring.cursor.write_packet(&mut ring.arena, header, &bds)
        }
    }
}

// =============================================================================
// Completion Drain
// =============================================================================

/// Drain whatever the engine has completed. Returns the final packet of
/// the batch once everything outstanding is accounted for, or an error
/// completion as soon as one is seen.
///
/// Only the most recent packet of a burst is decoded; older packets in
/// the burst are claimed without inspection. When the batch finishes,
/// the decoded packet must echo the id of the last posted header.
fn drain_completions<B: RegisterBus, const BUFS: usize, const SLOTS: usize>(
    bus: &mut B,
    ring: &mut Ring<BUFS, SLOTS>,
    channel: usize,
) -> TransferResult<Option<CompletionPacket>> {
    let write_ptr = bus.read32(regs::ring_reg(channel, regs::RING_CMPL_WRITE_PTR));
    let Some(latest) = ({
        // Pointer observation must precede the payload read.
        dma_rmb();
        ring.cq.latest(write_ptr)
    }) else {
        return Ok(None);
    };

    let claimed = ring.cq.claim(write_ptr);
    lifecycle::mirror_read_ptr(bus, channel, ring.cq.read_ptr());
    ring.outstanding = ring.outstanding.saturating_sub(claimed);

    // An error completion ends the batch immediately, whatever is still
    // nominally outstanding.
    if latest.classify().is_err() {
        return Ok(Some(latest));
    }
    if ring.outstanding == 0 {
        if latest.packet_id != ring.last_packet_id {
            #[cfg(feature = "log")]
            log::warn!(
                "ring {channel} final completion id mismatch: got {}, want {}",
                latest.packet_id,
                ring.last_packet_id,
            );
            return Err(TransferError::ProtocolViolation);
        }
        return Ok(Some(latest));
    }
    Ok(None)
}
