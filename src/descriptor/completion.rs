//! Completion packet decode.
//!
//! Completion packets are produced by hardware only; software reads them
//! and advances past them, never writes them.

use crate::error::{TransferError, TransferResult};

/// Completion status value hardware writes for a finished packet.
pub const STATUS_DONE: u8 = 0x0;
/// Reserved completion status: the engine timed out servicing the packet.
/// Documented as requiring a full device reset to clear reliably.
pub const STATUS_ENGINE_TIMEOUT: u8 = 0xF;

/// Packet id field mask (word 0)
const PKT_ID_MASK: u32 = 0x1F;
/// Servicing-AE field position
const ENGINE_SHIFT: u32 = 5;
/// Servicing-AE field mask
const ENGINE_MASK: u32 = 0x7 << ENGINE_SHIFT;
/// Bus error flag
const BUS_ERROR: u32 = 1 << 8;
/// Endpoint error flag
const ENDPOINT_ERROR: u32 = 1 << 9;
/// Completion status field position
const STATUS_SHIFT: u32 = 12;
/// Completion status field mask
const STATUS_MASK: u32 = 0xF << STATUS_SHIFT;

/// Decoded completion packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompletionPacket {
    /// Packet id echoed from the header that triggered this completion
    pub packet_id: u8,
    /// Acceleration engine that serviced the packet
    pub engine: u8,
    /// Bus error flag from the DMA path
    pub bus_error: bool,
    /// Endpoint error flag from the DMA path
    pub endpoint_error: bool,
    /// Completion/timeout status code
    pub status: u8,
}

impl CompletionPacket {
    /// Decode the two raw words of a completion slot.
    #[must_use]
    pub const fn decode(words: [u32; 2]) -> Self {
        let w0 = words[0];
        Self {
            packet_id: (w0 & PKT_ID_MASK) as u8,
            engine: ((w0 & ENGINE_MASK) >> ENGINE_SHIFT) as u8,
            bus_error: w0 & BUS_ERROR != 0,
            endpoint_error: w0 & ENDPOINT_ERROR != 0,
            status: ((w0 & STATUS_MASK) >> STATUS_SHIFT) as u8,
        }
    }

    /// Encode to raw words. Hardware-side operation, used by the test
    /// model to fabricate completions.
    #[must_use]
    pub const fn encode(&self) -> [u32; 2] {
        let mut w0 = (self.packet_id & 0x1F) as u32;
        w0 |= (((self.engine & 0x7) as u32) << ENGINE_SHIFT) & ENGINE_MASK;
        if self.bus_error {
            w0 |= BUS_ERROR;
        }
        if self.endpoint_error {
            w0 |= ENDPOINT_ERROR;
        }
        w0 |= (((self.status & 0xF) as u32) << STATUS_SHIFT) & STATUS_MASK;
        [w0, 0]
    }

    /// Classify the hardware status of this completion.
    ///
    /// Engine timeout is a protocol violation (distinct from a software
    /// wait timeout); DMA-path error bits are a device error.
    pub const fn classify(&self) -> TransferResult<()> {
        if self.status == STATUS_ENGINE_TIMEOUT {
            return Err(TransferError::ProtocolViolation);
        }
        if self.bus_error || self.endpoint_error {
            return Err(TransferError::DeviceError);
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
