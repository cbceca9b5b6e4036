//! Host write-sync handshake.
//!
//! Posted PCIe writes give no ordering guarantee the host application
//! can observe, so the last packet of every batch is a 4-byte
//! card-to-host micro-transfer that lands a recognizable record in a
//! per-ring host scratch word. The record travels the same DMA path as
//! the batch payload; once it is visible on the host, everything posted
//! before it is too.
//!
//! The scratch word addresses are published by host software in a small
//! pointer table (one 64-bit entry per ring) at an address agreed out
//! of band. Discovery is lazy and cached per ring.

use embedded_hal::delay::DelayNs;

use crate::constants::{SYNC_POLL_BUDGET, SYNC_POLL_INTERVAL_US, SYNC_SIGNATURE};
use crate::error::{TransferError, TransferResult};
use crate::hal::HostMemory;

/// One write-sync record, packed into the 32-bit scratch word.
///
/// Layout: bits `[15:0]` signature, `[18:16]` ring, `[23:19]` packet id,
/// `[31:24]` packet count modulo 256. The signature is nonzero, so a
/// cleared scratch word can never match a pending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncRecord {
    /// Ring index the batch ran on
    pub ring: u8,
    /// Packet id of the sync packet itself
    pub packet_id: u8,
    /// Total packets in the batch (sync packet included), modulo 256
    pub count: u8,
}

impl SyncRecord {
    /// Pack into the scratch word format.
    #[must_use]
    pub const fn pack(&self) -> u32 {
        SYNC_SIGNATURE as u32
            | (((self.ring & 0x7) as u32) << 16)
            | (((self.packet_id & 0x1F) as u32) << 19)
            | ((self.count as u32) << 24)
    }

    /// Unpack a scratch word; `None` if the signature does not match.
    #[must_use]
    pub const fn unpack(word: u32) -> Option<Self> {
        if word & 0xFFFF != SYNC_SIGNATURE as u32 {
            return None;
        }
        Some(Self {
            ring: ((word >> 16) & 0x7) as u8,
            packet_id: ((word >> 19) & 0x1F) as u8,
            count: (word >> 24) as u8,
        })
    }
}

/// Read ring `ring`'s scratch word address from the host pointer table.
pub fn discover_scratch<H: HostMemory>(
    host: &mut H,
    discovery_addr: u64,
    ring: usize,
) -> TransferResult<u64> {
    host.read64(discovery_addr + (ring as u64) * 8)
        .map_err(|_| TransferError::DeviceError)
}

/// Poll the scratch word until the expected record appears, then clear
/// it for the next batch.
///
/// A budget expiry means the batch completed locally but its data may
/// not yet be host-visible, which is why this reports a distinct error
/// from the completion wait.
pub fn wait_record<H: HostMemory, D: DelayNs>(
    host: &mut H,
    delay: &mut D,
    scratch_addr: u64,
    expected: SyncRecord,
) -> TransferResult<()> {
    let want = expected.pack();
    for _ in 0..SYNC_POLL_BUDGET {
        let word = host
            .read32(scratch_addr)
            .map_err(|_| TransferError::DeviceError)?;
        if word == want {
            host.write32(scratch_addr, 0)
                .map_err(|_| TransferError::DeviceError)?;
            return Ok(());
        }
        delay.delay_us(SYNC_POLL_INTERVAL_US);
    }
    Err(TransferError::SyncTimeout)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use super::*;
    use crate::hal::HostMemError;

    struct MapHost {
        words: Rc<RefCell<BTreeMap<u64, u32>>>,
        fail: bool,
    }

    impl HostMemory for MapHost {
        fn read32(&mut self, addr: u64) -> Result<u32, HostMemError> {
            if self.fail {
                return Err(HostMemError);
            }
            Ok(*self.words.borrow().get(&addr).unwrap_or(&0))
        }
        fn write32(&mut self, addr: u64, value: u32) -> Result<(), HostMemError> {
            if self.fail {
                return Err(HostMemError);
            }
            self.words.borrow_mut().insert(addr, value);
            Ok(())
        }
        fn read64(&mut self, addr: u64) -> Result<u64, HostMemError> {
            if self.fail {
                return Err(HostMemError);
            }
            let lo = self.read32(addr)? as u64;
            let hi = self.read32(addr + 4)? as u64;
            Ok(lo | (hi << 32))
        }
    }

    struct NoDelay;
    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn host_with(words: &[(u64, u32)]) -> MapHost {
        let map: BTreeMap<u64, u32> = words.iter().copied().collect();
        MapHost {
            words: Rc::new(RefCell::new(map)),
            fail: false,
        }
    }

    #[test]
    fn record_round_trip() {
        let record = SyncRecord {
            ring: 2,
            packet_id: 19,
            count: 200,
        };
        assert_eq!(SyncRecord::unpack(record.pack()), Some(record));
    }

    #[test]
    fn record_field_positions() {
        let word = SyncRecord {
            ring: 0x7,
            packet_id: 0x1F,
            count: 0xFF,
        }
        .pack();
        assert_eq!(word & 0xFFFF, SYNC_SIGNATURE as u32);
        assert_eq!((word >> 16) & 0x7, 0x7);
        assert_eq!((word >> 19) & 0x1F, 0x1F);
        assert_eq!(word >> 24, 0xFF);
    }

    #[test]
    fn cleared_word_never_unpacks() {
        assert_eq!(SyncRecord::unpack(0), None);
    }

    #[test]
    fn record_is_never_zero() {
        let word = SyncRecord {
            ring: 0,
            packet_id: 0,
            count: 0,
        }
        .pack();
        assert_ne!(word, 0);
    }

    #[test]
    fn discovery_reads_ring_entry() {
        let mut host = host_with(&[
            (0x1000, 0x5000_0000),
            (0x1004, 0x12),
            (0x1008, 0x6000_0000),
            (0x100C, 0x0),
        ]);
        assert_eq!(discover_scratch(&mut host, 0x1000, 0), Ok(0x0000_0012_5000_0000));
        assert_eq!(discover_scratch(&mut host, 0x1000, 1), Ok(0x6000_0000));
    }

    #[test]
    fn wait_matches_and_clears() {
        let record = SyncRecord {
            ring: 1,
            packet_id: 4,
            count: 7,
        };
        let mut host = host_with(&[(0x5000, record.pack())]);
        assert!(wait_record(&mut host, &mut NoDelay, 0x5000, record).is_ok());
        assert_eq!(host.read32(0x5000), Ok(0));
    }

    #[test]
    fn wait_rejects_wrong_record() {
        let expected = SyncRecord {
            ring: 1,
            packet_id: 4,
            count: 7,
        };
        let stale = SyncRecord {
            packet_id: 3,
            ..expected
        };
        let mut host = host_with(&[(0x5000, stale.pack())]);
        assert_eq!(
            wait_record(&mut host, &mut NoDelay, 0x5000, expected),
            Err(TransferError::SyncTimeout)
        );
        // The stale word is left for postmortem inspection.
        assert_eq!(host.read32(0x5000), Ok(stale.pack()));
    }

    #[test]
    fn wait_times_out_on_clear_word() {
        let record = SyncRecord {
            ring: 0,
            packet_id: 0,
            count: 1,
        };
        let mut host = host_with(&[]);
        assert_eq!(
            wait_record(&mut host, &mut NoDelay, 0x5000, record),
            Err(TransferError::SyncTimeout)
        );
    }

    #[test]
    fn host_fault_is_device_error() {
        let mut host = host_with(&[]);
        host.fail = true;
        let record = SyncRecord {
            ring: 0,
            packet_id: 0,
            count: 1,
        };
        assert_eq!(
            wait_record(&mut host, &mut NoDelay, 0x5000, record),
            Err(TransferError::DeviceError)
        );
        assert_eq!(
            discover_scratch(&mut host, 0x1000, 0),
            Err(TransferError::DeviceError)
        );
    }
}
