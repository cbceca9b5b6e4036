//! Test doubles for host-side testing.
//!
//! [`RmModel`] is a behavioral model of the ring manager engine wired
//! behind a [`MockRegisterBus`]. On activation or doorbell writes it
//! walks the descriptor memory the driver programmed (the arenas live
//! in ordinary test memory, so the programmed base addresses are real
//! pointers), performs the toggle checks a real engine performs, emits
//! completion packets into the completion area, and services write-sync
//! micro-transfers by landing the expected record in the mock host
//! memory. Fault knobs let tests stall the engine or fail completions.

extern crate std;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::config::Direction;
use crate::constants::{BD_SIZE, CMPL_RING_DEPTH, NUM_RINGS, SYNC_SIGNATURE, SYNC_TRANSFER_LEN};
use crate::descriptor::compact::CompactBd;
use crate::descriptor::completion::CompletionPacket;
use crate::descriptor::header::HeaderBd;
use crate::descriptor::split::{HostAddrBd, LocalBd};
use crate::descriptor::{BdSlot, NextPtrBd, tag};
use crate::hal::{HostMemError, HostMemory, RegisterBus};
use crate::regs;
use crate::wait::RingEvents;

/// Host address of the mock scratch pointer table.
pub(crate) const DISCOVERY_ADDR: u64 = 0x1_0000;

/// Mock scratch word address for `ring`.
pub(crate) fn scratch_addr(ring: usize) -> u64 {
    0x5_0000 + ring as u64 * 0x100
}

// =============================================================================
// Engine Model
// =============================================================================

/// Behavioral model of the ring manager engine.
pub(crate) struct RmModel {
    regs: Vec<u32>,
    /// Toggle parity the engine expects at its current position
    expected_toggle: [u8; NUM_RINGS],
    /// Engine read position in descriptor memory; zero until latched
    /// from the programmed base at first activation
    walk_ptr: [u64; NUM_RINGS],
    /// Headers consumed since the last batch-start flag
    batch_packets: [u32; NUM_RINGS],
    /// Scratch word addresses, mirroring the published pointer table
    pub scratch_addrs: [u64; NUM_RINGS],
    host_words: Rc<RefCell<BTreeMap<u64, u32>>>,
    /// Completion events delivered as an ISR would
    pub events: Option<Rc<RingEvents>>,
    /// Status code to stamp on every completion (None = done)
    pub fail_status: Option<u8>,
    /// Packet id to stamp on every completion instead of the consumed
    /// header's own
    pub wrong_completion_id: Option<u8>,
    /// Consume descriptors but emit no completions
    pub suppress_completions: bool,
    /// Rings whose flush never reports done
    pub fail_flush: [bool; NUM_RINGS],
    /// Payload bytes consumed per ring
    pub bytes_moved: [u64; NUM_RINGS],
    /// Split local records seen, as (length, mega) pairs
    pub chunks_seen: Vec<(usize, bool)>,
    /// Last doorbell count written per ring
    pub last_doorbell: [u32; NUM_RINGS],
}

impl RmModel {
    pub fn new(host_words: Rc<RefCell<BTreeMap<u64, u32>>>) -> Self {
        let mut scratch_addrs = [0u64; NUM_RINGS];
        for (ring, slot) in scratch_addrs.iter_mut().enumerate() {
            *slot = scratch_addr(ring);
        }
        Self {
            regs: std::vec![0; 0x200],
            expected_toggle: [0; NUM_RINGS],
            walk_ptr: [0; NUM_RINGS],
            batch_packets: [0; NUM_RINGS],
            scratch_addrs,
            host_words,
            events: None,
            fail_status: None,
            wrong_completion_id: None,
            suppress_completions: false,
            fail_flush: [false; NUM_RINGS],
            bytes_moved: [0; NUM_RINGS],
            chunks_seen: Vec::new(),
            last_doorbell: [0; NUM_RINGS],
        }
    }

    pub fn reg(&self, offset: u32) -> u32 {
        self.regs[(offset / 4) as usize]
    }

    fn read_reg(&mut self, offset: u32) -> u32 {
        if offset == regs::GLOBAL_STATUS {
            return regs::GLOBAL_STATUS_READY;
        }
        for ring in 0..NUM_RINGS {
            if offset == regs::ring_reg(ring, regs::RING_STATUS) {
                return if self.fail_flush[ring] {
                    0
                } else {
                    regs::RING_STATUS_FLUSH_DONE | regs::RING_STATUS_READY
                };
            }
        }
        self.reg(offset)
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        let idx = (offset / 4) as usize;
        let old = self.regs[idx];
        self.regs[idx] = value;

        for ring in 0..NUM_RINGS {
            if offset == regs::ring_reg(ring, regs::RING_CTRL) {
                let rising = value & regs::RING_CTRL_ACTIVATE != 0
                    && old & regs::RING_CTRL_ACTIVATE == 0;
                if rising {
                    self.service(ring);
                }
            } else if offset == regs::ring_reg(ring, regs::RING_DOORBELL) {
                self.last_doorbell[ring] = value;
                self.service(ring);
            }
        }
    }

    /// Consume everything valid at the engine's current position.
    fn service(&mut self, ring: usize) {
        if self.walk_ptr[ring] == 0 {
            let lo = self.reg(regs::ring_reg(ring, regs::RING_DESC_BASE_LO)) as u64;
            let hi = self.reg(regs::ring_reg(ring, regs::RING_DESC_BASE_HI)) as u64;
            self.walk_ptr[ring] = lo | (hi << 32);
            if self.walk_ptr[ring] == 0 {
                return;
            }
        }

        loop {
            let slot = read_descriptor(self.walk_ptr[ring]);
            match slot.tag() {
                tag::NEXT_PTR => {
                    let sentinel = NextPtrBd::decode(&slot).unwrap();
                    self.expected_toggle[ring] = sentinel.toggle;
                    self.walk_ptr[ring] = sentinel.target;
                }
                tag::HEADER => {
                    let header = HeaderBd::decode(&slot).unwrap();
                    // Wrong parity means the slot is not valid yet; the
                    // engine parks here until it becomes so.
                    if header.toggle != self.expected_toggle[ring] {
                        return;
                    }
                    self.walk_ptr[ring] += BD_SIZE as u64;
                    let bds = self.collect_bds(ring, header.bd_count as usize);
                    if header.batch_start {
                        self.batch_packets[ring] = 0;
                    }
                    self.batch_packets[ring] += 1;
                    self.execute(ring, &header, &bds);
                    if !self.suppress_completions {
                        self.complete(ring, header.packet_id);
                    }
                }
                // Nothing further posted.
                _ => return,
            }
        }
    }

    fn collect_bds(&mut self, ring: usize, count: usize) -> Vec<BdSlot> {
        let mut bds = Vec::with_capacity(count);
        while bds.len() < count {
            let slot = read_descriptor(self.walk_ptr[ring]);
            if slot.tag() == tag::NEXT_PTR {
                let sentinel = NextPtrBd::decode(&slot).unwrap();
                self.expected_toggle[ring] = sentinel.toggle;
                self.walk_ptr[ring] = sentinel.target;
                continue;
            }
            bds.push(slot);
            self.walk_ptr[ring] += BD_SIZE as u64;
        }
        bds
    }

    /// Perform one packet's transfer, as far as the tests need it:
    /// account the bytes, record split chunk shapes, and service
    /// write-sync micro-transfers against the mock host memory.
    fn execute(&mut self, ring: usize, header: &HeaderBd, bds: &[BdSlot]) {
        let (direction, host_addr, len) = match bds {
            [only] => {
                let bd = CompactBd::decode(only).expect("compact record");
                (bd.direction, bd.host_addr, bd.len)
            }
            [host, local] => {
                let host = HostAddrBd::decode(host).expect("host-address record");
                let local = LocalBd::decode(local).expect("local record");
                self.chunks_seen.push((local.len, local.mega));
                let addr = host.host_addr_lo as u64 | ((header.host_addr_hi as u64) << 32);
                (local.direction, addr, local.len)
            }
            _ => panic!("unexpected bd count {}", bds.len()),
        };
        self.bytes_moved[ring] += len as u64;

        let is_sync = matches!(direction, Direction::CardToHost)
            && len == SYNC_TRANSFER_LEN
            && host_addr == self.scratch_addrs[ring];
        if is_sync {
            let record = SYNC_SIGNATURE as u32
                | ((ring as u32) << 16)
                | ((header.packet_id as u32) << 19)
                | ((self.batch_packets[ring] & 0xFF) << 24);
            self.host_words.borrow_mut().insert(host_addr, record);
        }
    }

    fn complete(&mut self, ring: usize, packet_id: u8) {
        let lo = self.reg(regs::ring_reg(ring, regs::RING_CMPL_BASE_LO)) as u64;
        let hi = self.reg(regs::ring_reg(ring, regs::RING_CMPL_BASE_HI)) as u64;
        let base = lo | (hi << 32);

        let wp_reg = regs::ring_reg(ring, regs::RING_CMPL_WRITE_PTR);
        let write_ptr = self.reg(wp_reg);
        let words = CompletionPacket {
            packet_id: self.wrong_completion_id.unwrap_or(packet_id),
            engine: 1,
            bus_error: false,
            endpoint_error: false,
            status: self.fail_status.unwrap_or(0),
        }
        .encode();

        let slot = base + (write_ptr as usize % CMPL_RING_DEPTH) as u64 * 8;
        // SAFETY: base is the address of a live completion queue in test
        // memory, programmed by the driver under test.
        unsafe { core::ptr::write_volatile(slot as usize as *mut [u32; 2], words) };
        self.regs[(wp_reg / 4) as usize] = write_ptr.wrapping_add(1);

        if let Some(events) = &self.events {
            events.notify(ring);
        }
    }
}

fn read_descriptor(addr: u64) -> BdSlot {
    // SAFETY: addr comes from a descriptor base the driver under test
    // programmed, which is live test memory.
    unsafe { core::ptr::read_volatile(addr as usize as *const BdSlot) }
}

// =============================================================================
// Bus and Host Mocks
// =============================================================================

/// Register bus backed by the engine model.
pub(crate) struct MockRegisterBus {
    pub model: Rc<RefCell<RmModel>>,
}

impl RegisterBus for MockRegisterBus {
    fn read32(&mut self, offset: u32) -> u32 {
        self.model.borrow_mut().read_reg(offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        self.model.borrow_mut().write_reg(offset, value);
    }
}

/// Host memory backed by a word map shared with the engine model.
pub(crate) struct MockHostMemory {
    pub words: Rc<RefCell<BTreeMap<u64, u32>>>,
    pub fail: bool,
}

impl HostMemory for MockHostMemory {
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
        let lo = self.read32(addr)? as u64;
        let hi = self.read32(addr + 4)? as u64;
        Ok(lo | (hi << 32))
    }
}

/// Delay source that returns immediately.
pub(crate) struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// =============================================================================
// Harness
// =============================================================================

use std::boxed::Box;

use crate::driver::{RingManager, RingManagerDefault};

/// A driver wired to the engine model, plus handles into the model and
/// the mock host memory.
pub(crate) struct Harness {
    pub rm: Box<RingManagerDefault<MockRegisterBus, MockHostMemory, NoopDelay>>,
    pub model: Rc<RefCell<RmModel>>,
    pub host_words: Rc<RefCell<BTreeMap<u64, u32>>>,
}

/// Build an uninitialized harness with the scratch pointer table
/// published in mock host memory.
pub(crate) fn harness() -> Harness {
    let host_words: Rc<RefCell<BTreeMap<u64, u32>>> = Rc::new(RefCell::new(BTreeMap::new()));
    for ring in 0..NUM_RINGS {
        let addr = scratch_addr(ring);
        let entry = DISCOVERY_ADDR + ring as u64 * 8;
        host_words.borrow_mut().insert(entry, addr as u32);
        host_words.borrow_mut().insert(entry + 4, (addr >> 32) as u32);
    }

    let model = Rc::new(RefCell::new(RmModel::new(host_words.clone())));
    let bus = MockRegisterBus {
        model: model.clone(),
    };
    let host = MockHostMemory {
        words: host_words.clone(),
        fail: false,
    };
    Harness {
        rm: Box::new(RingManager::new(bus, host, NoopDelay)),
        model,
        host_words,
    }
}
