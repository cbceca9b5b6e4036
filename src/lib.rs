//! PCIe-endpoint DMA Ring Manager driver core.
//!
//! A `no_std`, `no_alloc` driver for a descriptor-ring DMA engine (the
//! "ring manager", RM) sitting behind a PCIe endpoint. The RM moves data
//! between card-local memory and host memory, directed by software-built
//! descriptor rings.
//!
//! # Architecture
//!
//! 1. **Driver Layer** ([`driver`]): the [`RingManager`] handle with
//!    bring-up and per-channel batch operations
//! 2. **Ring Layer** ([`ring`]): descriptor arenas, the toggle-protocol
//!    write cursor, completion queues, and ring lifecycle
//! 3. **Descriptor Layer** ([`descriptor`]): wire codecs for both
//!    descriptor variants and the completion packet
//! 4. **HAL Layer** ([`hal`]): register and host-memory access traits
//!    supplied by the platform
//!
//! # Descriptor Variants
//!
//! The RM speaks two wire formats, selected once at bring-up: a compact
//! variant carrying one packed record per chunk, and a split variant
//! carrying separate host-address and local records per chunk (with
//! two-tier chunk sizing for large transfers).
//!
//! # Features
//!
//! - `defmt`: defmt formatting for error and status types
//! - `log`: diagnostics through the `log` facade
//! - `critical-section`: ISR-safe [`SharedRingManager`] wrapper
//!
//! # Example
//!
//! ```ignore
//! use rm_ring_dma::{MmioBus, RingManagerDefault, RmConfig, TransferRequest, Direction};
//!
//! let bus = unsafe { MmioBus::new(RM_BASE) };
//! let mut rm = RingManagerDefault::new(bus, ep_dma, delay);
//!
//! rm.init(RmConfig::new().with_scratch_discovery(SCRATCH_TABLE))?;
//!
//! let req = TransferRequest::new(Direction::HostToCard, 0x8000_0000, host_buf, 64 * 1024);
//! rm.configure_channel(0, &[req])?;
//! rm.start_channel(0, None)?;
//! ```
//!
//! # Memory Requirements
//!
//! Descriptor arenas and completion queues live inside [`RingManager`];
//! with the default geometry (9 buffers of 256 slots per ring, 4 rings)
//! the handle needs roughly 180 KB of DMA-visible memory and must be
//! statically allocated.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// =============================================================================
// Modules
// =============================================================================

pub mod config;
pub mod constants;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod hal;
pub mod hostsync;
pub mod regs;
pub mod ring;
pub mod wait;

#[cfg(feature = "critical-section")]
pub mod sync;

// Test doubles (only available during testing)
#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{
    ActivationMode, CompletionCallback, CompletionMode, DescriptorFormat, Direction, RmConfig,
    TransferRequest,
};
pub use driver::{RingManager, RingManagerDefault};
pub use error::{Error, InitError, InitResult, Result, TransferError, TransferResult};
pub use hal::{HostMemError, HostMemory, MmioBus, RegisterBus};
pub use ring::RingStats;
pub use ring::lifecycle::RingState;
pub use wait::RingEvents;

#[cfg(feature = "critical-section")]
pub use sync::{CriticalSectionCell, SharedRingManager, SharedRingManagerDefault};
