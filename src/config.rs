//! Configuration types for the ring-manager driver.

use crate::constants::{
    COMPACT_RING_BUFFERS, MAX_TRANSFER_LEN, MIN_TRANSFER_LEN, NUM_RINGS, SPLIT_RING_BUFFERS,
    TRANSFER_ALIGN,
};
use crate::error::{InitError, InitResult};

/// Transfer direction, as seen from the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host memory to card-local memory
    #[default]
    HostToCard,
    /// Card-local memory to host memory
    CardToHost,
}

/// Descriptor wire-format variant.
///
/// Selected once at ring-configuration time; the two variants are never
/// mixed within one ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorFormat {
    /// One packed record per transfer combining address and opcode
    #[default]
    Compact,
    /// Separate host-address and local address/length/opcode records,
    /// with the host-address high bits carried in the packet header
    Split,
}

impl DescriptorFormat {
    /// Descriptor buffers a ring uses in this variant.
    #[must_use]
    pub const fn ring_buffers(self) -> usize {
        match self {
            DescriptorFormat::Compact => COMPACT_RING_BUFFERS,
            DescriptorFormat::Split => SPLIT_RING_BUFFERS,
        }
    }

    /// Non-header descriptors per transfer chunk in this variant.
    #[must_use]
    pub const fn bds_per_chunk(self) -> usize {
        match self {
            DescriptorFormat::Compact => 1,
            DescriptorFormat::Split => 2,
        }
    }
}

/// How software exposes new descriptors to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivationMode {
    /// Toggle the ring enable bit around each batch
    #[default]
    Toggle,
    /// Ring stays enabled; write the posted descriptor count to the doorbell
    Doorbell,
}

/// How the driver waits for batch completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompletionMode {
    /// Busy-poll the completion write pointer with a bounded budget
    #[default]
    Poll,
    /// Block on a per-ring completion event signalled from the ISR
    Interrupt,
}

/// One caller-supplied transfer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferRequest {
    /// Transfer direction
    pub direction: Direction,
    /// Card-local bus address
    pub local_addr: u32,
    /// Host memory address
    pub host_addr: u64,
    /// Length in bytes (4 B - 16 MiB, 4-byte aligned)
    pub len: usize,
}

impl TransferRequest {
    /// Create a new transfer request.
    #[must_use]
    pub const fn new(direction: Direction, local_addr: u32, host_addr: u64, len: usize) -> Self {
        Self {
            direction,
            local_addr,
            host_addr,
            len,
        }
    }

    /// Check the caller contract: length range and 4-byte alignment of
    /// length and both addresses.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.len >= MIN_TRANSFER_LEN
            && self.len <= MAX_TRANSFER_LEN
            && self.len % TRANSFER_ALIGN == 0
            && self.local_addr as usize % TRANSFER_ALIGN == 0
            && self.host_addr as usize % TRANSFER_ALIGN == 0
    }
}

/// Callback invoked once a batch's local completion is decoded, before
/// write-sync confirmation. Arguments are `(channel, status)`; status 0
/// means success.
pub type CompletionCallback = fn(channel: usize, status: u32);

/// Driver configuration.
///
/// Built once at bring-up with the `with_*` methods:
///
/// ```ignore
/// let config = RmConfig::new()
///     .with_format(DescriptorFormat::Split)
///     .with_activation(ActivationMode::Doorbell)
///     .with_active_rings(2)
///     .with_scratch_discovery(0x0000_1000_0000_0040);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RmConfig {
    /// Active descriptor wire format
    pub format: DescriptorFormat,
    /// Ring activation scheme
    pub activation: ActivationMode,
    /// Completion wait scheme
    pub completion: CompletionMode,
    /// Number of rings to bring up (1..=4)
    pub active_rings: usize,
    /// Host address holding the per-ring scratch pointer table
    /// (one 64-bit pointer per ring). Zero disables the write-sync
    /// handshake entirely.
    pub scratch_discovery_addr: u64,
    /// Completion-notification threshold programmed at configure time
    pub cmpl_threshold: u32,
    /// Completion-notification timer programmed at configure time
    pub cmpl_timer: u32,
}

impl RmConfig {
    /// Create a configuration with default settings (compact format,
    /// toggle activation, poll completion, all four rings, write-sync
    /// disabled).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            format: DescriptorFormat::Compact,
            activation: ActivationMode::Toggle,
            completion: CompletionMode::Poll,
            active_rings: NUM_RINGS,
            scratch_discovery_addr: 0,
            cmpl_threshold: 1,
            cmpl_timer: 0,
        }
    }

    /// Set the descriptor wire format.
    #[must_use]
    pub const fn with_format(mut self, format: DescriptorFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the activation scheme.
    #[must_use]
    pub const fn with_activation(mut self, activation: ActivationMode) -> Self {
        self.activation = activation;
        self
    }

    /// Set the completion wait scheme.
    #[must_use]
    pub const fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }

    /// Set the number of rings to bring up.
    #[must_use]
    pub const fn with_active_rings(mut self, rings: usize) -> Self {
        self.active_rings = rings;
        self
    }

    /// Set the host address of the scratch pointer table and enable the
    /// write-sync handshake.
    #[must_use]
    pub const fn with_scratch_discovery(mut self, addr: u64) -> Self {
        self.scratch_discovery_addr = addr;
        self
    }

    /// Set the completion-notification threshold.
    #[must_use]
    pub const fn with_cmpl_threshold(mut self, threshold: u32) -> Self {
        self.cmpl_threshold = threshold;
        self
    }

    /// Set the completion-notification timer.
    #[must_use]
    pub const fn with_cmpl_timer(mut self, timer: u32) -> Self {
        self.cmpl_timer = timer;
        self
    }

    /// Whether the write-sync handshake is enabled.
    #[must_use]
    pub const fn write_sync_enabled(&self) -> bool {
        self.scratch_discovery_addr != 0
    }

    /// Validate the configuration.
    pub fn validate(&self) -> InitResult<()> {
        if self.active_rings == 0 || self.active_rings > NUM_RINGS {
            return Err(InitError::InvalidConfig);
        }
        Ok(())
    }
}

impl Default for RmConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
