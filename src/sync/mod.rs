//! Synchronization support for sharing the driver with interrupt
//! handlers.
//!
//! - [`CriticalSectionCell`] - ISR-safe interior mutability
//! - [`SharedRingManager`] - critical-section protected driver handle
//!
//! Both require the `critical-section` feature; the critical-section
//! implementation itself comes from the platform HAL crate.

mod primitives;

pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::{SharedRingManager, SharedRingManagerDefault};
