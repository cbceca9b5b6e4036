//! Driver surface: the ring manager device handle and its channel
//! operations.

mod channel;
mod manager;

pub use manager::{RingManager, RingManagerDefault};
