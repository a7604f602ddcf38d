//! Subnet allocation logic.
//!
//! - [`sizing`] - host count to prefix length
//! - [`allocator`] - first-fit allocation over a parent network
//! - [`free_space`] - unallocated space as aligned blocks
//! - [`batch`] - sequential allocation of many requests

mod allocator;
mod batch;
mod free_space;
mod sizing;

// Re-export public functions
pub use allocator::{first_fit, Allocator};
pub use batch::{allocate_batch, BatchResult, BatchRow, NOT_AVAILABLE};
pub use free_space::free_blocks;
pub use sizing::{required_prefix_len, usable_hosts, RESERVED_ADDRESSES};
