//! Domain models for subnet allocation.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`Network`] - canonical IPv4 CIDR block
//! - [`AllocationRecord`] - inventory record for an allocated block
//! - [`AllocationRequest`] - owner plus requested host count

mod network;
mod record;

// Re-export public types
pub use network::{
    block_size, cut_addr, get_cidr_mask, lo_mask, Network, Subnets, MAX_LENGTH,
};
pub use record::{
    owner_description, AllocationRecord, AllocationRequest, RecordStatus, OWNER_PREFIX,
};
