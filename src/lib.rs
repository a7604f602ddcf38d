//! Non-overlapping IPv4 subnet allocation out of a parent block.
//!
//! The [`Allocator`] picks the lowest-addressed free block large enough for a
//! host count and records it in an [`Inventory`]. See [`commands`] for the
//! operations exposed to the command line.

pub mod commands;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod output;
pub mod processing;

pub use config::{InventoryConfig, RetryPolicy};
pub use error::{Error, Result};
pub use inventory::{Inventory, MemoryInventory, NetboxInventory};
pub use models::{AllocationRecord, AllocationRequest, Network, RecordStatus};
pub use processing::{allocate_batch, required_prefix_len, Allocator};
