//! Inventory backends holding the system of record for allocations.
//!
//! The allocator only talks to an inventory through the [`Inventory`] trait:
//! - [`memory`] - in-process store for local allocation and tests
//! - [`netbox`] - REST client for a NetBox-style IPAM

mod memory;
mod netbox;

use crate::error::Result;
use crate::models::{AllocationRecord, Network, RecordStatus};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub use memory::MemoryInventory;
pub use netbox::NetboxInventory;

/// Operations the allocator needs from a system of record.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Networks already recorded inside `parent` (excluding `parent` itself).
    async fn list_child_networks(&self, parent: &Network) -> Result<Vec<Network>>;

    /// Persist a new allocation.
    async fn create_record(
        &self,
        network: &Network,
        owner: &str,
        status: RecordStatus,
    ) -> Result<AllocationRecord>;

    /// Look up a record by its exact CIDR string.
    async fn find_record(&self, cidr: &str) -> Result<Option<AllocationRecord>>;

    async fn delete_record(&self, id: u64) -> Result<()>;

    /// Lazily stream records whose owner or description matches `keyword`.
    ///
    /// Every call starts a fresh search; an empty stream means no match.
    fn search_records<'a>(&'a self, keyword: &'a str) -> BoxStream<'a, Result<AllocationRecord>>;
}
