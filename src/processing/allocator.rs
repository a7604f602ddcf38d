//! First-fit subnet allocator.
//!
//! The [`Allocator`] owns a parent network and the set of blocks already
//! handed out of it. New blocks are chosen lowest address first among the
//! blocks of the required size that overlap nothing in the set.
//!
//! Allocate and deallocate run under one exclusive lock that also covers the
//! inventory call, so two callers can never commit the same block. The
//! in-memory set is only changed after the inventory confirms, so a failed or
//! cancelled call leaves it untouched.

use super::free_space::free_blocks;
use super::sizing::required_prefix_len;
use crate::error::{Error, Result};
use crate::inventory::{Inventory, MemoryInventory};
use crate::models::{AllocationRecord, Network, RecordStatus};
use futures::stream::BoxStream;
use tokio::sync::RwLock;

/// Lowest-addressed block of `prefix_len` inside `parent` that overlaps none of `allocated`.
///
/// Returns `Ok(None)` when every candidate is taken, including when the
/// requested block is bigger than the parent.
pub fn first_fit(parent: &Network, prefix_len: u8, allocated: &[Network]) -> Result<Option<Network>> {
    if prefix_len < parent.prefix_len() {
        return Ok(None);
    }
    let mut candidates = parent.subnets(prefix_len)?;
    while let Some(candidate) = candidates.next() {
        // Jump over the highest end among the blocks this candidate hits;
        // every candidate before that address overlaps it too.
        let blocking_end = allocated
            .iter()
            .filter(|a| a.overlaps(&candidate))
            .map(|a| a.hi())
            .max();
        match blocking_end {
            None => return Ok(Some(candidate)),
            Some(end) => candidates.skip_past(end),
        }
    }
    Ok(None)
}

/// Allocates non-overlapping child blocks out of a parent network.
pub struct Allocator<I: Inventory> {
    parent: Network,
    inventory: I,
    allocated: RwLock<Vec<Network>>,
}

impl Allocator<MemoryInventory> {
    /// Purely local allocator with an empty in-memory inventory.
    pub fn local(parent: &str) -> Result<Self> {
        let parent = Network::parse(parent)?;
        Ok(Allocator::with_allocations(parent, MemoryInventory::new(), Vec::new()))
    }
}

impl<I: Inventory> Allocator<I> {
    /// Build an allocator seeded from the children the inventory already holds.
    pub async fn connect(parent: &str, inventory: I) -> Result<Self> {
        let parent = Network::parse(parent)?;
        let existing = inventory.list_child_networks(&parent).await?;
        Ok(Allocator::with_allocations(parent, inventory, existing))
    }

    /// Build an allocator from an explicit starting set.
    ///
    /// Blocks outside the parent are dropped. Nested blocks (for example a
    /// container prefix and its children) are all kept, which only makes the
    /// overlap check stricter.
    pub fn with_allocations(parent: Network, inventory: I, existing: Vec<Network>) -> Self {
        let mut allocated: Vec<Network> = Vec::with_capacity(existing.len());
        for network in existing {
            if !parent.contains(&network) {
                log::warn!("Ignoring {network}: not inside parent {parent}");
                continue;
            }
            if allocated.contains(&network) {
                continue;
            }
            if let Some(other) = allocated.iter().find(|a| a.overlaps(&network)) {
                log::warn!("Existing allocation {network} overlaps {other}");
            }
            allocated.push(network);
        }
        log::info!(
            "Allocator for {parent} starts with {} existing allocations",
            allocated.len()
        );
        Allocator {
            parent,
            inventory,
            allocated: RwLock::new(allocated),
        }
    }

    pub fn parent(&self) -> Network {
        self.parent
    }

    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Consistent snapshot of the current allocation set, in allocation order.
    pub async fn allocations(&self) -> Vec<Network> {
        self.allocated.read().await.clone()
    }

    /// Unallocated space of the parent as largest aligned blocks.
    pub async fn free_blocks(&self) -> Vec<Network> {
        let allocated = self.allocated.read().await;
        free_blocks(&self.parent, &allocated)
    }

    /// Reserve the lowest free block that holds `num_hosts` hosts for `owner`.
    ///
    /// The block is recorded in the inventory before it joins the local set.
    pub async fn allocate(&self, owner: &str, num_hosts: u64) -> Result<Network> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(Error::InvalidRequest("owner id is empty".to_string()));
        }
        let prefix_len = required_prefix_len(num_hosts)?;

        let mut allocated = self.allocated.write().await;
        let candidate = first_fit(&self.parent, prefix_len, &allocated)?.ok_or_else(|| {
            log::warn!(
                "No free /{prefix_len} in {} for {owner} ({num_hosts} hosts)",
                self.parent
            );
            Error::Exhausted {
                parent: self.parent,
                prefix_len,
            }
        })?;

        self.inventory
            .create_record(&candidate, owner, RecordStatus::Active)
            .await
            .inspect_err(|e| log::error!("Could not record {candidate} for {owner}: {e}"))?;

        allocated.push(candidate);
        log::info!("Allocated {candidate} to {owner} ({num_hosts} hosts)");
        Ok(candidate)
    }

    /// Release the block recorded under exactly `cidr`.
    ///
    /// `cidr` is parsed and written back in canonical form before the
    /// inventory lookup, so surrounding whitespace is ignored but host bits
    /// must be zero.
    pub async fn deallocate(&self, cidr: &str) -> Result<Network> {
        let network = Network::parse(cidr)?;
        let prefix = network.to_string();

        let mut allocated = self.allocated.write().await;
        let record = self
            .inventory
            .find_record(&prefix)
            .await?
            .ok_or_else(|| Error::NotFound(prefix.clone()))?;

        self.inventory
            .delete_record(record.id)
            .await
            .inspect_err(|e| log::error!("Could not delete {prefix} (id {}): {e}", record.id))?;

        match allocated.iter().position(|a| *a == network) {
            Some(pos) => {
                allocated.remove(pos);
            }
            None => log::warn!("Deallocated {prefix} was not in the local allocation set"),
        }
        log::info!("Deallocated {prefix}");
        Ok(network)
    }

    /// Records whose owner or description matches `keyword`.
    pub fn query<'a>(&'a self, keyword: &'a str) -> BoxStream<'a, Result<AllocationRecord>> {
        self.inventory.search_records(keyword)
    }
}
