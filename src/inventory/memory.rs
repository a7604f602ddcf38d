//! In-process inventory.
//!
//! Backs the purely local allocator (batch mode) and the test suite.

use super::Inventory;
use crate::error::{Error, Result};
use crate::models::{owner_description, AllocationRecord, Network, RecordStatus};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Records {
    next_id: u64,
    records: Vec<AllocationRecord>,
}

/// Inventory kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    state: Mutex<Records>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record, in insertion order.
    pub fn records(&self) -> Result<Vec<AllocationRecord>> {
        Ok(self.lock()?.records.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Records>> {
        self.state.lock().map_err(|_| Error::Persistence {
            operation: "lock",
            status: None,
            message: "memory inventory poisoned by a panicked writer".to_string(),
        })
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn list_child_networks(&self, parent: &Network) -> Result<Vec<Network>> {
        let state = self.lock()?;
        let mut children = Vec::new();
        for record in &state.records {
            let network = record.network()?;
            if network != *parent && parent.contains(&network) {
                children.push(network);
            }
        }
        Ok(children)
    }

    async fn create_record(
        &self,
        network: &Network,
        owner: &str,
        status: RecordStatus,
    ) -> Result<AllocationRecord> {
        let mut state = self.lock()?;
        let prefix = network.to_string();
        if state.records.iter().any(|r| r.prefix == prefix) {
            return Err(Error::Persistence {
                operation: "create",
                status: None,
                message: format!("duplicate prefix {prefix}"),
            });
        }
        state.next_id += 1;
        let record = AllocationRecord {
            id: state.next_id,
            prefix,
            description: owner_description(owner),
            status,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn find_record(&self, cidr: &str) -> Result<Option<AllocationRecord>> {
        let state = self.lock()?;
        Ok(state.records.iter().find(|r| r.prefix == cidr).cloned())
    }

    async fn delete_record(&self, id: u64) -> Result<()> {
        let mut state = self.lock()?;
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(Error::Persistence {
                operation: "delete",
                status: None,
                message: format!("record {id} does not exist"),
            });
        }
        Ok(())
    }

    fn search_records<'a>(&'a self, keyword: &'a str) -> BoxStream<'a, Result<AllocationRecord>> {
        let needle = keyword.to_lowercase();
        let matches: Vec<Result<AllocationRecord>> = match self.lock() {
            Ok(state) => state
                .records
                .iter()
                .filter(|r| {
                    r.prefix.to_lowercase().contains(&needle)
                        || r.description.to_lowercase().contains(&needle)
                })
                .cloned()
                .map(Ok)
                .collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(matches).boxed()
    }
}
