//! Allocation request and inventory record models.

use super::Network;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix written in front of the owner id in a record description.
pub const OWNER_PREFIX: &str = "Allocated to ";

/// Lifecycle status of a prefix record in the inventory.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Reserved,
    Deprecated,
    Container,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            RecordStatus::Active => "active",
            RecordStatus::Reserved => "reserved",
            RecordStatus::Deprecated => "deprecated",
            RecordStatus::Container => "container",
        };
        f.write_str(s)
    }
}

/// A network record as held by the inventory backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    /// Inventory-assigned identifier, used for deletion.
    pub id: u64,
    /// CIDR string exactly as stored in the inventory.
    pub prefix: String,
    /// Free-text description, `Allocated to <owner>` for our allocations.
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: RecordStatus,
}

impl AllocationRecord {
    /// Parse the stored prefix.
    pub fn network(&self) -> Result<Network> {
        Network::parse(&self.prefix)
    }

    /// Owner id encoded in the description, if this record is one of ours.
    pub fn owner(&self) -> Option<&str> {
        self.description.strip_prefix(OWNER_PREFIX)
    }
}

/// Description stored with a new allocation.
pub fn owner_description(owner: &str) -> String {
    format!("{OWNER_PREFIX}{owner}")
}

/// A single request for address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    pub owner: String,
    pub num_hosts: u64,
}

impl AllocationRequest {
    /// Build a request from raw text fields, as read from tabular input.
    pub fn parse(owner: &str, num_hosts: &str) -> Result<AllocationRequest> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(Error::InvalidRequest("owner id is empty".to_string()));
        }
        let num_hosts = num_hosts.trim();
        let num_hosts: u64 = num_hosts.parse().map_err(|_| {
            Error::InvalidRequest(format!("host count '{num_hosts}' is not a positive integer"))
        })?;
        Ok(AllocationRequest {
            owner: owner.to_string(),
            num_hosts,
        })
    }
}
