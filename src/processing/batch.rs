//! Sequential batch allocation.
//!
//! Each input row is handed to [`Allocator::allocate`] in order. A failed row
//! is reported as [`NOT_AVAILABLE`] and processing continues with the next.

use super::Allocator;
use crate::error::Error;
use crate::inventory::Inventory;
use crate::models::AllocationRequest;
use serde::Serialize;

/// Marker written in place of a CIDR when a row could not be allocated.
pub const NOT_AVAILABLE: &str = "NOT AVAILABLE";

/// One input row, kept as raw text so a bad host count fails only its row.
///
/// `unreadable` is set when the record itself could not be decoded; such a
/// row is never allocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    pub customer_name: String,
    pub num_hosts: String,
    pub unreadable: Option<String>,
}

impl BatchRow {
    pub fn new(customer_name: &str, num_hosts: &str) -> Self {
        BatchRow {
            customer_name: customer_name.to_string(),
            num_hosts: num_hosts.to_string(),
            unreadable: None,
        }
    }

    pub fn unreadable(customer_name: &str, num_hosts: &str, reason: String) -> Self {
        BatchRow {
            unreadable: Some(reason),
            ..BatchRow::new(customer_name, num_hosts)
        }
    }
}

/// One output row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BatchResult {
    pub customer_name: String,
    pub num_hosts: String,
    pub allocated_subnet: String,
}

impl BatchResult {
    pub fn is_allocated(&self) -> bool {
        self.allocated_subnet != NOT_AVAILABLE
    }
}

/// Allocate every row in input order, one result per row.
pub async fn allocate_batch<I: Inventory>(
    allocator: &Allocator<I>,
    rows: Vec<BatchRow>,
) -> Vec<BatchResult> {
    let mut results = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        let request = match &row.unreadable {
            Some(reason) => Err(Error::InvalidRequest(reason.clone())),
            None => AllocationRequest::parse(&row.customer_name, &row.num_hosts),
        };
        let outcome = match request {
            Ok(req) => allocator.allocate(&req.owner, req.num_hosts).await,
            Err(e) => Err(e),
        };
        let allocated_subnet = match outcome {
            Ok(network) => network.to_string(),
            Err(e) => {
                log::warn!(
                    "row {}: {} ({} hosts) not allocated [{}]: {e}",
                    i + 1,
                    row.customer_name,
                    row.num_hosts,
                    e.kind()
                );
                NOT_AVAILABLE.to_string()
            }
        };
        results.push(BatchResult {
            customer_name: row.customer_name,
            num_hosts: row.num_hosts,
            allocated_subnet,
        });
    }
    let allocated = results.iter().filter(|r| r.is_allocated()).count();
    log::info!(
        "Batch done: {allocated}/{} rows allocated from {}",
        results.len(),
        allocator.parent()
    );
    results
}
