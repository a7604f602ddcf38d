//! Command dispatch.
//!
//! Every user-facing operation is a [`Command`] variant with typed inputs.
//! Executing one yields an [`Outcome`]; rendering is left to the caller.

use crate::error::{Error, Result};
use crate::inventory::Inventory;
use crate::models::{AllocationRecord, Network};
use crate::output::{default_output_file, run_batch_files};
use crate::processing::{Allocator, BatchResult};
use clap::Subcommand;
use futures::TryStreamExt;
use std::path::PathBuf;

/// Default parent network for batch runs.
pub const DEFAULT_BATCH_PARENT: &str = "10.0.0.0/8";

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Allocate a new prefix for an owner
    Allocate {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        hosts: u64,
    },
    /// View allocations matching an owner or keyword
    View {
        #[arg(long)]
        owner: String,
    },
    /// Release an allocated prefix (e.g. 192.168.0.0/23)
    Deallocate {
        #[arg(long)]
        prefix: String,
    },
    /// List unallocated blocks of the parent network
    Free,
    /// Allocate every row of a CSV file from a local pool
    Batch {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_BATCH_PARENT)]
        parent: String,
    },
}

/// Result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allocated { owner: String, network: Network },
    Records { keyword: String, records: Vec<AllocationRecord> },
    Deallocated(Network),
    Free { parent: Network, blocks: Vec<Network> },
    Batch { output: String, results: Vec<BatchResult> },
}

impl Command {
    /// True for commands that work against the remote inventory.
    pub fn needs_inventory(&self) -> bool {
        !matches!(self, Command::Batch { .. })
    }

    /// Run a command that works against an inventory-backed allocator.
    pub async fn execute<I: Inventory>(&self, allocator: &Allocator<I>) -> Result<Outcome> {
        match self {
            Command::Allocate { owner, hosts } => {
                let network = allocator.allocate(owner, *hosts).await?;
                Ok(Outcome::Allocated {
                    owner: owner.clone(),
                    network,
                })
            }
            Command::View { owner } => {
                let records: Vec<AllocationRecord> = allocator.query(owner).try_collect().await?;
                Ok(Outcome::Records {
                    keyword: owner.clone(),
                    records,
                })
            }
            Command::Deallocate { prefix } => {
                let network = allocator.deallocate(prefix).await?;
                Ok(Outcome::Deallocated(network))
            }
            Command::Free => Ok(Outcome::Free {
                parent: allocator.parent(),
                blocks: allocator.free_blocks().await,
            }),
            Command::Batch { .. } => self.execute_local().await,
        }
    }

    /// Run a command that needs no inventory.
    pub async fn execute_local(&self) -> Result<Outcome> {
        match self {
            Command::Batch {
                input,
                output,
                parent,
            } => {
                let output = output
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(default_output_file()));
                let results = run_batch_files(parent, input, &output).await?;
                Ok(Outcome::Batch {
                    output: output.display().to_string(),
                    results,
                })
            }
            other => Err(Error::InvalidRequest(format!(
                "{other:?} needs an inventory-backed allocator"
            ))),
        }
    }
}
