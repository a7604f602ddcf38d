//! Gap finding between allocations.
//!
//! Describes the unused space of a parent network as the shortest run of
//! aligned CIDR blocks, lowest address first.

use crate::models::{block_size, lo_mask, Network, MAX_LENGTH};
use std::net::Ipv4Addr;

/// Cover the unallocated part of `parent` with the largest aligned blocks.
///
/// Allocations outside the parent are ignored; overlapping or nested
/// allocations are merged before the walk.
pub fn free_blocks(parent: &Network, allocated: &[Network]) -> Vec<Network> {
    let mut used: Vec<(u64, u64)> = allocated
        .iter()
        .filter(|a| a.overlaps(parent))
        .map(|a| {
            (
                u32::from(a.lo()).max(u32::from(parent.lo())) as u64,
                u32::from(a.hi()).min(u32::from(parent.hi())) as u64,
            )
        })
        .collect();
    used.sort_unstable();

    let mut blocks = Vec::new();
    let mut next_ip = u32::from(parent.lo()) as u64;
    for (lo, hi) in used {
        if lo > next_ip {
            fill_gap(next_ip, lo - 1, &mut blocks);
        }
        next_ip = next_ip.max(hi + 1);
    }
    let end = u32::from(parent.hi()) as u64;
    if next_ip <= end {
        fill_gap(next_ip, end, &mut blocks);
    }
    blocks
}

/// Emit blocks covering the inclusive address range `start..=end`.
fn fill_gap(mut start: u64, end: u64, blocks: &mut Vec<Network>) {
    while start <= end {
        let mask = find_biggest_block(start, end);
        let ip = Ipv4Addr::from(start as u32);
        match Network::new(ip, mask) {
            Ok(block) => blocks.push(block),
            Err(e) => {
                log::error!("gap block {ip}/{mask} is not aligned: {e}");
                return;
            }
        }
        start += block_size(mask);
    }
}

/// Shortest prefix starting at `start` that is aligned and stays within `end`.
///
/// The mask is constrained by:
/// 1. The IP alignment - `start` must be a valid network address for the mask
/// 2. The block must not run past `end`
fn find_biggest_block(start: u64, end: u64) -> u8 {
    let min_mask_for_alignment = lo_mask(Ipv4Addr::from(start as u32));
    let span = end - start + 1;
    let min_mask_for_span = MAX_LENGTH - (u64::BITS - 1 - span.leading_zeros()) as u8;
    min_mask_for_alignment.max(min_mask_for_span)
}
