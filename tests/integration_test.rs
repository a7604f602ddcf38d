//! Integration tests for subnet-allocator
//!
//! These tests drive the allocator end to end against the in-memory inventory.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;
use subnet_allocator::{
    AllocationRecord, Allocator, Error, Inventory, MemoryInventory, Network, RecordStatus, Result,
};

fn net(s: &str) -> Network {
    Network::parse(s).unwrap()
}

fn assert_pairwise_disjoint(networks: &[Network]) {
    for (i, a) in networks.iter().enumerate() {
        for b in &networks[i + 1..] {
            assert!(!a.overlaps(b), "{a} overlaps {b}");
        }
    }
}

#[tokio::test]
async fn test_fifty_fifty_hundred_example() {
    let allocator = Allocator::local("192.168.0.0/24").unwrap();

    // 50 + 2 = 52 addresses -> /26
    assert_eq!(allocator.allocate("a", 50).await.unwrap(), net("192.168.0.0/26"));
    assert_eq!(allocator.allocate("b", 50).await.unwrap(), net("192.168.0.64/26"));
    // 100 + 2 = 102 addresses -> /25, only the upper half is free
    assert_eq!(allocator.allocate("c", 100).await.unwrap(), net("192.168.0.128/25"));

    let before = allocator.allocations().await;
    let err = allocator.allocate("d", 50).await.unwrap_err();
    assert!(matches!(err, Error::Exhausted { .. }), "got {err:?}");
    assert_eq!(allocator.allocations().await, before);
}

#[tokio::test]
async fn test_mixed_sizes_never_overlap() {
    let allocator = Allocator::local("10.20.0.0/20").unwrap();
    let sizes = [1, 500, 6, 30, 1000, 2, 120, 14, 60, 250, 3, 700, 29, 62, 7];
    for (round, hosts) in sizes.iter().cycle().take(120).enumerate() {
        let _ = allocator.allocate(&format!("owner-{round}"), *hosts).await;
        assert_pairwise_disjoint(&allocator.allocations().await);
    }
    let allocations = allocator.allocations().await;
    assert!(allocations.iter().all(|a| allocator.parent().contains(a)));
}

#[tokio::test]
async fn test_allocation_is_deterministic() {
    let sizes = [20u64, 200, 3, 1000, 45, 7, 90, 16];
    let mut runs = Vec::new();
    for _ in 0..2 {
        let allocator = Allocator::local("172.16.0.0/16").unwrap();
        let mut got = Vec::new();
        for (i, hosts) in sizes.iter().enumerate() {
            got.push(allocator.allocate(&format!("c{i}"), *hosts).await.unwrap());
        }
        runs.push(got);
    }
    assert_eq!(runs[0], runs[1]);
}

#[tokio::test]
async fn test_exhaustion_after_capacity_is_used() {
    let allocator = Allocator::local("10.0.0.0/26").unwrap();
    let mut allocated = 0;
    loop {
        match allocator.allocate("filler", 2).await {
            Ok(_) => allocated += 1,
            Err(Error::Exhausted { prefix_len, .. }) => {
                assert_eq!(prefix_len, 30);
                break;
            }
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    assert_eq!(allocated, 16);
    assert!(allocator.free_blocks().await.is_empty());
}

#[tokio::test]
async fn test_free_then_realloc_reuses_range() {
    let allocator = Allocator::local("10.0.0.0/24").unwrap();
    for owner in ["a", "b", "c", "d"] {
        allocator.allocate(owner, 60).await.unwrap();
    }
    allocator.deallocate("10.0.0.128/26").await.unwrap();
    assert_eq!(allocator.allocate("e", 60).await.unwrap(), net("10.0.0.128/26"));

    allocator.deallocate("10.0.0.0/26").await.unwrap();
    assert_eq!(allocator.allocate("f", 25).await.unwrap(), net("10.0.0.0/27"));
    assert_eq!(allocator.allocate("g", 25).await.unwrap(), net("10.0.0.32/27"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocations_never_collide() {
    let allocator = Arc::new(Allocator::local("192.168.0.0/24").unwrap());
    let mut handles = Vec::new();
    for i in 0..16 {
        let allocator = Arc::clone(&allocator);
        handles.push(tokio::spawn(async move {
            allocator.allocate(&format!("tenant-{i}"), 50).await
        }));
    }

    let mut won = Vec::new();
    let mut exhausted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(network) => won.push(network),
            Err(Error::Exhausted { .. }) => exhausted += 1,
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    assert_eq!(won.len(), 4);
    assert_eq!(exhausted, 12);
    assert_pairwise_disjoint(&won);
    assert_eq!(allocator.inventory().records().unwrap().len(), 4);
}

/// Inventory whose writes take a long time.
struct SlowInventory {
    inner: MemoryInventory,
    create_delay: Duration,
    delete_delay: Duration,
}

#[async_trait]
impl Inventory for SlowInventory {
    async fn list_child_networks(&self, parent: &Network) -> Result<Vec<Network>> {
        self.inner.list_child_networks(parent).await
    }

    async fn create_record(
        &self,
        network: &Network,
        owner: &str,
        status: RecordStatus,
    ) -> Result<AllocationRecord> {
        tokio::time::sleep(self.create_delay).await;
        self.inner.create_record(network, owner, status).await
    }

    async fn find_record(&self, cidr: &str) -> Result<Option<AllocationRecord>> {
        self.inner.find_record(cidr).await
    }

    async fn delete_record(&self, id: u64) -> Result<()> {
        tokio::time::sleep(self.delete_delay).await;
        self.inner.delete_record(id).await
    }

    fn search_records<'a>(&'a self, keyword: &'a str) -> BoxStream<'a, Result<AllocationRecord>> {
        self.inner.search_records(keyword)
    }
}

#[tokio::test]
async fn test_cancelled_allocate_leaves_state_unchanged() {
    let inventory = SlowInventory {
        inner: MemoryInventory::new(),
        create_delay: Duration::from_secs(5),
        delete_delay: Duration::ZERO,
    };
    let allocator = Allocator::connect("10.0.0.0/24", inventory).await.unwrap();

    let attempt = tokio::time::timeout(
        Duration::from_millis(20),
        allocator.allocate("impatient", 10),
    )
    .await;
    assert!(attempt.is_err(), "allocate should have been cut short");
    assert!(allocator.allocations().await.is_empty());
    assert!(allocator.inventory().inner.records().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_deallocate_leaves_state_unchanged() {
    let inventory = SlowInventory {
        inner: MemoryInventory::new(),
        create_delay: Duration::ZERO,
        delete_delay: Duration::from_secs(5),
    };
    let allocator = Allocator::connect("10.0.0.0/24", inventory).await.unwrap();
    let block = allocator.allocate("keeper", 10).await.unwrap();

    let attempt = tokio::time::timeout(
        Duration::from_millis(20),
        allocator.deallocate(&block.to_string()),
    )
    .await;
    assert!(attempt.is_err(), "deallocate should have been cut short");
    assert_eq!(allocator.allocations().await, vec![block]);
    assert_eq!(allocator.inventory().inner.records().unwrap().len(), 1);

    // the lock was released with the dropped future
    let again = allocator.allocate("next", 10).await.unwrap();
    assert_eq!(again, net("10.0.0.16/28"));
}
