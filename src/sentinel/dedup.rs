//! Bounded first-sight filter over mint addresses.
//!
//! Eviction is strict FIFO on insertion order: once a mint falls out of the
//! window it is accepted again if the feed redelivers it.

use std::collections::{HashSet, VecDeque};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct SeenWindow {
    order: VecDeque<String>,
    members: HashSet<String>,
}

/// Remembers the last `capacity` mints observed.
#[derive(Debug)]
pub struct DedupCache {
    capacity: usize,
    window: Mutex<SeenWindow>,
}

impl DedupCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: Mutex::new(SeenWindow {
                order: VecDeque::with_capacity(capacity),
                members: HashSet::with_capacity(capacity),
            }),
        }
    }

    /// Record `id` as seen. Returns `true` only for the first sighting inside the window.
    pub async fn observe(&self, id: &str) -> bool {
        let mut window = self.window.lock().await;
        if window.members.contains(id) {
            return false;
        }

        if window.order.len() >= self.capacity {
            if let Some(oldest) = window.order.pop_front() {
                window.members.remove(&oldest);
                debug!("Evicted {} from dedup window", oldest);
            }
        }

        window.order.push_back(id.to_string());
        window.members.insert(id.to_string());
        true
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.window.lock().await.members.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.window.lock().await.order.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_sighting_only() {
        let cache = DedupCache::new(10);

        assert!(cache.observe("Abc").await);
        assert!(!cache.observe("Abc").await);
        assert!(cache.observe("Def").await);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_bounded_fifo_eviction() {
        let cache = DedupCache::new(1000);

        for i in 0..1005 {
            assert!(cache.observe(&format!("mint{}", i)).await);
        }

        assert_eq!(cache.len().await, 1000);
        for i in 0..5 {
            assert!(!cache.contains(&format!("mint{}", i)).await);
        }
        assert!(cache.contains("mint5").await);
        assert!(cache.contains("mint1004").await);
    }

    #[tokio::test]
    async fn test_eviction_ignores_access() {
        let cache = DedupCache::new(2);

        cache.observe("a").await;
        cache.observe("b").await;
        // re-observing "a" does not refresh its position
        assert!(!cache.observe("a").await);
        cache.observe("c").await;

        assert!(!cache.contains("a").await);
        assert!(cache.contains("b").await);
        // evicted ids are accepted again
        assert!(cache.observe("a").await);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let cache = DedupCache::new(0);
        assert_eq!(cache.capacity(), 1);
        assert!(cache.observe("a").await);
        assert!(!cache.observe("a").await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_observers_accept_once() {
        let cache = Arc::new(DedupCache::new(100));
        let mut handles = Vec::new();

        for _ in 0..64 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.observe("Abc").await }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }
}
