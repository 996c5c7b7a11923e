//! Per-creator enrichment throttle.
//!
//! A creator is "cool" when it has no record or its record is at least one window
//! old. Checking a cool creator stamps it in the same step, so concurrent events
//! from one creator cannot both win the enrichment slot.
//!
//! Records are held in a `moka` cache capped at `max_entries` and expire after
//! `sweep_multiple` windows, which keeps memory bounded on long runs. At capacity
//! the least recently checked creator is evicted, so a freshly stamped creator is
//! always retained for its window.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use moka::policy::EvictionPolicy;
use std::time::Duration;
use tracing::debug;

pub struct DevThrottleCache {
    records: Cache<String, DateTime<Utc>>,
}

impl DevThrottleCache {
    pub fn new(window: Duration, max_entries: u64, sweep_multiple: u32) -> Self {
        let ttl = (window * sweep_multiple.max(1)).max(Duration::from_secs(1));
        let records = Cache::builder()
            .max_capacity(max_entries.max(1))
            .eviction_policy(EvictionPolicy::lru())
            .time_to_live(ttl)
            .build();
        Self { records }
    }

    /// Reserve the enrichment slot for `creator` if it is cool at `now`.
    pub async fn should_enrich(&self, creator: &str, now: DateTime<Utc>, window: Duration) -> bool {
        let result = self
            .records
            .entry(creator.to_string())
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if !is_cool(*entry.value(), now, window) => Op::Nop,
                    _ => Op::Put(now),
                };
                std::future::ready(op)
            })
            .await;

        let reserved = matches!(result, CompResult::Inserted(_) | CompResult::ReplacedWith(_));
        if !reserved {
            debug!(creator = %creator, "Creator checked within the throttle window");
        }
        reserved
    }

    pub async fn last_checked(&self, creator: &str) -> Option<DateTime<Utc>> {
        self.records.get(creator).await
    }

    /// Approximate number of records held; pending maintenance is flushed first.
    pub async fn len(&self) -> u64 {
        self.records.run_pending_tasks().await;
        self.records.entry_count()
    }
}

fn is_cool(last_checked: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    match (now - last_checked).to_std() {
        Ok(age) => age >= window,
        // stamped in the future relative to `now`
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    fn cache() -> DevThrottleCache {
        DevThrottleCache::new(WINDOW, 1000, 4)
    }

    #[tokio::test]
    async fn test_first_check_reserves() {
        let throttle = cache();
        let now = Utc::now();

        assert!(throttle.should_enrich("Dev1", now, WINDOW).await);
        assert_eq!(throttle.last_checked("Dev1").await, Some(now));
    }

    #[tokio::test]
    async fn test_second_check_inside_window_is_rejected() {
        let throttle = cache();
        let now = Utc::now();

        assert!(throttle.should_enrich("Dev1", now, WINDOW).await);
        let later = now + ChronoDuration::minutes(14);
        assert!(!throttle.should_enrich("Dev1", later, WINDOW).await);
        // rejected checks leave the record untouched
        assert_eq!(throttle.last_checked("Dev1").await, Some(now));
    }

    #[tokio::test]
    async fn test_check_after_window_reserves_again() {
        let throttle = cache();
        let now = Utc::now();

        assert!(throttle.should_enrich("Dev1", now, WINDOW).await);
        let later = now + ChronoDuration::minutes(15);
        assert!(throttle.should_enrich("Dev1", later, WINDOW).await);
        assert_eq!(throttle.last_checked("Dev1").await, Some(later));
    }

    #[tokio::test]
    async fn test_creators_are_independent() {
        let throttle = cache();
        let now = Utc::now();

        assert!(throttle.should_enrich("Dev1", now, WINDOW).await);
        assert!(throttle.should_enrich("Dev2", now, WINDOW).await);
    }

    #[test]
    fn test_future_stamp_is_not_cool() {
        let now = Utc::now();
        assert!(!is_cool(now + ChronoDuration::seconds(5), now, WINDOW));
        assert!(is_cool(now - ChronoDuration::seconds(900), now, WINDOW));
        assert!(!is_cool(now - ChronoDuration::seconds(899), now, WINDOW));
    }

    #[tokio::test]
    async fn test_record_count_is_capped() {
        let throttle = DevThrottleCache::new(WINDOW, 50, 4);
        let now = Utc::now();

        for i in 0..500 {
            throttle.should_enrich(&format!("Dev{}", i), now, WINDOW).await;
        }

        assert!(throttle.len().await <= 50);
    }

    #[tokio::test]
    async fn test_new_creators_stay_throttled_when_full() {
        let throttle = DevThrottleCache::new(WINDOW, 50, 4);
        let now = Utc::now();

        for round in 0..3 {
            let at = now - ChronoDuration::hours(1) + ChronoDuration::minutes(20 * round);
            for i in 0..50 {
                throttle.should_enrich(&format!("Known{}", i), at, WINDOW).await;
            }
        }

        let mut re_enriched = 0;
        for i in 0..100 {
            let creator = format!("New{}", i);
            assert!(throttle.should_enrich(&creator, now, WINDOW).await);
            if throttle
                .should_enrich(&creator, now + ChronoDuration::seconds(1), WINDOW)
                .await
            {
                re_enriched += 1;
            }
        }

        assert_eq!(re_enriched, 0);
        assert!(throttle.len().await <= 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_reserve_once() {
        let throttle = Arc::new(cache());
        let now = Utc::now();
        let mut handles = Vec::new();

        for _ in 0..32 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move {
                throttle.should_enrich("Dev1", now, WINDOW).await
            }));
        }

        let mut reserved = 0;
        for handle in handles {
            if handle.await.unwrap() {
                reserved += 1;
            }
        }
        assert_eq!(reserved, 1);
    }
}
