//! In-process counters for the alerting pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub const EVENTS_RECEIVED: &str = "events_received_total";
pub const ENRICHMENT_CALLS: &str = "enrichment_calls_total";
pub const NOTIFICATIONS_SENT: &str = "notifications_sent_total";
pub const NOTIFICATIONS_FAILED: &str = "notifications_failed_total";

/// Counter store shared by every pipeline task.
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    counters: Arc<RwLock<HashMap<String, u64>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.write().await;
        *counters.entry(name.to_string()).or_insert(0) += 1;
    }

    pub async fn get_counter(&self, name: &str) -> u64 {
        self.counters.read().await.get(name).copied().unwrap_or(0)
    }

    pub async fn snapshot(&self) -> HashMap<String, u64> {
        self.counters.read().await.clone()
    }

    /// Log every counter, sorted by name.
    pub async fn log_summary(&self) {
        let snapshot = self.snapshot().await;
        let mut names: Vec<_> = snapshot.keys().collect();
        names.sort();

        info!("Pipeline counters:");
        for name in names {
            info!("  {}: {}", name, snapshot[name]);
        }
    }
}
