//! Sentinel module - launch alerting pipeline.
//!
//! Feed events are deduplicated, filtered with local heuristics, throttled per
//! creator, enriched against the RPC indexer and finally rendered into a chat
//! alert. Shared state (dedup window, creator throttle) is owned by the
//! [`Pipeline`]; the indexer and the chat sink are injected behind traits.

pub mod types;
pub mod config;
pub mod dedup;
pub mod throttle;
pub mod retry;
pub mod rate_limit;
pub mod enrichment;
pub mod qualification;
pub mod classifier;
pub mod message;
pub mod notifier;
pub mod metrics;
pub mod feed;
pub mod pipeline;

// Re-export main public types and the orchestrator
pub use pipeline::Pipeline;
pub use config::SentinelConfig;
pub use types::{
    Alert, Classification, DropReason, EnrichmentResult, Outcome, Rejection, TokenCount,
};

// Re-export components for direct use
pub use classifier::classify;
pub use dedup::DedupCache;
pub use enrichment::{EnrichmentError, EnrichmentSource, RpcEnrichmentClient};
pub use feed::TokenFeed;
pub use message::MessageFormat;
pub use metrics::MetricsCollector;
pub use notifier::{NotificationSink, TelegramNotifier};
pub use qualification::{qualify, QualificationRules};
pub use rate_limit::RpcRateLimiter;
pub use retry::{RetryPolicy, Retryable};
pub use throttle::DevThrottleCache;

use std::sync::Arc;

/// Builder for convenient construction with the reference defaults.
pub struct SentinelBuilder {
    config: SentinelConfig,
}

impl SentinelBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: SentinelConfig::default(),
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: SentinelConfig) -> Self {
        Self { config }
    }

    /// Set the RPC indexer endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.config.rpc_url = rpc_url.into();
        self
    }

    /// Set Telegram credentials.
    pub fn with_telegram(mut self, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        self.config.telegram_token = token.into();
        self.config.chat_id = chat_id.into();
        self
    }

    /// Set dedup window size.
    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.config.dedup_capacity = capacity;
        self
    }

    /// Set creator throttle window in seconds.
    pub fn with_throttle_window(mut self, window_seconds: u64) -> Self {
        self.config.throttle_window_secs = window_seconds;
        self
    }

    /// Set the creator token count above which launches are skipped.
    pub fn with_max_creator_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_creator_tokens = max_tokens;
        self
    }

    /// Set qualification thresholds.
    pub fn with_qualification(mut self, min_buy_percentage: f64, integer_tolerance: f64) -> Self {
        self.config.min_buy_percentage = min_buy_percentage;
        self.config.integer_tolerance = integer_tolerance;
        self
    }

    /// Set retry behaviour for enrichment queries.
    pub fn with_retry(mut self, attempts: usize, delay_ms: u64) -> Self {
        self.config.retry_attempts = attempts;
        self.config.retry_delay_ms = delay_ms;
        self
    }

    /// Set per-attempt request timeout.
    pub fn with_request_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.request_timeout_secs = timeout_seconds;
        self
    }

    /// Set outbound RPC rate limit.
    pub fn with_rate_limit(mut self, requests_per_second: u32) -> Self {
        self.config.rate_limit_requests_per_second = requests_per_second;
        self
    }

    /// Set concurrency and queue sizes.
    pub fn with_workers(mut self, worker_count: usize, queue_capacity: usize) -> Self {
        self.config.worker_count = worker_count;
        self.config.queue_capacity = queue_capacity;
        self
    }

    /// Set display timezone (IANA name).
    pub fn with_display_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.config.display_timezone = timezone.into();
        self
    }

    /// Build the configuration.
    pub fn build_config(self) -> SentinelConfig {
        self.config
    }

    /// Build a pipeline wired to the real indexer client and Telegram.
    pub fn build(self) -> anyhow::Result<Pipeline> {
        self.config.validate()?;
        let rate_limiter = Arc::new(RpcRateLimiter::new(self.config.rate_limit_requests_per_second));
        let enrichment = Arc::new(RpcEnrichmentClient::new(&self.config, rate_limiter)?);
        let sink = Arc::new(TelegramNotifier::new(&self.config)?);
        self.build_with(enrichment, sink)
    }

    /// Build a pipeline around custom collaborators.
    pub fn build_with(
        self,
        enrichment: Arc<dyn EnrichmentSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> anyhow::Result<Pipeline> {
        Pipeline::new(&self.config, enrichment, sink)
    }
}

impl Default for SentinelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
