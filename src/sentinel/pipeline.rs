//! Alert pipeline orchestrator.
//!
//! Each raw feed object moves through
//! `Received → Deduped → Qualified → ThrottleChecked → Enriching → Classified → Notified`
//! and may leave early as `Dropped` at any gate. Decoding and dedup run serially in
//! the dispatcher; everything after that runs in a bounded set of concurrent tasks
//! so one slow enrichment never holds up unrelated launches.

use crate::sentinel::config::SentinelConfig;
use crate::sentinel::dedup::DedupCache;
use crate::sentinel::enrichment::EnrichmentSource;
use crate::sentinel::message::MessageFormat;
use crate::sentinel::metrics::{
    MetricsCollector, ENRICHMENT_CALLS, EVENTS_RECEIVED, NOTIFICATIONS_FAILED, NOTIFICATIONS_SENT,
};
use crate::sentinel::notifier::NotificationSink;
use crate::sentinel::qualification::{qualify, QualificationRules};
use crate::sentinel::throttle::DevThrottleCache;
use crate::sentinel::types::{Alert, DropReason, EnrichmentResult, Outcome, TokenCount};
use crate::types::TokenEvent;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

pub struct Pipeline {
    dedup: DedupCache,
    throttle: DevThrottleCache,
    rules: QualificationRules,
    throttle_window: Duration,
    max_creator_tokens: u32,
    worker_count: usize,
    format: MessageFormat,
    enrichment: Arc<dyn EnrichmentSource>,
    sink: Arc<dyn NotificationSink>,
    metrics: MetricsCollector,
}

impl Pipeline {
    pub fn new(
        config: &SentinelConfig,
        enrichment: Arc<dyn EnrichmentSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        Ok(Self {
            dedup: DedupCache::new(config.dedup_capacity),
            throttle: DevThrottleCache::new(
                config.throttle_window(),
                config.throttle_max_entries,
                config.throttle_sweep_multiple,
            ),
            rules: QualificationRules::from(config),
            throttle_window: config.throttle_window(),
            max_creator_tokens: config.max_creator_tokens,
            worker_count: config.worker_count.max(1),
            format: MessageFormat::from_config(config)?,
            enrichment,
            sink,
            metrics: MetricsCollector::new(),
        })
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Decode a raw feed object and claim its mint (`Received` and `Deduped`).
    pub async fn admit(&self, raw: &Value) -> Result<TokenEvent, DropReason> {
        self.metrics.increment_counter(EVENTS_RECEIVED).await;

        let Some(event) = TokenEvent::from_value(raw) else {
            return Err(self.record_drop("<none>", DropReason::Malformed).await);
        };

        if !self.dedup.observe(&event.mint).await {
            return Err(self.record_drop(&event.mint, DropReason::Duplicate).await);
        }

        Ok(event)
    }

    /// Run an admitted event through qualification, throttling, enrichment and delivery.
    #[instrument(skip(self, event), fields(mint = %event.mint, creator = %event.creator))]
    pub async fn complete(&self, event: TokenEvent, now: DateTime<Utc>) -> Outcome {
        let initial_buy_percentage = match qualify(&event, &self.rules) {
            Ok(percentage) => percentage,
            Err(rejection) => {
                return self
                    .dropped(&event.mint, DropReason::NotQualified(rejection))
                    .await
            }
        };

        if !self
            .throttle
            .should_enrich(&event.creator, now, self.throttle_window)
            .await
        {
            return self.dropped(&event.mint, DropReason::Throttled).await;
        }

        self.metrics.increment_counter(ENRICHMENT_CALLS).await;
        let token_count = self.enrichment.creator_asset_count(&event.creator).await;
        match token_count {
            TokenCount::LookupFailed => {
                return self
                    .dropped(&event.mint, DropReason::CreatorLookupFailed)
                    .await
            }
            TokenCount::Counted(count) if token_count.exceeds(self.max_creator_tokens) => {
                return self
                    .dropped(&event.mint, DropReason::SerialDeployer { count })
                    .await
            }
            TokenCount::Counted(_) => {}
        }

        let enrichment = EnrichmentResult {
            creator_token_count: token_count,
            creator_oldest_tx_time: self.enrichment.creator_oldest_tx_time(&event.creator).await,
        };
        let alert = Alert::from_enrichment(event, now, initial_buy_percentage, &enrichment);

        match self.sink.send(&alert.render(&self.format)).await {
            Ok(()) => {
                self.metrics.increment_counter(NOTIFICATIONS_SENT).await;
                info!("Alert sent for {} ({})", alert.name, alert.symbol);
                Outcome::Notified(alert)
            }
            Err(e) => {
                self.metrics.increment_counter(NOTIFICATIONS_FAILED).await;
                error!("Failed to deliver alert for {}: {:#}", alert.mint, e);
                Outcome::DeliveryFailed(alert)
            }
        }
    }

    /// Process one raw event end to end, treating `now` as its creation time.
    pub async fn process_at(&self, raw: &Value, now: DateTime<Utc>) -> Outcome {
        match self.admit(raw).await {
            Ok(event) => self.complete(event, now).await,
            Err(reason) => Outcome::Dropped(reason),
        }
    }

    pub async fn process(&self, raw: &Value) -> Outcome {
        self.process_at(raw, Utc::now()).await
    }

    /// Consume events until the channel closes (in-flight work is joined) or
    /// shutdown is signalled (in-flight work is abandoned).
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<Value>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Alert pipeline running with {} workers", self.worker_count);

        let permits = Arc::new(Semaphore::new(self.worker_count));
        let mut in_flight: JoinSet<()> = JoinSet::new();
        let mut cancelled = false;

        loop {
            let raw = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => {
                    cancelled = true;
                    break;
                }
                raw = events.recv() => match raw {
                    Some(raw) => raw,
                    None => break,
                },
            };

            let event = match self.admit(&raw).await {
                Ok(event) => event,
                Err(_) => continue,
            };
            let now = Utc::now();

            // blocks the dispatcher while every worker is busy
            let permit = tokio::select! {
                _ = shutdown_requested(&mut shutdown) => {
                    cancelled = true;
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let pipeline = self.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                pipeline.complete(event, now).await;
            });

            while let Some(finished) = in_flight.try_join_next() {
                log_task_result(finished);
            }
        }

        if cancelled {
            warn!("Shutdown requested, abandoning {} in-flight events", in_flight.len());
            in_flight.abort_all();
        } else {
            debug!("Event channel closed, waiting for {} in-flight events", in_flight.len());
        }

        while let Some(finished) = in_flight.join_next().await {
            log_task_result(finished);
        }

        info!("Alert pipeline stopped");
    }

    async fn record_drop(&self, mint: &str, reason: DropReason) -> DropReason {
        self.metrics.increment_counter(reason.metric_name()).await;
        match &reason {
            DropReason::NotQualified(rejection) => debug!("Skipping {}: {}", mint, rejection),
            other => debug!("Dropping {}: {:?}", mint, other),
        }
        reason
    }

    async fn dropped(&self, mint: &str, reason: DropReason) -> Outcome {
        Outcome::Dropped(self.record_drop(mint, reason).await)
    }
}

/// Resolves once `true` has been published. A dropped sender never resolves.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("Event task panicked: {}", e);
        }
    }
}
