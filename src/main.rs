//! Main entry point for the mint-sentinel launch alert service.

use anyhow::Result;
use mint_sentinel::sentinel::{
    RpcEnrichmentClient, RpcRateLimiter, SentinelBuilder, SentinelConfig, TelegramNotifier,
    TokenFeed,
};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting mint-sentinel");

    let config = match SentinelConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return Err(e);
        }
    };

    let (event_sender, event_receiver) = mpsc::channel(config.queue_capacity);
    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    let feed = TokenFeed::new(config.feed_url.clone(), config.reconnect_delay(), event_sender);
    let rate_limiter = Arc::new(RpcRateLimiter::new(config.rate_limit_requests_per_second));
    let enrichment = Arc::new(RpcEnrichmentClient::new(&config, rate_limiter.clone())?);
    let sink = Arc::new(TelegramNotifier::new(&config)?);
    let pipeline = Arc::new(SentinelBuilder::from_config(config).build_with(enrichment, sink)?);

    let feed_handle = tokio::spawn(feed.run(shutdown_receiver.clone()));
    let pipeline_handle = tokio::spawn(pipeline.clone().run(event_receiver, shutdown_receiver));

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down");
    let _ = shutdown_sender.send(true);

    let _ = feed_handle.await;
    let _ = pipeline_handle.await;

    pipeline.metrics().log_summary().await;
    let stats = rate_limiter.get_stats();
    info!(
        "RPC requests: {} granted, {} delayed at {} req/s",
        stats.granted, stats.delayed, stats.requests_per_second
    );
    Ok(())
}
