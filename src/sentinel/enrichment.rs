//! Creator enrichment against a JSON-RPC indexer.
//!
//! Two lookups are made per qualifying launch: how many fungible tokens the
//! creator already deployed (`getAssetsByCreator`) and how old the creator
//! wallet looks (`getSignaturesForAddress`). Both go through the shared rate
//! limiter and the retry policy; neither ever returns an error to the caller.

use crate::sentinel::config::SentinelConfig;
use crate::sentinel::rate_limit::RpcRateLimiter;
use crate::sentinel::retry::{RetryPolicy, Retryable};
use crate::sentinel::types::TokenCount;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Asset interface counted as a deployed token.
const FUNGIBLE_INTERFACE: &str = "FungibleToken";

#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("indexer returned HTTP {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("response has no result field")]
    MissingResult,
}

impl Retryable for EnrichmentError {
    fn is_retryable(&self) -> bool {
        match self {
            EnrichmentError::Status(status) => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
            }
            _ => true,
        }
    }
}

/// Source of creator context. The pipeline only talks to this trait.
#[async_trait]
pub trait EnrichmentSource: Send + Sync {
    /// Number of fungible tokens the creator already deployed.
    ///
    /// Counting may stop early once the count is above the configured maximum.
    /// Returns [`TokenCount::LookupFailed`] when the indexer could not be queried.
    async fn creator_asset_count(&self, creator: &str) -> TokenCount;

    /// Timestamp of the oldest transaction among the creator's most recent signatures.
    ///
    /// Only a fixed window of recent signatures is inspected, so for busy wallets
    /// this is the oldest *visible* transaction, not the wallet's first ever.
    /// `None` means no history or a failed lookup.
    async fn creator_oldest_tx_time(&self, creator: &str) -> Option<DateTime<Utc>>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AssetPage {
    #[serde(default)]
    items: Vec<AssetItem>,
}

#[derive(Debug, Deserialize)]
struct AssetItem {
    #[serde(default)]
    interface: String,
}

#[derive(Debug, Deserialize)]
struct SignatureInfo {
    #[serde(rename = "blockTime")]
    block_time: Option<i64>,
}

/// `reqwest` implementation of [`EnrichmentSource`].
pub struct RpcEnrichmentClient {
    http_client: Client,
    rpc_url: String,
    retry: RetryPolicy,
    rate_limiter: Arc<RpcRateLimiter>,
    asset_page_limit: u32,
    signature_limit: u32,
    max_creator_tokens: u32,
}

impl RpcEnrichmentClient {
    pub fn new(config: &SentinelConfig, rate_limiter: Arc<RpcRateLimiter>) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            rpc_url: config.rpc_url.clone(),
            retry: RetryPolicy::new(config.retry_attempts, config.retry_delay()),
            rate_limiter,
            asset_page_limit: config.asset_page_limit,
            signature_limit: config.signature_limit,
            max_creator_tokens: config.max_creator_tokens,
        })
    }

    /// One JSON-RPC round trip. A missing `result` is an error.
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, EnrichmentError> {
        self.rate_limiter.acquire().await;

        let payload = json!({
            "jsonrpc": "2.0",
            "id": "mint-sentinel",
            "method": method,
            "params": params,
        });

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: RpcResponse<T> = serde_json::from_slice(&body)?;
        if let Some(error) = parsed.error {
            return Err(EnrichmentError::Rpc(error.to_string()));
        }
        parsed.result.ok_or(EnrichmentError::MissingResult)
    }

    async fn fetch_assets(&self, creator: &str) -> Result<AssetPage, EnrichmentError> {
        self.call(
            "getAssetsByCreator",
            json!({
                "creatorAddress": creator,
                "onlyVerified": false,
                "page": 1,
                "limit": self.asset_page_limit,
            }),
        )
        .await
    }

    async fn fetch_signatures(&self, creator: &str) -> Result<Vec<SignatureInfo>, EnrichmentError> {
        self.call(
            "getSignaturesForAddress",
            json!([creator, { "limit": self.signature_limit }]),
        )
        .await
    }
}

#[async_trait]
impl EnrichmentSource for RpcEnrichmentClient {
    #[instrument(skip(self), fields(creator = %creator))]
    async fn creator_asset_count(&self, creator: &str) -> TokenCount {
        match self
            .retry
            .run("getAssetsByCreator", || self.fetch_assets(creator))
            .await
        {
            Ok(page) => TokenCount::Counted(count_fungible(&page.items, self.max_creator_tokens)),
            Err(e) => {
                warn!("Creator token lookup failed for {}: {}", creator, e);
                TokenCount::LookupFailed
            }
        }
    }

    #[instrument(skip(self), fields(creator = %creator))]
    async fn creator_oldest_tx_time(&self, creator: &str) -> Option<DateTime<Utc>> {
        match self
            .retry
            .run("getSignaturesForAddress", || self.fetch_signatures(creator))
            .await
        {
            Ok(signatures) => {
                if signatures.is_empty() {
                    debug!("No transactions for creator {}", creator);
                }
                oldest_block_time(&signatures)
            }
            Err(e) => {
                warn!("Creator history lookup failed for {}: {}", creator, e);
                None
            }
        }
    }
}

/// Count fungible assets, stopping once the count exceeds `stop_above`.
fn count_fungible(items: &[AssetItem], stop_above: u32) -> u32 {
    let mut count = 0;
    for item in items {
        if item.interface == FUNGIBLE_INTERFACE {
            count += 1;
            if count > stop_above {
                break;
            }
        }
    }
    count
}

fn oldest_block_time(signatures: &[SignatureInfo]) -> Option<DateTime<Utc>> {
    signatures
        .iter()
        .filter_map(|s| s.block_time)
        .min()
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(interfaces: &[&str]) -> Vec<AssetItem> {
        interfaces
            .iter()
            .map(|i| AssetItem {
                interface: i.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_counts_only_fungible_tokens() {
        let assets = items(&["FungibleToken", "V1_NFT", "FungibleToken", "ProgrammableNFT"]);
        assert_eq!(count_fungible(&assets, 10), 2);
    }

    #[test]
    fn test_count_stops_above_threshold() {
        let assets = items(&["FungibleToken"; 40]);
        assert_eq!(count_fungible(&assets, 0), 1);
        assert_eq!(count_fungible(&assets, 2), 3);
    }

    #[test]
    fn test_oldest_block_time_takes_minimum() {
        let signatures = vec![
            SignatureInfo { block_time: Some(1_700_000_300) },
            SignatureInfo { block_time: None },
            SignatureInfo { block_time: Some(1_700_000_100) },
            SignatureInfo { block_time: Some(1_700_000_200) },
        ];
        let oldest = oldest_block_time(&signatures).unwrap();
        assert_eq!(oldest.timestamp(), 1_700_000_100);
    }

    #[test]
    fn test_oldest_block_time_without_history() {
        assert_eq!(oldest_block_time(&[]), None);
        assert_eq!(oldest_block_time(&[SignatureInfo { block_time: None }]), None);
    }

    #[test]
    fn test_error_classification() {
        assert!(EnrichmentError::Status(StatusCode::INTERNAL_SERVER_ERROR).is_retryable());
        assert!(EnrichmentError::Status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!EnrichmentError::Status(StatusCode::UNAUTHORIZED).is_retryable());
        assert!(!EnrichmentError::Status(StatusCode::NOT_FOUND).is_retryable());
        assert!(EnrichmentError::MissingResult.is_retryable());
        assert!(EnrichmentError::Rpc("busy".to_string()).is_retryable());
    }

    #[test]
    fn test_response_without_result_parses() {
        let parsed: RpcResponse<AssetPage> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"x"}"#).unwrap();
        assert!(parsed.result.is_none());
        assert!(parsed.error.is_none());
    }
}
