//! Sentinel configuration.
//!
//! Every threshold the pipeline uses lives here so it can be injected from the
//! environment. Reference defaults match the production deployment.

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Full runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// JSON-RPC indexer endpoint
    pub rpc_url: String,
    /// Telegram bot token
    pub telegram_token: String,
    /// Telegram chat receiving alerts
    pub chat_id: String,
    /// Telegram Bot API base URL
    pub telegram_api_base: String,
    /// Launch feed websocket URL
    pub feed_url: String,
    /// Delay before reconnecting to the feed
    pub reconnect_delay_secs: u64,

    /// Number of mints remembered for deduplication
    pub dedup_capacity: usize,
    /// Minimum time between two enrichments of one creator
    pub throttle_window_secs: u64,
    /// Upper bound on throttle records kept in memory
    pub throttle_max_entries: u64,
    /// Throttle records are swept after this many windows
    pub throttle_sweep_multiple: u32,

    /// Token supply used to turn the initial buy into a percentage
    pub total_supply: f64,
    /// Initial buy percentage must be strictly above this
    pub min_buy_percentage: f64,
    /// Allowed distance from a whole number for the round-amount heuristic
    pub integer_tolerance: f64,
    /// Creators with more deployed tokens than this are skipped
    pub max_creator_tokens: u32,

    /// Page size for getAssetsByCreator
    pub asset_page_limit: u32,
    /// Number of recent signatures inspected for the oldest transaction
    pub signature_limit: u32,
    /// Attempts per enrichment query
    pub retry_attempts: usize,
    /// Fixed delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Per-attempt HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Outbound RPC requests per second
    pub rate_limit_requests_per_second: u32,

    /// Maximum events processed concurrently
    pub worker_count: usize,
    /// Capacity of the queue between feed and pipeline
    pub queue_capacity: usize,

    /// IANA timezone used when rendering timestamps
    pub display_timezone: String,
    /// Prefix of the mint explorer link
    pub mint_link_base: String,
    /// Prefix of the creator explorer link
    pub creator_link_base: String,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            telegram_token: String::new(),
            chat_id: String::new(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            feed_url: "wss://pumpportal.fun/api/data".to_string(),
            reconnect_delay_secs: 5,
            dedup_capacity: 1000,
            throttle_window_secs: 15 * 60,
            throttle_max_entries: 10_000,
            throttle_sweep_multiple: 4,
            total_supply: 1_000_000_000.0,
            min_buy_percentage: 1.0,
            integer_tolerance: 0.02,
            max_creator_tokens: 0,
            asset_page_limit: 50,
            signature_limit: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            request_timeout_secs: 8,
            rate_limit_requests_per_second: 10,
            worker_count: 16,
            queue_capacity: 1024,
            display_timezone: "Europe/Warsaw".to_string(),
            mint_link_base: "https://neo.bullx.io/terminal?chainId=1399811149&address="
                .to_string(),
            creator_link_base: "https://solscan.io/account/".to_string(),
        }
    }
}

impl SentinelConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `HELIUS_RPC_URL`, `TELEGRAM_TOKEN`, `CHAT_ID`
    ///
    /// Everything else falls back to [`SentinelConfig::default`] when unset or unparsable.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            rpc_url: required("HELIUS_RPC_URL")?,
            telegram_token: required("TELEGRAM_TOKEN")?,
            chat_id: required("CHAT_ID")?,
            telegram_api_base: string_or("TELEGRAM_API_BASE", defaults.telegram_api_base),
            feed_url: string_or("FEED_URL", defaults.feed_url),
            reconnect_delay_secs: parse_or("FEED_RECONNECT_SECS", defaults.reconnect_delay_secs),
            dedup_capacity: parse_or("DEDUP_CAPACITY", defaults.dedup_capacity),
            throttle_window_secs: parse_or("THROTTLE_WINDOW_SECS", defaults.throttle_window_secs),
            throttle_max_entries: parse_or("THROTTLE_MAX_ENTRIES", defaults.throttle_max_entries),
            throttle_sweep_multiple: parse_or(
                "THROTTLE_SWEEP_MULTIPLE",
                defaults.throttle_sweep_multiple,
            ),
            total_supply: parse_or("TOTAL_SUPPLY", defaults.total_supply),
            min_buy_percentage: parse_or("MIN_BUY_PERCENTAGE", defaults.min_buy_percentage),
            integer_tolerance: parse_or("INTEGER_TOLERANCE", defaults.integer_tolerance),
            max_creator_tokens: parse_or("MAX_CREATOR_TOKENS", defaults.max_creator_tokens),
            asset_page_limit: parse_or("ASSET_PAGE_LIMIT", defaults.asset_page_limit),
            signature_limit: parse_or("SIGNATURE_LIMIT", defaults.signature_limit),
            retry_attempts: parse_or("RPC_RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_delay_ms: parse_or("RPC_RETRY_DELAY_MS", defaults.retry_delay_ms),
            request_timeout_secs: parse_or("RPC_TIMEOUT_SECS", defaults.request_timeout_secs),
            rate_limit_requests_per_second: parse_or(
                "RPC_RATE_LIMIT",
                defaults.rate_limit_requests_per_second,
            ),
            worker_count: parse_or("WORKER_COUNT", defaults.worker_count),
            queue_capacity: parse_or("QUEUE_CAPACITY", defaults.queue_capacity),
            display_timezone: string_or("DISPLAY_TIMEZONE", defaults.display_timezone),
            mint_link_base: string_or("MINT_LINK_BASE", defaults.mint_link_base),
            creator_link_base: string_or("CREATOR_LINK_BASE", defaults.creator_link_base),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(anyhow!("RPC endpoint URL is required"));
        }
        if self.telegram_token.is_empty() || self.chat_id.is_empty() {
            return Err(anyhow!("Telegram token and chat id are required"));
        }
        if self.dedup_capacity == 0 {
            return Err(anyhow!("dedup_capacity must be at least 1"));
        }
        if self.retry_attempts == 0 {
            return Err(anyhow!("retry_attempts must be at least 1"));
        }
        if self.worker_count == 0 || self.queue_capacity == 0 {
            return Err(anyhow!("worker_count and queue_capacity must be at least 1"));
        }
        if self.total_supply <= 0.0 {
            return Err(anyhow!("total_supply must be positive"));
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        Tz::from_str(&self.display_timezone)
            .map_err(|e| anyhow!("invalid display timezone {}: {}", self.display_timezone, e))
    }

    pub fn throttle_window(&self) -> Duration {
        Duration::from_secs(self.throttle_window_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow!("missing required env var: {}", key))
}

fn string_or(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SentinelConfig {
        SentinelConfig {
            rpc_url: "http://localhost:8899".to_string(),
            telegram_token: "token".to_string(),
            chat_id: "42".to_string(),
            ..SentinelConfig::default()
        }
    }

    #[test]
    fn test_reference_defaults() {
        let config = SentinelConfig::default();

        assert_eq!(config.dedup_capacity, 1000);
        assert_eq!(config.throttle_window(), Duration::from_secs(900));
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(8));
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.total_supply, 1_000_000_000.0);
        assert_eq!(config.max_creator_tokens, 0);
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_requires_credentials() {
        assert!(SentinelConfig::default().validate().is_err());

        let mut config = valid_config();
        config.chat_id.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut config = valid_config();
        config.dedup_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.retry_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.worker_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut config = valid_config();
        config.display_timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
        assert!(valid_config().timezone().is_ok());
    }

    #[test]
    fn test_parse_or_falls_back_on_garbage() {
        env::set_var("MINT_SENTINEL_TEST_PARSE", "not-a-number");
        assert_eq!(parse_or("MINT_SENTINEL_TEST_PARSE", 7u32), 7);
        env::set_var("MINT_SENTINEL_TEST_PARSE", "12");
        assert_eq!(parse_or("MINT_SENTINEL_TEST_PARSE", 7u32), 12);
        env::remove_var("MINT_SENTINEL_TEST_PARSE");
    }
}
