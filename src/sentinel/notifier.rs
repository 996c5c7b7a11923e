//! Outbound alert delivery.

use crate::sentinel::config::SentinelConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

/// Destination for rendered alerts.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends alerts through the Telegram Bot API.
pub struct TelegramNotifier {
    http_client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &SentinelConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.telegram_api_base.trim_end_matches('/'),
                config.telegram_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    #[instrument(skip(self, text))]
    async fn send(&self, text: &str) -> Result<()> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach Telegram")?;

        let status = response.status();
        let body: TelegramResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram response (HTTP {})", status))?;

        if !status.is_success() || !body.ok {
            return Err(anyhow!(
                "Telegram rejected message (HTTP {}): {}",
                status,
                body.description.unwrap_or_default()
            ));
        }

        debug!("Alert delivered to chat {}", self.chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_token() {
        let config = SentinelConfig {
            telegram_token: "123:abc".to_string(),
            chat_id: "-100".to_string(),
            telegram_api_base: "https://api.telegram.org/".to_string(),
            ..SentinelConfig::default()
        };
        let notifier = TelegramNotifier::new(&config).unwrap();

        assert_eq!(notifier.endpoint, "https://api.telegram.org/bot123:abc/sendMessage");
        assert_eq!(notifier.chat_id, "-100");
    }

    #[test]
    fn test_parse_error_response() {
        let body: TelegramResponse = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: can't parse entities"}"#,
        )
        .unwrap();
        assert!(!body.ok);
        assert_eq!(body.description.as_deref(), Some("Bad Request: can't parse entities"));
    }
}
