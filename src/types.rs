//! Core types shared by the feed and the alerting pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A simple public key representation (base58 string as delivered by the feed)
pub type Pubkey = String;

/// Event kind carried by token creation messages.
pub const CREATE_EVENT_KIND: &str = "create";

/// A "new token created" event as delivered by the launch feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEvent {
    /// The mint address of the token
    pub mint: Pubkey,
    /// Token name
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    /// Token ticker symbol
    #[serde(default, deserialize_with = "lenient")]
    pub symbol: String,
    /// The creator/deployer of the token
    #[serde(rename = "traderPublicKey", default, deserialize_with = "lenient")]
    pub creator: Pubkey,
    /// Tokens bought by the creator in the creation transaction
    #[serde(rename = "initialBuy", default, deserialize_with = "lenient")]
    pub initial_buy: f64,
    /// SOL spent by the creator on that initial buy
    #[serde(rename = "solAmount", default, deserialize_with = "lenient")]
    pub sol_amount: f64,
    /// Transaction type reported by the feed ("create" for launches)
    #[serde(rename = "txType", default, deserialize_with = "lenient")]
    pub event_kind: String,
}

/// Optional feed fields fall back to their default on `null` or a mistyped value.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

impl TokenEvent {
    /// Decode an event from a raw feed object.
    ///
    /// Returns `None` when the payload is not an object or carries no usable mint.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let event: TokenEvent = serde_json::from_value(raw.clone()).ok()?;
        if event.mint.trim().is_empty() {
            return None;
        }
        Some(event)
    }

    pub fn is_create(&self) -> bool {
        self.event_kind == CREATE_EVENT_KIND
    }
}
