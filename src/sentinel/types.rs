//! Types flowing through the alerting pipeline.

use crate::sentinel::classifier::classify;
use crate::types::{Pubkey, TokenEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visual urgency of a creator wallet, from the age of its oldest visible transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Wallet history starts within ten minutes of the launch
    Fresh,
    /// Wallet history starts within the last day
    Recent,
    /// Wallet history goes back a day or more
    Aged,
    /// No usable timestamp
    Unknown,
}

impl Classification {
    /// Tag rendered next to the oldest transaction time.
    pub fn tag(&self) -> &'static str {
        match self {
            Classification::Fresh => "🟥",
            Classification::Recent => "🟩",
            Classification::Aged => "🟫",
            Classification::Unknown => "",
        }
    }
}

/// Result of counting the tokens a creator has already deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCount {
    /// Number of fungible tokens seen (may stop early once above the threshold)
    Counted(u32),
    /// The lookup failed after all retries
    LookupFailed,
}

impl TokenCount {
    /// Whether the creator must be skipped. Failed lookups are treated as disqualifying.
    pub fn exceeds(&self, max_creator_tokens: u32) -> bool {
        match self {
            TokenCount::Counted(count) => *count > max_creator_tokens,
            TokenCount::LookupFailed => true,
        }
    }
}

/// Everything the enrichment step learned about a creator.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub creator_token_count: TokenCount,
    pub creator_oldest_tx_time: Option<DateTime<Utc>>,
}

/// Why the qualification filter skipped an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    EmptyMint,
    WrongKind(String),
    /// Neither the buy percentage nor the SOL amount is close to a whole number
    NotRoundAmount { percentage: f64, sol_amount: f64 },
    BuyTooSmall { percentage: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyMint => write!(f, "empty mint"),
            Rejection::WrongKind(kind) => write!(f, "event kind {:?} is not a create", kind),
            Rejection::NotRoundAmount { percentage, sol_amount } => write!(
                f,
                "initial buy {:.2}% and sol amount {:.2} are not close to whole numbers",
                percentage, sol_amount
            ),
            Rejection::BuyTooSmall { percentage } => {
                write!(f, "initial buy {:.2}% is too small", percentage)
            }
        }
    }
}

/// The gate at which an event left the pipeline without a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    Malformed,
    Duplicate,
    NotQualified(Rejection),
    Throttled,
    /// The creator already deployed more tokens than allowed
    SerialDeployer { count: u32 },
    /// The creator token count could not be fetched
    CreatorLookupFailed,
}

impl DropReason {
    /// Name of the counter recording drops at this gate.
    pub fn metric_name(&self) -> &'static str {
        match self {
            DropReason::Malformed => "dropped_malformed_total",
            DropReason::Duplicate => "dropped_duplicate_total",
            DropReason::NotQualified(_) => "dropped_not_qualified_total",
            DropReason::Throttled => "dropped_throttled_total",
            DropReason::SerialDeployer { .. } => "dropped_serial_deployer_total",
            DropReason::CreatorLookupFailed => "dropped_lookup_failed_total",
        }
    }
}

/// A qualified launch, ready to be rendered and sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub name: String,
    pub symbol: String,
    pub mint: Pubkey,
    pub creator: Pubkey,
    pub created_at: DateTime<Utc>,
    pub oldest_tx_at: Option<DateTime<Utc>>,
    pub classification: Classification,
    /// Deployment count shown to readers (never below 1, the current launch)
    pub dev_deployed: u32,
    pub initial_buy_percentage: f64,
}

/// Terminal state of one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Notified(Alert),
    /// The alert was assembled but the sink rejected it
    DeliveryFailed(Alert),
    Dropped(DropReason),
}

impl Alert {
    /// Assemble the alert for a qualified launch created at `created_at`.
    pub fn from_enrichment(
        event: TokenEvent,
        created_at: DateTime<Utc>,
        initial_buy_percentage: f64,
        enrichment: &EnrichmentResult,
    ) -> Self {
        let dev_deployed = match enrichment.creator_token_count {
            TokenCount::Counted(count) => count.max(1),
            TokenCount::LookupFailed => 1,
        };

        Self {
            name: event.name,
            symbol: event.symbol,
            mint: event.mint,
            creator: event.creator,
            created_at,
            oldest_tx_at: enrichment.creator_oldest_tx_time,
            classification: classify(Some(created_at), enrichment.creator_oldest_tx_time),
            dev_deployed,
            initial_buy_percentage,
        }
    }
}

impl Outcome {
    pub fn is_notified(&self) -> bool {
        matches!(self, Outcome::Notified(_))
    }

    pub fn drop_reason(&self) -> Option<&DropReason> {
        match self {
            Outcome::Dropped(reason) => Some(reason),
            _ => None,
        }
    }
}
