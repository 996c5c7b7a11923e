//! Creator wallet age classification.

use crate::sentinel::types::Classification;
use chrono::{DateTime, Utc};

/// Upper bound (inclusive) of a fresh wallet, in seconds.
pub const FRESH_MAX_SECS: i64 = 600;
/// Lower bound (inclusive) of an aged wallet, in seconds.
pub const AGED_MIN_SECS: i64 = 86_400;

pub fn classify(created_at: Option<DateTime<Utc>>, oldest_tx_at: Option<DateTime<Utc>>) -> Classification {
    let (Some(created_at), Some(oldest_tx_at)) = (created_at, oldest_tx_at) else {
        return Classification::Unknown;
    };

    let delta = (created_at - oldest_tx_at).num_seconds();
    if delta <= FRESH_MAX_SECS {
        Classification::Fresh
    } else if delta < AGED_MIN_SECS {
        Classification::Recent
    } else {
        Classification::Aged
    }
}
