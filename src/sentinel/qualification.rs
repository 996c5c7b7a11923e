//! Local launch filter, applied before any enrichment call is spent.

use crate::sentinel::config::SentinelConfig;
use crate::sentinel::types::Rejection;
use crate::types::TokenEvent;

/// Thresholds for [`qualify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualificationRules {
    pub total_supply: f64,
    pub min_buy_percentage: f64,
    pub integer_tolerance: f64,
}

impl Default for QualificationRules {
    fn default() -> Self {
        Self {
            total_supply: 1_000_000_000.0,
            min_buy_percentage: 1.0,
            integer_tolerance: 0.02,
        }
    }
}

impl From<&SentinelConfig> for QualificationRules {
    fn from(config: &SentinelConfig) -> Self {
        Self {
            total_supply: config.total_supply,
            min_buy_percentage: config.min_buy_percentage,
            integer_tolerance: config.integer_tolerance,
        }
    }
}

impl QualificationRules {
    /// Share of the supply bought by the creator, in percent.
    pub fn initial_buy_percentage(&self, event: &TokenEvent) -> f64 {
        if event.initial_buy > 0.0 {
            event.initial_buy / self.total_supply * 100.0
        } else {
            0.0
        }
    }

    fn is_near_integer(&self, value: f64) -> bool {
        (value - value.round()).abs() <= self.integer_tolerance
    }
}

/// Decide whether a launch deserves enrichment. Returns the buy percentage on success.
///
/// Round buy sizes (whole-percent buys or whole-SOL spends) are the signal; odd
/// amounts are mostly bots and are skipped, as are stakes of `min_buy_percentage`
/// or less.
pub fn qualify(event: &TokenEvent, rules: &QualificationRules) -> Result<f64, Rejection> {
    if event.mint.is_empty() {
        return Err(Rejection::EmptyMint);
    }
    if !event.is_create() {
        return Err(Rejection::WrongKind(event.event_kind.clone()));
    }

    let percentage = rules.initial_buy_percentage(event);
    if !(rules.is_near_integer(percentage) || rules.is_near_integer(event.sol_amount)) {
        return Err(Rejection::NotRoundAmount {
            percentage,
            sol_amount: event.sol_amount,
        });
    }

    if percentage <= rules.min_buy_percentage {
        return Err(Rejection::BuyTooSmall { percentage });
    }

    Ok(percentage)
}
