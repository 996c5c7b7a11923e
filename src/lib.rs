//! mint-sentinel - new token launch alerts for Solana
//!
//! This crate watches a launch feed, filters and enriches new token events and
//! sends at most one chat alert per mint.

pub mod types;
pub mod sentinel;

// Re-export main types for convenience
pub use types::{Pubkey, TokenEvent};
