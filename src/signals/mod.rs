//! External confidence signals.
//!
//! Defines the `ConfidenceSource` trait consumed by the betting advisor.
//! Production wiring is a sentiment/classification model that lives outside
//! this crate; `spread::SpreadHeuristic` is the built-in stand-in.

pub mod spread;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::MarketQuote;

/// Abstraction over anything that can estimate P(YES) for a market.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfidenceSource: Send + Sync {
    /// Probability (0–1) that `quote`'s market resolves YES.
    async fn probability_yes(&self, quote: &MarketQuote) -> Result<Decimal>;
}
