//! Venue integrations.
//!
//! Defines the `MarketVenue` trait and the Kalshi REST implementation.
//! Request signing is supplied from outside through `kalshi::RequestSigner`.

pub mod kalshi;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{EventTicker, ListedMarket, PriceLevels, Side, Ticker};

/// Acknowledgement returned by the venue for an accepted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_id: String,
    /// Venue-reported order status ("resting", "executed", ...).
    pub status: String,
}

/// Abstraction over a prediction-market venue.
///
/// Implementors list the markets of an event, quote single markets, report
/// the account balance and accept limit orders. Errors are returned as-is;
/// the engine decides which ones are fatal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketVenue: Send + Sync {
    /// Every market under `event`, in venue order.
    async fn list_markets_by_event(&self, event: &EventTicker) -> Result<Vec<ListedMarket>>;

    /// Current bid/ask/last levels for one market.
    async fn get_quote(&self, ticker: &Ticker) -> Result<PriceLevels>;

    /// Available balance in cents.
    async fn get_balance(&self) -> Result<u64>;

    /// Submit a limit buy for `quantity` contracts of `side` at `price_cents`.
    async fn place_order(
        &self,
        ticker: &Ticker,
        side: Side,
        quantity: u32,
        price_cents: u32,
    ) -> Result<OrderAck>;

    /// Venue name for logging.
    fn name(&self) -> String;
}
