//! Order-book spread heuristic.
//!
//! Placeholder signal used until a sentiment model is wired in. A tight
//! spread with a strong bid on one side is read as conviction for that side;
//! anything else echoes the market midpoint, which yields no edge.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::ConfidenceSource;
use crate::types::{MarketQuote, Side};

/// Bid (cents) a side must exceed before its spread counts as conviction.
const MIN_CONVICTION_BID: u32 = 30;

pub struct SpreadHeuristic {
    /// P(YES) reported when the YES side looks strong.
    pub bullish: Decimal,
    /// P(YES) reported when the NO side looks strong.
    pub bearish: Decimal,
}

impl Default for SpreadHeuristic {
    fn default() -> Self {
        Self {
            bullish: dec!(0.75),
            bearish: dec!(0.30),
        }
    }
}

#[async_trait]
impl ConfidenceSource for SpreadHeuristic {
    async fn probability_yes(&self, quote: &MarketQuote) -> Result<Decimal> {
        let one_sided = [quote.yes_bid, quote.yes_ask, quote.no_bid, quote.no_ask].contains(&0);
        if one_sided {
            return Ok(quote.implied_probability_yes());
        }

        let yes_spread = quote.spread(Side::Yes);
        let no_spread = quote.spread(Side::No);

        let p = if yes_spread < no_spread && quote.yes_bid > MIN_CONVICTION_BID {
            self.bullish
        } else if no_spread < yes_spread && quote.no_bid > MIN_CONVICTION_BID {
            self.bearish
        } else {
            quote.implied_probability_yes()
        };
        Ok(p)
    }
}
