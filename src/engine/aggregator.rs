//! Quote aggregation.
//!
//! Fetches bid/ask/last for every market of a snapshot. Fetches fan out up
//! to a concurrency limit but results are reassembled in listing order, and
//! one failed market never aborts the batch.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::platforms::MarketVenue;
use crate::types::{MarketQuote, MarketRow, MarketSnapshot, QuoteState, ScoutError};

/// Default number of quote requests in flight at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

pub struct QuoteAggregator {
    venue: Arc<dyn MarketVenue>,
    max_concurrent: usize,
}

impl QuoteAggregator {
    pub fn new(venue: Arc<dyn MarketVenue>, max_concurrent: usize) -> Self {
        Self {
            venue,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Quote a single listed market.
    pub async fn fetch_quote(&self, row: &MarketRow) -> Result<MarketQuote, ScoutError> {
        let levels = self
            .venue
            .get_quote(&row.ticker)
            .await
            .map_err(|e| ScoutError::QuoteFailed {
                ticker: row.ticker.to_string(),
                reason: format!("{e:#}"),
            })?;

        MarketQuote::new(row.ticker.clone(), row.title.clone(), levels)
    }

    /// Quote every row of `snapshot`, keeping row order.
    ///
    /// Failed rows are kept as `QuoteState::Failed`. The call fails only
    /// when there was at least one market and none could be quoted.
    pub async fn fetch_quotes(&self, snapshot: MarketSnapshot) -> Result<MarketSnapshot, ScoutError> {
        let MarketSnapshot { event, rows } = snapshot;
        let total = rows.len();

        info!(event = %event, count = total, "Analyzing markets");

        let rows: Vec<MarketRow> = stream::iter(rows)
            .map(|row| async move {
                let state = match self.fetch_quote(&row).await {
                    Ok(quote) => {
                        debug!(ticker = %row.ticker, quote = %quote, "Quote fetched");
                        QuoteState::Quoted(quote)
                    }
                    Err(e) => {
                        warn!(ticker = %row.ticker, error = %e, "Quote unavailable, keeping row");
                        QuoteState::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                MarketRow { quote: state, ..row }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let snapshot = MarketSnapshot { event, rows };
        let failed = snapshot.failed_count();

        if total > 0 && failed == total {
            return Err(ScoutError::AllQuotesFailed {
                event: snapshot.event.to_string(),
                count: total,
            });
        }

        info!(
            event = %snapshot.event,
            quoted = total - failed,
            failed,
            "Quote aggregation complete"
        );

        Ok(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
