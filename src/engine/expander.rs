//! Event expansion.
//!
//! Derives the event ticker that groups a market with its siblings and asks
//! the venue for every market listed under that event.
//!
//! Kalshi tickers read `SERIES[-EVENTCODE][-STRIKE]`, where the event code
//! starts with a `YYMONDD` date (`25SEP0113`, `25SEP01H1500`). Series-level
//! events such as `KXRTCONJURING` carry no date code at all.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::platforms::MarketVenue;
use crate::types::{EventTicker, MarketRow, MarketSnapshot, ScoutError, Ticker};

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Whether a segment opens with a `YYMONDD` date code.
fn is_date_coded(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() >= 7
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && MONTHS.iter().any(|m| m.as_bytes() == &bytes[2..5])
        && bytes[5..7].iter().all(u8::is_ascii_digit)
}

/// Strike / sub-market segment: alphanumerics with an optional decimal point.
fn is_strike_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.chars().any(|c| c.is_ascii_alphanumeric())
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
}

/// Derive the event ticker for `ticker`.
///
/// A trailing strike segment is stripped; a ticker that already ends in its
/// event code (or has no hyphen at all) is returned unchanged. Applying this
/// twice gives the same result as applying it once.
pub fn derive_event(ticker: &Ticker) -> EventTicker {
    let segments: Vec<&str> = ticker.as_str().split('-').collect();
    let unchanged = EventTicker::from(ticker);

    let Some(last) = segments.last() else {
        return unchanged;
    };
    if segments.len() == 1 || !is_strike_segment(last) {
        return unchanged;
    }

    // Without a date code the series is the event: `KXFOO-BAR-60` maps to
    // `KXFOO`, not `KXFOO-BAR`, otherwise a second pass would strip `-BAR`.
    let event_len = match segments.iter().skip(1).position(|s| is_date_coded(s)) {
        Some(i) => i + 2,
        None => 1,
    };
    if event_len >= segments.len() {
        return unchanged;
    }

    let event = segments[..event_len].join("-");
    match EventTicker::parse(&event) {
        Ok(e) => e,
        Err(_) => unchanged,
    }
}

/// Lists the markets of an event through a venue.
pub struct EventExpander {
    venue: Arc<dyn MarketVenue>,
}

impl EventExpander {
    pub fn new(venue: Arc<dyn MarketVenue>) -> Self {
        Self { venue }
    }

    /// List every market under `event` as an unquoted snapshot.
    ///
    /// Transport failures map to `VenueUnavailable` (retryable); an empty
    /// listing maps to `NoMarketsFound` (not retryable).
    pub async fn list_markets(&self, event: &EventTicker) -> Result<MarketSnapshot, ScoutError> {
        info!(event = %event, venue = %self.venue.name(), "Fetching all markets for event");

        let listed = self
            .venue
            .list_markets_by_event(event)
            .await
            .map_err(|source| ScoutError::VenueUnavailable {
                event: event.to_string(),
                source,
            })?;

        if listed.is_empty() {
            return Err(ScoutError::NoMarketsFound {
                event: event.to_string(),
            });
        }

        for market in listed.iter().filter(|m| !m.ticker.belongs_to(event)) {
            warn!(
                event = %event,
                ticker = %market.ticker,
                "Listed market does not share the event prefix"
            );
        }

        info!(event = %event, count = listed.len(), "Markets found for event");

        Ok(MarketSnapshot {
            event: event.clone(),
            rows: listed.into_iter().map(MarketRow::pending).collect(),
        })
    }

    /// Derive the event of `ticker` and list its markets.
    pub async fn expand(&self, ticker: &Ticker) -> Result<MarketSnapshot, ScoutError> {
        let event = derive_event(ticker);
        if event.as_str() == ticker.as_str() {
            debug!(event = %event, "Using ticker as event");
        } else {
            info!(ticker = %ticker, event = %event, "Derived event ticker from market ticker");
        }
        self.list_markets(&event).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
