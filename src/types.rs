//! Shared types for the scout pipeline.
//!
//! These types form the data model passed between the resolver, the
//! expander, the quote aggregator, the advisor and the order workflow.
//! Identifiers are validated once on construction so that downstream
//! stages can rely on their invariants without re-checking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest valid price on a binary contract, in cents.
pub const MAX_PRICE_CENTS: u32 = 100;

/// Convert an amount in cents to dollars.
pub fn cents_to_dollars(cents: impl Into<Decimal>) -> Decimal {
    cents.into() / dec!(100)
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Whether `s` uses only ticker characters: `[A-Z0-9][A-Z0-9\-\.]*`,
/// compared case-insensitively.
pub(crate) fn has_ticker_chars(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// Canonical identifier of a single tradable market, e.g. `KXRTCONJURING-60`.
///
/// Always non-empty, free of whitespace and upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Validate and case-normalise a raw ticker string.
    pub fn parse(raw: &str) -> Result<Self, ScoutError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScoutError::malformed(raw, "ticker is empty"));
        }
        if !has_ticker_chars(trimmed) {
            return Err(ScoutError::malformed(
                raw,
                "ticker may only contain letters, digits, '-' and '.'",
            ));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this market ticker sits under the given event.
    pub fn belongs_to(&self, event: &EventTicker) -> bool {
        self.0 == event.0
            || (self.0.starts_with(event.as_str())
                && self.0[event.as_str().len()..].starts_with('-'))
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Ticker {
    type Error = ScoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ticker::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(t: Ticker) -> Self {
        t.0
    }
}

/// Identifier of a group of related markets (the ticker prefix they share).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventTicker(String);

impl EventTicker {
    pub fn parse(raw: &str) -> Result<Self, ScoutError> {
        Ticker::parse(raw).map(|t| Self(t.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Ticker> for EventTicker {
    /// Treat a ticker as an event identifier verbatim.
    fn from(t: &Ticker) -> Self {
        Self(t.0.clone())
    }
}

impl fmt::Display for EventTicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EventTicker {
    type Error = ScoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EventTicker::parse(&value)
    }
}

impl From<EventTicker> for String {
    fn from(t: EventTicker) -> Self {
        t.0
    }
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// Bet direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Lower-case form used on the wire.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// Raw bid/ask/last levels as reported by the venue, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceLevels {
    pub yes_bid: u32,
    pub yes_ask: u32,
    pub no_bid: u32,
    pub no_ask: u32,
    pub last_price: u32,
}

/// A market listed under an event, before any quote has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedMarket {
    pub ticker: Ticker,
    pub title: String,
}

/// Validated price snapshot for one market.
///
/// All prices lie in `[0, 100]` cents and `bid <= ask` on each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub ticker: Ticker,
    pub title: String,
    pub yes_bid: u32,
    pub yes_ask: u32,
    pub no_bid: u32,
    pub no_ask: u32,
    pub last_price: u32,
}

impl MarketQuote {
    /// Build a quote from venue levels, enforcing the price invariants.
    pub fn new(ticker: Ticker, title: String, levels: PriceLevels) -> Result<Self, ScoutError> {
        let fields = [
            ("yes_bid", levels.yes_bid),
            ("yes_ask", levels.yes_ask),
            ("no_bid", levels.no_bid),
            ("no_ask", levels.no_ask),
            ("last_price", levels.last_price),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| *v > MAX_PRICE_CENTS) {
            return Err(ScoutError::InvalidQuote {
                ticker: ticker.to_string(),
                reason: format!("{name} = {value} is outside 0..=100 cents"),
            });
        }
        if levels.yes_bid > levels.yes_ask {
            return Err(ScoutError::InvalidQuote {
                ticker: ticker.to_string(),
                reason: format!("yes bid {} above yes ask {}", levels.yes_bid, levels.yes_ask),
            });
        }
        if levels.no_bid > levels.no_ask {
            return Err(ScoutError::InvalidQuote {
                ticker: ticker.to_string(),
                reason: format!("no bid {} above no ask {}", levels.no_bid, levels.no_ask),
            });
        }

        Ok(Self {
            ticker,
            title,
            yes_bid: levels.yes_bid,
            yes_ask: levels.yes_ask,
            no_bid: levels.no_bid,
            no_ask: levels.no_ask,
            last_price: levels.last_price,
        })
    }

    /// Market-implied probability of YES: the yes bid/ask midpoint.
    pub fn implied_probability_yes(&self) -> Decimal {
        Decimal::from(self.yes_bid + self.yes_ask) / dec!(200)
    }

    /// Price (cents) a buyer of `side` pays right now.
    pub fn ask(&self, side: Side) -> u32 {
        match side {
            Side::Yes => self.yes_ask,
            Side::No => self.no_ask,
        }
    }

    pub fn bid(&self, side: Side) -> u32 {
        match side {
            Side::Yes => self.yes_bid,
            Side::No => self.no_bid,
        }
    }

    /// Ask minus bid on one side, in cents.
    pub fn spread(&self, side: Side) -> u32 {
        self.ask(side) - self.bid(side)
    }
}

impl fmt::Display for MarketQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (YES {}/{}¢ | NO {}/{}¢ | last {}¢)",
            self.ticker, self.yes_bid, self.yes_ask, self.no_bid, self.no_ask, self.last_price,
        )
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Quote status of a single row in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteState {
    /// Listed but not yet quoted.
    Pending,
    Quoted(MarketQuote),
    /// Quote fetch failed; the row is kept so ordering is preserved.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRow {
    pub ticker: Ticker,
    pub title: String,
    pub quote: QuoteState,
}

impl MarketRow {
    pub fn pending(market: ListedMarket) -> Self {
        Self {
            ticker: market.ticker,
            title: market.title,
            quote: QuoteState::Pending,
        }
    }

    pub fn quote(&self) -> Option<&MarketQuote> {
        match &self.quote {
            QuoteState::Quoted(q) => Some(q),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.quote {
            QuoteState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Every market of one event, in the order the venue returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub event: EventTicker,
    pub rows: Vec<MarketRow>,
}

impl MarketSnapshot {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.rows.iter().map(|r| &r.ticker)
    }

    /// Successfully quoted markets, in snapshot order.
    pub fn quotes(&self) -> impl Iterator<Item = &MarketQuote> {
        self.rows.iter().filter_map(MarketRow::quote)
    }

    pub fn failed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.error().is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Recommendations & orders
// ---------------------------------------------------------------------------

/// Advisory suggestion to take one side of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub quote: MarketQuote,
    pub side: Side,
    /// Model probability of the recommended side winning (0–1).
    pub confidence: Decimal,
    /// Absolute gap between model and market probability.
    pub edge: Decimal,
    pub rationale: String,
}

impl Recommendation {
    pub fn ticker(&self) -> &Ticker {
        &self.quote.ticker
    }

    /// Limit price (cents) for buying the recommended side.
    pub fn entry_price(&self) -> u32 {
        self.quote.ask(self.side)
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BET {} on {} (confidence {:.1}%, edge {:.1}pp)",
            self.side,
            self.quote.ticker,
            self.confidence * dec!(100),
            self.edge * dec!(100),
        )
    }
}

/// Terminal state of one recommendation in the order workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Rejected,
    Skipped,
    Aborted,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Placed => write!(f, "PLACED"),
            OrderStatus::Rejected => write!(f, "REJECTED"),
            OrderStatus::Skipped => write!(f, "SKIPPED"),
            OrderStatus::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Outcome of one recommendation reached by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub ticker: Ticker,
    pub side: Side,
    /// Venue order id, present only when `status` is `Placed`.
    pub order_id: Option<String>,
    pub status: OrderStatus,
    /// Rejection reason or other operator-facing note.
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for OrderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.status, self.side, self.ticker)?;
        if let Some(id) = &self.order_id {
            write!(f, " [order {id}]")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the scout pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("Malformed market input '{input}': {reason}")]
    MalformedInput { input: String, reason: String },

    #[error("Venue unavailable while listing event {event}: {source:#}")]
    VenueUnavailable {
        event: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("No markets found for event {event}; the event may be inactive or the URL incorrect")]
    NoMarketsFound { event: String },

    #[error("Quote fetch failed for every market of event {event} ({count} markets)")]
    AllQuotesFailed { event: String, count: usize },

    #[error("Quote fetch failed for {ticker}: {reason}")]
    QuoteFailed { ticker: String, reason: String },

    #[error("Invalid quote for {ticker}: {reason}")]
    InvalidQuote { ticker: String, reason: String },

    #[error("Order rejected for {ticker}: {reason}")]
    OrderRejected { ticker: String, reason: String },
}

impl ScoutError {
    pub(crate) fn malformed(input: &str, reason: &str) -> Self {
        ScoutError::MalformedInput {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
