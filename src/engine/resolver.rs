//! Ticker resolution.
//!
//! Turns whatever the operator pasted (a full Kalshi URL or a bare ticker)
//! into a canonical `Ticker`.

use tracing::debug;

use crate::types::{has_ticker_chars, ScoutError, Ticker};

/// Route prefixes of kalshi.com / demo.kalshi.co links, never tickers.
const ROUTE_SEGMENTS: [&str; 5] = ["markets", "trade", "event", "events", "series"];

fn is_route_segment(segment: &str) -> bool {
    ROUTE_SEGMENTS.iter().any(|r| r.eq_ignore_ascii_case(segment))
}

/// A path segment that can only be a ticker: ticker characters plus at
/// least one digit or hyphen, so slugs like `conjuring` are skipped.
fn is_ticker_shaped(segment: &str) -> bool {
    has_ticker_chars(segment) && segment.chars().any(|c| c.is_ascii_digit() || c == '-')
}

/// Path segments of `url` after dropping scheme, host, query and fragment.
fn path_segments(url: &str) -> Vec<&str> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map_or("", |(_, path)| path),
        None => url,
    };
    path.split('/')
        .filter(|s| !s.is_empty() && !is_route_segment(s))
        .collect()
}

/// Resolve a market URL or raw ticker.
///
/// Input without `/` is a raw ticker. Otherwise the last path segment is
/// the ticker, provided it uses ticker characters. When it does not, the
/// last ticker-shaped segment before it is used instead.
pub fn resolve(input: &str) -> Result<Ticker, ScoutError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScoutError::malformed(input, "input is empty"));
    }

    if !trimmed.contains('/') {
        let ticker = Ticker::parse(trimmed)?;
        debug!(ticker = %ticker, "Resolved raw ticker");
        return Ok(ticker);
    }

    let segments = path_segments(trimmed);
    let segment = match segments.last() {
        Some(last) if has_ticker_chars(last) => *last,
        _ => segments
            .iter()
            .rev()
            .copied()
            .find(|s| is_ticker_shaped(s))
            .ok_or_else(|| ScoutError::malformed(input, "no ticker found in URL path"))?,
    };

    let ticker = Ticker::parse(segment)?;
    debug!(input = %trimmed, ticker = %ticker, "Resolved ticker from URL");
    Ok(ticker)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
