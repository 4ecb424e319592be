//! Plain-text rendering of snapshots and recommendations.

use rust_decimal_macros::dec;

use crate::types::{MarketSnapshot, QuoteState, Recommendation};

const TICKER_WIDTH: usize = 32;
const PRICE_WIDTH: usize = 10;

/// Comparison table with fixed columns, one row per market in snapshot order.
pub fn render_snapshot(snapshot: &MarketSnapshot) -> String {
    let mut out = format!(
        "COMPARISON SUMMARY: {} ({} markets, {} failed)\n",
        snapshot.event,
        snapshot.len(),
        snapshot.failed_count(),
    );

    out.push_str(&format!(
        "{:<tw$}{:<pw$}{:<pw$}{:<pw$}{:<pw$}{:<pw$}\n",
        "Ticker",
        "Yes Bid",
        "Yes Ask",
        "No Bid",
        "No Ask",
        "Last",
        tw = TICKER_WIDTH,
        pw = PRICE_WIDTH,
    ));
    out.push_str(&"-".repeat(TICKER_WIDTH + 5 * PRICE_WIDTH));
    out.push('\n');

    for row in &snapshot.rows {
        let ticker = truncate(row.ticker.as_str(), TICKER_WIDTH - 2);
        let line = match &row.quote {
            QuoteState::Quoted(q) => format!(
                "{:<tw$}{:<pw$}{:<pw$}{:<pw$}{:<pw$}{:<pw$}",
                ticker,
                q.yes_bid,
                q.yes_ask,
                q.no_bid,
                q.no_ask,
                q.last_price,
                tw = TICKER_WIDTH,
                pw = PRICE_WIDTH,
            ),
            QuoteState::Failed { reason } => {
                format!("{:<tw$}ERROR: {reason}", ticker, tw = TICKER_WIDTH)
            }
            QuoteState::Pending => format!("{:<tw$}(not quoted)", ticker, tw = TICKER_WIDTH),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Numbered list of recommendations.
pub fn render_recommendations(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return "No betting opportunities found based on current analysis\n".to_string();
    }

    let mut out = format!(
        "BETTING RECOMMENDATIONS ({} opportunities):\n{}\n",
        recommendations.len(),
        "=".repeat(80),
    );
    for (i, rec) in recommendations.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   Ticker: {}\n   Recommendation: BET {}\n   Confidence: {:.1}%\n   \
             Current Price: {}¢\n   Reasoning: {}\n",
            i + 1,
            rec.quote.title,
            rec.ticker(),
            rec.side,
            rec.confidence * dec!(100),
            rec.entry_price(),
            rec.rationale,
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
