//! Resolve → expand → quote → advise against the mock venue.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

use kalshi_scout::engine::aggregator::QuoteAggregator;
use kalshi_scout::engine::expander::{derive_event, EventExpander};
use kalshi_scout::engine::report::render_snapshot;
use kalshi_scout::engine::resolver;
use kalshi_scout::platforms::MarketVenue;
use kalshi_scout::signals::spread::SpreadHeuristic;
use kalshi_scout::signals::ConfidenceSource;
use kalshi_scout::strategy::{AdvisorConfig, BettingAdvisor};
use kalshi_scout::types::{MarketQuote, MarketSnapshot, QuoteState, ScoutError, Side, Ticker};

use crate::mock_venue::{levels, ticker, MockVenue};

/// Fixed per-ticker probabilities; unknown tickers echo the market.
struct FixedSignal(HashMap<Ticker, Decimal>);

impl FixedSignal {
    fn new(entries: &[(&str, Decimal)]) -> Self {
        Self(entries.iter().map(|(t, p)| (ticker(t), *p)).collect())
    }
}

#[async_trait]
impl ConfidenceSource for FixedSignal {
    async fn probability_yes(&self, quote: &MarketQuote) -> Result<Decimal> {
        Ok(self
            .0
            .get(&quote.ticker)
            .copied()
            .unwrap_or_else(|| quote.implied_probability_yes()))
    }
}

async fn scan(venue: Arc<MockVenue>, input: &str, concurrency: usize) -> Result<MarketSnapshot, ScoutError> {
    let venue: Arc<dyn MarketVenue> = venue;
    let ticker = resolver::resolve(input)?;
    let snapshot = EventExpander::new(Arc::clone(&venue)).expand(&ticker).await?;
    QuoteAggregator::new(venue, concurrency).fetch_quotes(snapshot).await
}

fn row_tickers(snapshot: &MarketSnapshot) -> Vec<&str> {
    snapshot.tickers().map(Ticker::as_str).collect()
}

#[test]
fn test_resolve_demo_trade_url() {
    let t = resolver::resolve("https://demo.kalshi.co/trade/KXQUICKSETTLE-25SEP01H1500-3").unwrap();
    assert_eq!(t.as_str(), "KXQUICKSETTLE-25SEP01H1500-3");
}

#[test]
fn test_resolve_raw_ticker_unchanged() {
    let t = resolver::resolve("KXDOGED-25SEP0113-T0.2149999").unwrap();
    assert_eq!(t.as_str(), "KXDOGED-25SEP0113-T0.2149999");

    let lower = resolver::resolve("kxdoged-25sep0113-t0.2149999").unwrap();
    assert_eq!(lower, t);
}

#[test]
fn test_resolve_url_ending_in_event_ticker() {
    let t = resolver::resolve(
        "https://kalshi.com/markets/kxrttronares/tron-ares-rotten-tomatoes-score/kxrttronares",
    )
    .unwrap();
    assert_eq!(t.as_str(), "KXRTTRONARES");

    for depth in ["", "/a", "/a/b/c"] {
        let url = format!("https://kalshi.com{depth}/markets/kxrtconjuring");
        assert_eq!(resolver::resolve(&url).unwrap().as_str(), "KXRTCONJURING", "{url}");
    }
}

#[tokio::test]
async fn test_event_url_scans_whole_event() {
    let venue = Arc::new(MockVenue::new(1_000));
    let snapshot = scan(venue, "https://kalshi.com/markets/kxrtconjuring", 4)
        .await
        .unwrap();
    assert_eq!(snapshot.event.as_str(), "KXRTCONJURING");
    assert_eq!(snapshot.len(), 3);
}

#[tokio::test]
async fn test_expand_conjuring_event_in_venue_order() {
    let venue = Arc::new(MockVenue::new(1_000));
    let expander = EventExpander::new(venue.clone());

    let snapshot = expander.expand(&ticker("KXRTCONJURING-60")).await.unwrap();

    assert_eq!(snapshot.event.as_str(), "KXRTCONJURING");
    assert_eq!(
        row_tickers(&snapshot),
        vec!["KXRTCONJURING-60", "KXRTCONJURING-70", "KXRTCONJURING-80"]
    );
    assert!(snapshot.rows.iter().all(|r| r.quote == QuoteState::Pending));
    assert_eq!(venue.listed_events()[0].as_str(), "KXRTCONJURING");
}

#[tokio::test]
async fn test_one_quote_failure_is_isolated() {
    let venue = Arc::new(MockVenue::new(1_000));
    venue.fail_quote("KXRTCONJURING-70");

    let snapshot = scan(venue, "KXRTCONJURING-60", 4).await.unwrap();

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.quotes().count(), 2);
    assert_eq!(snapshot.failed_count(), 1);
    assert!(snapshot.rows[1].error().unwrap().contains("503"));
    assert_eq!(snapshot.rows[0].quote().unwrap().yes_ask, 46);
    assert_eq!(snapshot.rows[2].quote().unwrap().yes_ask, 12);
}

#[tokio::test]
async fn test_order_and_length_preserved_for_any_concurrency() {
    let mut venue = MockVenue::empty(0);
    for strike in (10..=90).step_by(10) {
        venue.add_market(
            &format!("KXHIGHNY-25SEP01-T{strike}"),
            &format!("{strike}°F or above"),
            levels(strike - 5, strike, 95 - strike, 100 - strike),
        );
    }
    let venue = Arc::new(venue);
    venue.fail_quote("KXHIGHNY-25SEP01-T40");

    let expected: Vec<String> = (10..=90)
        .step_by(10)
        .map(|s| format!("KXHIGHNY-25SEP01-T{s}"))
        .collect();

    for concurrency in [1, 3, 16] {
        let snapshot = scan(venue.clone(), "https://kalshi.com/markets/kxhighny/kxhighny-25sep01-t50", concurrency)
            .await
            .unwrap();
        assert_eq!(snapshot.event.as_str(), "KXHIGHNY-25SEP01");
        assert_eq!(row_tickers(&snapshot), expected);
        assert_eq!(snapshot.failed_count(), 1);
        assert!(snapshot.rows[3].error().is_some());
    }
}

#[tokio::test]
async fn test_all_quotes_failing_fails_the_scan() {
    let venue = Arc::new(MockVenue::new(1_000));
    for strike in [60, 70, 80] {
        venue.fail_quote(&format!("KXRTCONJURING-{strike}"));
    }

    let err = scan(venue, "KXRTCONJURING-60", 4).await.unwrap_err();
    assert!(matches!(err, ScoutError::AllQuotesFailed { count: 3, .. }));
}

#[tokio::test]
async fn test_unknown_event_reports_no_markets() {
    let venue = Arc::new(MockVenue::new(1_000));
    let err = scan(venue, "KXNOSUCHEVENT-1", 4).await.unwrap_err();
    assert!(matches!(err, ScoutError::NoMarketsFound { ref event } if event == "KXNOSUCHEVENT"));
}

#[tokio::test]
async fn test_listing_outage_is_venue_unavailable() {
    let venue = Arc::new(MockVenue::new(1_000));
    venue.set_error("connection reset");
    let err = scan(venue, "KXRTCONJURING-60", 4).await.unwrap_err();
    assert!(matches!(err, ScoutError::VenueUnavailable { .. }));
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn test_malformed_input_never_reaches_venue() {
    let venue = Arc::new(MockVenue::new(1_000));
    let err = scan(venue.clone(), "https://kalshi.com/markets/", 4).await.unwrap_err();
    assert!(matches!(err, ScoutError::MalformedInput { .. }));
    assert!(venue.listed_events().is_empty());
}

#[tokio::test]
async fn test_advisor_recommends_yes_on_signal_edge() {
    let venue = Arc::new(MockVenue::new(1_000));
    let snapshot = scan(venue, "KXRTCONJURING-60", 4).await.unwrap();

    // Market implies 45% on -60; the signal says 75%.
    let signal = FixedSignal::new(&[("KXRTCONJURING-60", dec!(0.75))]);
    let advisor = BettingAdvisor::new(AdvisorConfig::default());
    let recs = advisor.recommend(&snapshot, &signal).await;

    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].ticker().as_str(), "KXRTCONJURING-60");
    assert_eq!(recs[0].side, Side::Yes);
    assert_eq!(recs[0].confidence, dec!(0.75));
    assert_eq!(recs[0].entry_price(), 46);
}

#[tokio::test]
async fn test_advisor_ranks_by_confidence() {
    let venue = Arc::new(MockVenue::new(1_000));
    let snapshot = scan(venue, "KXRTCONJURING-60", 4).await.unwrap();

    let signal = FixedSignal::new(&[
        ("KXRTCONJURING-60", dec!(0.70)),
        // 32.5% market vs 10% model: NO at 90% confidence.
        ("KXRTCONJURING-70", dec!(0.10)),
    ]);
    let recs = BettingAdvisor::new(AdvisorConfig::default())
        .recommend(&snapshot, &signal)
        .await;

    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0].ticker().as_str(), "KXRTCONJURING-70");
    assert_eq!(recs[0].side, Side::No);
    assert_eq!(recs[0].confidence, dec!(0.90));
    assert_eq!(recs[0].entry_price(), 70);
    assert_eq!(recs[1].ticker().as_str(), "KXRTCONJURING-60");
    assert_eq!(recs[1].side, Side::Yes);
}

#[tokio::test]
async fn test_spread_heuristic_end_to_end() {
    let mut venue = MockVenue::empty(1_000);
    // Tight YES book with a strong bid.
    venue.add_market("KXEVT-25OCT01-A", "A", levels(40, 42, 50, 60));
    // Balanced book: no opinion.
    venue.add_market("KXEVT-25OCT01-B", "B", levels(48, 50, 50, 52));
    let venue = Arc::new(venue);

    let snapshot = scan(venue, "KXEVT-25OCT01-A", 2).await.unwrap();
    let recs = BettingAdvisor::new(AdvisorConfig::default())
        .recommend(&snapshot, &SpreadHeuristic::default())
        .await;

    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].ticker().as_str(), "KXEVT-25OCT01-A");
    assert_eq!(recs[0].side, Side::Yes);
}

#[tokio::test]
async fn test_comparison_table_lists_every_row() {
    let venue = Arc::new(MockVenue::new(1_000));
    venue.fail_quote("KXRTCONJURING-80");
    let snapshot = scan(venue, "KXRTCONJURING-70", 4).await.unwrap();

    let table = render_snapshot(&snapshot);
    assert!(table.starts_with("COMPARISON SUMMARY: KXRTCONJURING (3 markets, 1 failed)"));
    let pos = |t: &str| table.find(t).unwrap();
    assert!(pos("KXRTCONJURING-60") < pos("KXRTCONJURING-70"));
    assert!(pos("KXRTCONJURING-70") < pos("KXRTCONJURING-80"));
    assert!(table.contains("ERROR: "));
}

#[test]
fn test_event_derivation_matches_listing_prefix() {
    for raw in ["KXRTCONJURING-60", "KXHIGHNY-25SEP01-T50", "KXQUICKSETTLE-25SEP01H1500-3"] {
        let t = ticker(raw);
        assert!(t.belongs_to(&derive_event(&t)), "{raw}");
    }
}
