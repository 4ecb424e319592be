//! Guarded order workflow against the mock venue.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;

use kalshi_scout::engine::aggregator::QuoteAggregator;
use kalshi_scout::engine::expander::EventExpander;
use kalshi_scout::engine::workflow::{GuardedOrderWorkflow, OperatorPrompt, ORDER_QUANTITY};
use kalshi_scout::platforms::MarketVenue;
use kalshi_scout::signals::ConfidenceSource;
use kalshi_scout::strategy::{AdvisorConfig, BettingAdvisor};
use kalshi_scout::types::{MarketQuote, OrderStatus, Recommendation, Side};

use crate::mock_venue::{ticker, MockVenue};

/// Replays canned answers; `None` once they run out.
struct ScriptedPrompt {
    answers: VecDeque<String>,
    questions: Vec<String>,
    shown: Vec<String>,
}

impl ScriptedPrompt {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            questions: Vec::new(),
            shown: Vec::new(),
        }
    }

    fn shown_text(&self) -> String {
        self.shown.join("\n")
    }
}

#[async_trait]
impl OperatorPrompt for ScriptedPrompt {
    fn show(&mut self, text: &str) {
        self.shown.push(text.to_string());
    }

    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front())
    }
}

/// Bullish on everything.
struct Confident;

#[async_trait]
impl ConfidenceSource for Confident {
    async fn probability_yes(&self, _quote: &MarketQuote) -> Result<Decimal> {
        Ok(dec!(0.95))
    }
}

/// Scan the Conjuring event and recommend YES on all three strikes
/// (-60 at 46¢, -70 at 35¢, -80 at 12¢).
async fn recommendations(venue: &Arc<MockVenue>) -> Vec<Recommendation> {
    let dyn_venue: Arc<dyn MarketVenue> = venue.clone();
    let snapshot = EventExpander::new(Arc::clone(&dyn_venue))
        .expand(&ticker("KXRTCONJURING-60"))
        .await
        .unwrap();
    let snapshot = QuoteAggregator::new(dyn_venue, 4)
        .fetch_quotes(snapshot)
        .await
        .unwrap();
    let recs = BettingAdvisor::new(AdvisorConfig::default())
        .recommend(&snapshot, &Confident)
        .await;
    assert_eq!(recs.len(), 3);
    recs
}

fn workflow(venue: &Arc<MockVenue>) -> GuardedOrderWorkflow {
    GuardedOrderWorkflow::new(venue.clone())
}

#[tokio::test]
async fn test_place_then_abort_stops_queue() {
    let venue = Arc::new(MockVenue::new(1_000));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["proceed", "yes", "abort"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].status, OrderStatus::Placed);
    assert!(report.results[0].order_id.as_deref().unwrap().starts_with("MOCK-"));
    assert_eq!(report.results[1].status, OrderStatus::Aborted);
    assert_eq!(report.results[1].ticker.as_str(), "KXRTCONJURING-70");
    assert!(report.was_aborted());
    assert_eq!(report.not_presented(), 1);

    // Third item was never presented.
    assert_eq!(prompt.questions.len(), 3);
    assert!(!prompt.shown_text().contains("KXRTCONJURING-80"));

    let orders = venue.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].ticker.as_str(), "KXRTCONJURING-60");
    assert_eq!(orders[0].side, Side::Yes);
    assert_eq!(orders[0].quantity, 1);
    assert_eq!(orders[0].price_cents, 46);
}

#[tokio::test]
async fn test_every_order_is_one_contract() {
    let venue = Arc::new(MockVenue::new(1_000));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["y", "y", "y", "y", "y", "y"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    assert_eq!(report.count(OrderStatus::Placed), 3);
    let orders = venue.orders();
    assert_eq!(orders.len(), 3);
    assert!(orders.iter().all(|o| o.quantity == ORDER_QUANTITY && o.quantity == 1));
    assert_eq!(
        orders.iter().map(|o| o.price_cents).collect::<Vec<_>>(),
        vec![46, 35, 12]
    );
    assert_eq!(venue.balance(), 1_000 - 46 - 35 - 12);
    assert!(prompt.shown_text().contains("Available balance: $10.00"));
}

#[tokio::test]
async fn test_rejection_does_not_stop_queue() {
    let venue = Arc::new(MockVenue::new(1_000));
    venue.reject_orders_for("KXRTCONJURING-60");
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["yes", "yes", "yes", "yes", "yes", "yes"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    let statuses: Vec<OrderStatus> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Rejected, OrderStatus::Placed, OrderStatus::Placed]
    );
    assert!(report.results[0].detail.as_deref().unwrap().contains("closed"));
    assert!(report.results[0].order_id.is_none());
    assert_eq!(venue.orders().len(), 2);
}

#[tokio::test]
async fn test_insufficient_balance_is_rejected() {
    let venue = Arc::new(MockVenue::new(20));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["y", "y", "s", "y", "y"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    assert_eq!(report.results[0].status, OrderStatus::Rejected);
    assert!(report.results[0].detail.as_deref().unwrap().contains("Insufficient"));
    assert_eq!(report.results[1].status, OrderStatus::Skipped);
    assert_eq!(report.results[2].status, OrderStatus::Placed);
    assert_eq!(venue.balance(), 8);
}

#[tokio::test]
async fn test_stage_two_no_skips_only_that_item() {
    let venue = Arc::new(MockVenue::new(1_000));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["y", "n", "y", "y", "skip"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    let statuses: Vec<OrderStatus> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Skipped, OrderStatus::Placed, OrderStatus::Skipped]
    );
    assert!(!report.was_aborted());
    let orders = venue.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].ticker.as_str(), "KXRTCONJURING-70");
}

#[tokio::test]
async fn test_stage_one_no_aborts_everything() {
    let venue = Arc::new(MockVenue::new(1_000));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["no", "y", "y"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, OrderStatus::Aborted);
    assert_eq!(report.not_presented(), 2);
    assert!(venue.orders().is_empty());
}

#[tokio::test]
async fn test_closed_input_aborts() {
    let venue = Arc::new(MockVenue::new(1_000));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["y"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, OrderStatus::Aborted);
    assert!(venue.orders().is_empty());
}

#[tokio::test]
async fn test_repeated_invalid_answers_skip_item() {
    let venue = Arc::new(MockVenue::new(1_000));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["maybe", "later", "dunno", "y", "y", "q"]);

    let report = workflow(&venue).run(&recs, &mut prompt).await;

    let statuses: Vec<OrderStatus> = report.results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Skipped, OrderStatus::Placed, OrderStatus::Aborted]
    );
    assert_eq!(venue.orders().len(), 1);
}

#[tokio::test]
async fn test_no_recommendations_places_nothing() {
    let venue = Arc::new(MockVenue::new(1_000));
    let mut prompt = ScriptedPrompt::new(&["y", "y"]);

    let report = workflow(&venue).run(&[], &mut prompt).await;

    assert!(report.results.is_empty());
    assert!(prompt.questions.is_empty());
    assert!(prompt.shown_text().contains("No betting opportunities"));
    assert!(venue.orders().is_empty());
}

#[tokio::test]
async fn test_summary_lists_outcomes() {
    let venue = Arc::new(MockVenue::new(1_000));
    let recs = recommendations(&venue).await;
    let mut prompt = ScriptedPrompt::new(&["y", "y", "abort"]);

    let summary = workflow(&venue).run(&recs, &mut prompt).await.to_string();

    assert!(summary.starts_with("BETTING SUMMARY"));
    assert!(summary.contains("Placed:                1"));
    assert!(summary.contains("Not presented:         1"));
    assert!(summary.contains("PLACED YES KXRTCONJURING-60"));
}
