//! Guarded order workflow.
//!
//! Walks the operator through recommendations one at a time:
//!
//! ```text
//! PRESENTED --proceed--> STAGE1_PENDING --place--> STAGE2_PENDING --ok--> PLACED
//!     |                       |                         `--error--> REJECTED
//!     |-- skip --> SKIPPED    |-- no/skip --> SKIPPED
//!     `-- no/abort --> ABORTED `-- abort --> ABORTED (ends the whole queue)
//! ```
//!
//! Every order is a limit buy of exactly `ORDER_QUANTITY` contracts. The
//! quantity is not an input anywhere in this module.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal_macros::dec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::platforms::MarketVenue;
use crate::types::{cents_to_dollars, OrderResult, OrderStatus, Recommendation, ScoutError};

/// Contracts per order. Hard ceiling, never derived from confidence or input.
pub const ORDER_QUANTITY: u32 = 1;

/// Unrecognised answers tolerated at one prompt before the item is skipped.
const MAX_INVALID_ANSWERS: usize = 3;

// ---------------------------------------------------------------------------
// Operator interaction
// ---------------------------------------------------------------------------

/// Line-oriented channel to the human operator.
#[async_trait]
pub trait OperatorPrompt: Send {
    /// Show informational text.
    fn show(&mut self, text: &str);

    /// Ask a question and wait for one line. `None` means input is closed.
    async fn ask(&mut self, question: &str) -> Result<Option<String>>;
}

/// Operator answer at a confirmation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Move to the next gate for this item.
    Continue,
    /// Drop this item, keep going with the queue.
    Skip,
    /// Drop this item and everything after it.
    Abort,
}

/// The two confirmation gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Stage 1: intent to trade this recommendation.
    Intent,
    /// Stage 2: final commit of the order.
    Commit,
}

impl Gate {
    fn question(&self, intent: &OrderIntent<'_>) -> String {
        match self {
            Gate::Intent => format!(
                "Proceed with betting {} contract on {}? (yes/skip/no)",
                intent.quantity(),
                intent.recommendation().ticker(),
            ),
            Gate::Commit => "Do you want to place this bet? (yes/no/abort)".to_string(),
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Gate::Intent => "Please enter 'yes', 'skip' or 'no' (no aborts all remaining bets)",
            Gate::Commit => "Please enter 'yes', 'no' or 'abort'",
        }
    }

    /// Interpret an answer. At stage 1 "no" aborts the queue; at stage 2
    /// "no" only skips this bet.
    pub fn parse(&self, answer: &str) -> Option<Decision> {
        let answer = answer.trim().to_lowercase();
        match (self, answer.as_str()) {
            (_, "yes" | "y") => Some(Decision::Continue),
            (Gate::Intent, "proceed" | "p") => Some(Decision::Continue),
            (_, "skip" | "s") => Some(Decision::Skip),
            (Gate::Commit, "no" | "n") => Some(Decision::Skip),
            (Gate::Intent, "no" | "n") => Some(Decision::Abort),
            (_, "abort" | "a" | "quit" | "q") => Some(Decision::Abort),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Presented,
    Stage1Pending,
    Stage2Pending,
    Placed,
    Rejected,
    Skipped,
    Aborted,
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Placed
                | WorkflowState::Rejected
                | WorkflowState::Skipped
                | WorkflowState::Aborted
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Presented => "PRESENTED",
            WorkflowState::Stage1Pending => "STAGE1_PENDING",
            WorkflowState::Stage2Pending => "STAGE2_PENDING",
            WorkflowState::Placed => "PLACED",
            WorkflowState::Rejected => "REJECTED",
            WorkflowState::Skipped => "SKIPPED",
            WorkflowState::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// In-progress bet for one recommendation. Lives for one iteration only.
#[derive(Debug)]
pub struct OrderIntent<'a> {
    recommendation: &'a Recommendation,
    confirmed_stage1: bool,
    confirmed_stage2: bool,
}

impl<'a> OrderIntent<'a> {
    fn new(recommendation: &'a Recommendation) -> Self {
        Self {
            recommendation,
            confirmed_stage1: false,
            confirmed_stage2: false,
        }
    }

    pub fn recommendation(&self) -> &Recommendation {
        self.recommendation
    }

    pub fn quantity(&self) -> u32 {
        ORDER_QUANTITY
    }

    pub fn price_cents(&self) -> u32 {
        self.recommendation.entry_price()
    }

    pub fn total_cost_cents(&self) -> u32 {
        self.price_cents() * self.quantity()
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_stage1 && self.confirmed_stage2
    }
}

/// Ordered outcomes of one workflow run.
#[derive(Debug, Clone, Default)]
pub struct WorkflowReport {
    pub total_recommendations: usize,
    pub results: Vec<OrderResult>,
}

impl WorkflowReport {
    pub fn count(&self, status: OrderStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn was_aborted(&self) -> bool {
        self.count(OrderStatus::Aborted) > 0
    }

    /// Recommendations never presented because of an abort.
    pub fn not_presented(&self) -> usize {
        self.total_recommendations - self.results.len()
    }
}

impl fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BETTING SUMMARY")?;
        writeln!(f, "{}", "=".repeat(30))?;
        writeln!(f, "Total recommendations: {}", self.total_recommendations)?;
        writeln!(f, "Presented:             {}", self.results.len())?;
        writeln!(f, "Placed:                {}", self.count(OrderStatus::Placed))?;
        writeln!(f, "Rejected:              {}", self.count(OrderStatus::Rejected))?;
        writeln!(f, "Skipped:               {}", self.count(OrderStatus::Skipped))?;
        writeln!(f, "Aborted:               {}", self.count(OrderStatus::Aborted))?;
        if self.not_presented() > 0 {
            writeln!(f, "Not presented:         {}", self.not_presented())?;
        }
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

pub struct GuardedOrderWorkflow {
    venue: Arc<dyn MarketVenue>,
}

impl GuardedOrderWorkflow {
    pub fn new(venue: Arc<dyn MarketVenue>) -> Self {
        Self { venue }
    }

    /// Run every recommendation through the confirmation gates, in order.
    ///
    /// Stops at the first abort; the aborted item is the last result.
    pub async fn run(
        &self,
        recommendations: &[Recommendation],
        prompt: &mut dyn OperatorPrompt,
    ) -> WorkflowReport {
        let mut report = WorkflowReport {
            total_recommendations: recommendations.len(),
            results: Vec::new(),
        };

        if recommendations.is_empty() {
            prompt.show("No betting opportunities found based on current analysis");
            return report;
        }

        self.show_balance(prompt).await;

        for (index, recommendation) in recommendations.iter().enumerate() {
            let result = self
                .process(index + 1, recommendations.len(), recommendation, prompt)
                .await;
            prompt.show(&format!("→ {result}"));

            let aborted = result.status == OrderStatus::Aborted;
            report.results.push(result);

            if aborted {
                info!(
                    remaining = recommendations.len() - index - 1,
                    "Operator aborted; no further orders will be placed"
                );
                break;
            }
        }

        info!(
            placed = report.count(OrderStatus::Placed),
            rejected = report.count(OrderStatus::Rejected),
            skipped = report.count(OrderStatus::Skipped),
            aborted = report.was_aborted(),
            "Betting workflow complete"
        );

        report
    }

    /// Drive one recommendation from PRESENTED to a terminal state.
    async fn process(
        &self,
        position: usize,
        total: usize,
        recommendation: &Recommendation,
        prompt: &mut dyn OperatorPrompt,
    ) -> OrderResult {
        let mut intent = OrderIntent::new(recommendation);
        let mut state = WorkflowState::Presented;
        let mut order_id = None;
        let mut detail = None;

        prompt.show(&present(position, total, &intent));

        while !state.is_terminal() {
            let next = match state {
                WorkflowState::Presented => {
                    match self.confirm(Gate::Intent, &intent, prompt).await {
                        Decision::Continue => {
                            intent.confirmed_stage1 = true;
                            WorkflowState::Stage1Pending
                        }
                        Decision::Skip => WorkflowState::Skipped,
                        Decision::Abort => WorkflowState::Aborted,
                    }
                }
                WorkflowState::Stage1Pending => {
                    prompt.show(&format!(
                        "You will bet {} contract of {} at {}¢ each. Total cost: ${:.2}",
                        intent.quantity(),
                        recommendation.side,
                        intent.price_cents(),
                        cents_to_dollars(intent.total_cost_cents()),
                    ));
                    match self.confirm(Gate::Commit, &intent, prompt).await {
                        Decision::Continue => {
                            intent.confirmed_stage2 = true;
                            WorkflowState::Stage2Pending
                        }
                        Decision::Skip => WorkflowState::Skipped,
                        Decision::Abort => WorkflowState::Aborted,
                    }
                }
                WorkflowState::Stage2Pending => match self.submit(&intent).await {
                    Ok(id) => {
                        order_id = Some(id);
                        WorkflowState::Placed
                    }
                    Err(e) => {
                        warn!(ticker = %recommendation.ticker(), error = %e, "Order rejected");
                        detail = Some(e.to_string());
                        WorkflowState::Rejected
                    }
                },
                terminal => terminal,
            };

            debug!(
                ticker = %recommendation.ticker(),
                from = %state,
                to = %next,
                "Workflow transition"
            );
            state = next;
        }

        let status = match state {
            WorkflowState::Placed => OrderStatus::Placed,
            WorkflowState::Rejected => OrderStatus::Rejected,
            WorkflowState::Aborted => OrderStatus::Aborted,
            _ => OrderStatus::Skipped,
        };

        info!(ticker = %recommendation.ticker(), status = %status, "Recommendation finished");

        OrderResult {
            ticker: recommendation.ticker().clone(),
            side: recommendation.side,
            order_id,
            status,
            detail,
            timestamp: Utc::now(),
        }
    }

    /// Ask one gate's question until a valid answer arrives.
    async fn confirm(
        &self,
        gate: Gate,
        intent: &OrderIntent<'_>,
        prompt: &mut dyn OperatorPrompt,
    ) -> Decision {
        let question = gate.question(intent);

        for _ in 0..MAX_INVALID_ANSWERS {
            let answer = match prompt.ask(&question).await {
                Ok(Some(answer)) => answer,
                Ok(None) => {
                    warn!(ticker = %intent.recommendation().ticker(), "Operator input closed, aborting");
                    return Decision::Abort;
                }
                Err(e) => {
                    warn!(ticker = %intent.recommendation().ticker(), error = %e, "Prompt failed, aborting");
                    return Decision::Abort;
                }
            };

            match gate.parse(&answer) {
                Some(decision) => return decision,
                None => prompt.show(gate.hint()),
            }
        }

        warn!(
            ticker = %intent.recommendation().ticker(),
            gate = ?gate,
            "Too many invalid answers, skipping"
        );
        Decision::Skip
    }

    /// Submit the confirmed intent to the venue.
    async fn submit(&self, intent: &OrderIntent<'_>) -> Result<String, ScoutError> {
        let recommendation = intent.recommendation();
        let ticker = recommendation.ticker();

        if !intent.is_confirmed() {
            return Err(ScoutError::OrderRejected {
                ticker: ticker.to_string(),
                reason: "order was not confirmed at both stages".to_string(),
            });
        }

        let price = intent.price_cents();
        if price == 0 || price >= 100 {
            return Err(ScoutError::OrderRejected {
                ticker: ticker.to_string(),
                reason: format!("no tradable {} ask (ask = {price}¢)", recommendation.side),
            });
        }

        info!(
            ticker = %ticker,
            side = %recommendation.side,
            quantity = intent.quantity(),
            price_cents = price,
            "Placing order"
        );

        self.venue
            .place_order(ticker, recommendation.side, intent.quantity(), price)
            .await
            .map(|ack| ack.order_id)
            .map_err(|e| ScoutError::OrderRejected {
                ticker: ticker.to_string(),
                reason: format!("{e:#}"),
            })
    }

    async fn show_balance(&self, prompt: &mut dyn OperatorPrompt) {
        match self.venue.get_balance().await {
            Ok(cents) => prompt.show(&format!("Available balance: ${:.2}", cents_to_dollars(cents))),
            Err(e) => {
                warn!(error = %e, "Could not retrieve account balance");
                prompt.show("Could not retrieve account balance");
            }
        }
    }
}

/// Operator-facing description of one recommendation.
fn present(position: usize, total: usize, intent: &OrderIntent<'_>) -> String {
    let rec = intent.recommendation();
    format!(
        "\nBET CONFIRMATION ({position}/{total})\n{}\nMarket: {}\nTicker: {}\nSide: {}\n\
         Confidence: {:.1}%\nCurrent Price: {}¢\nReasoning: {}\n\
         SAFETY LIMIT: betting exactly {} contract",
        "=".repeat(50),
        rec.quote.title,
        rec.ticker(),
        rec.side,
        rec.confidence * dec!(100),
        intent.price_cents(),
        rec.rationale,
        intent.quantity(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
