//! Mispricing advisor.
//!
//! Compares an external P(YES) estimate with each market's implied
//! probability (the yes bid/ask midpoint) and recommends the side the
//! estimate favours when the gap exceeds the edge threshold.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::signals::ConfidenceSource;
use crate::types::{MarketQuote, MarketSnapshot, Recommendation, Side};

/// Advisor settings (overridden by config.toml at runtime).
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Minimum absolute edge, as a probability (0.10 = 10 percentage points).
    pub edge_threshold: Decimal,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            edge_threshold: dec!(0.10),
        }
    }
}

pub struct BettingAdvisor {
    config: AdvisorConfig,
}

impl BettingAdvisor {
    pub fn new(config: AdvisorConfig) -> Self {
        Self { config }
    }

    /// Produce recommendations for every quoted market of `snapshot`.
    ///
    /// Ordered by descending confidence, ties by ascending ticker. Markets
    /// without a quote, or whose signal fails, are skipped.
    pub async fn recommend(
        &self,
        snapshot: &MarketSnapshot,
        source: &dyn ConfidenceSource,
    ) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        for quote in snapshot.quotes() {
            let probability = match source.probability_yes(quote).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(ticker = %quote.ticker, error = %e, "Confidence source failed, skipping market");
                    continue;
                }
            };
            if let Some(rec) = self.evaluate(quote, probability) {
                recommendations.push(rec);
            }
        }

        recommendations.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.quote.ticker.cmp(&b.quote.ticker))
        });

        info!(
            event = %snapshot.event,
            markets = snapshot.len(),
            recommendations = recommendations.len(),
            "Betting analysis complete"
        );

        recommendations
    }

    /// Check one market against a model probability.
    fn evaluate(&self, quote: &MarketQuote, model_yes: Decimal) -> Option<Recommendation> {
        if model_yes < Decimal::ZERO || model_yes > Decimal::ONE {
            warn!(ticker = %quote.ticker, probability = %model_yes, "Probability outside [0, 1], ignoring");
            return None;
        }

        let market_yes = quote.implied_probability_yes();
        let signed_edge = model_yes - market_yes;
        let edge = signed_edge.abs();

        if edge <= self.config.edge_threshold {
            debug!(
                ticker = %quote.ticker,
                edge = %format!("{:.1}pp", edge * dec!(100)),
                threshold = %format!("{:.1}pp", self.config.edge_threshold * dec!(100)),
                "Edge below threshold"
            );
            return None;
        }

        let (side, confidence) = if signed_edge > Decimal::ZERO {
            (Side::Yes, model_yes)
        } else {
            (Side::No, Decimal::ONE - model_yes)
        };

        let rationale = format!(
            "Model puts YES at {:.1}% vs market {:.1}%: {:.1}pp edge favours {side}",
            model_yes * dec!(100),
            market_yes * dec!(100),
            edge * dec!(100),
        );

        debug!(ticker = %quote.ticker, side = %side, %confidence, "Edge detected");

        Some(Recommendation {
            quote: quote.clone(),
            side,
            confidence,
            edge,
            rationale,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
