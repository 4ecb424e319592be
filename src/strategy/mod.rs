//! Betting strategy.
//!
//! Turns aggregated quotes plus an external confidence signal into ranked
//! recommendations. Sizing is not a strategy concern: every order is a
//! single contract, enforced by the order workflow.

pub mod advisor;

pub use advisor::{AdvisorConfig, BettingAdvisor};
