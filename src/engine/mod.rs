//! Core engine: resolve, expand, quote, then confirm and order.

pub mod resolver;
pub mod expander;
pub mod aggregator;
pub mod workflow;
pub mod report;
