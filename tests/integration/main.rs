//! End-to-end tests driving the scout pipeline against an in-memory venue.

mod pipeline;
mod workflow;
