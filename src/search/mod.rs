//! Query service.
//!
//! Turns free text into a query plan, runs it against the index store and
//! projects hits into a stable result shape.

mod query;
mod service;

pub use query::QueryPlan;
pub use service::{QueryResult, SearchService};
