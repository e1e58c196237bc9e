//! HTTP surface.
//!
//! This module provides:
//! - The search endpoint plus health and metrics, using axum
//! - Prometheus metrics
//! - Tracing setup

mod app;
pub mod metrics;
mod observability;
mod rest;

pub use app::{App, ServerConfig};
pub use observability::init_tracing;
pub use rest::{create_rest_router, AppState, HealthResponse, SearchParams};
