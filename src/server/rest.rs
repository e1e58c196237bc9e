//! REST API endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};

use super::metrics::{record_watcher, SEARCH_LATENCY, SEARCH_REQUESTS};
use crate::search::{QueryResult, SearchService};
use crate::watcher::{WatcherStats, WatcherStatsSnapshot};
use crate::Error;

/// Shared state for the REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub search: SearchService,
    pub stats: Arc<WatcherStats>,
}

impl AppState {
    #[must_use]
    pub fn new(search: SearchService, stats: Arc<WatcherStats>) -> Self {
        Self { search, stats }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub documents: u64,
    pub watcher: WatcherStatsSnapshot,
}

/// Query string of the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// Create REST API router with search served at `endpoint`.
pub fn create_rest_router(state: AppState, endpoint: &str) -> Router {
    Router::new()
        .route(endpoint, get(search))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Search endpoint.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let started = Instant::now();
    let service = state.search.clone();
    let text = params.q;

    let outcome = tokio::task::spawn_blocking(move || service.query(&text))
        .await
        .map_err(|e| Error::internal(format!("search task failed: {e}")))
        .and_then(|result| result);

    SEARCH_LATENCY.observe(started.elapsed().as_secs_f64());

    match outcome {
        Ok(results) => {
            SEARCH_REQUESTS.with_label_values(&["ok"]).inc();
            tracing::debug!(hits = results.len(), "Search served");
            (StatusCode::OK, Json(results)).into_response()
        }
        Err(e) => {
            let status = match e {
                Error::Search(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            SEARCH_REQUESTS.with_label_values(&["error"]).inc();
            tracing::warn!(error = %e, status = %status, "Search failed");
            let results: Vec<QueryResult> = Vec::new();
            (
                status,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "results": results,
                })),
            )
                .into_response()
        }
    }
}

/// Health check endpoint.
///
/// Search keeps serving when the watch loop has died, but the index no
/// longer follows the tree, so that reports as degraded.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.stats.snapshot();
    let documents = state.search.store().num_docs();
    record_watcher(&snapshot, documents);

    let (status_code, status) = if snapshot.watching {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    tracing::debug!(status = %status, documents, "Health check");

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents,
        watcher: snapshot,
    };

    (status_code, Json(response))
}

/// Prometheus metrics endpoint.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    record_watcher(&state.stats.snapshot(), state.search.store().num_docs());

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; charset=utf-8",
            )],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    axum::http::header::CONTENT_TYPE,
                    "text/plain; charset=utf-8",
                )],
                b"Failed to encode metrics".to_vec(),
            )
        }
    }
}
