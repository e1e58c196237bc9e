//! Search execution and result projection.

use std::collections::HashMap;

use serde::Serialize;

use super::query::QueryPlan;
use crate::index::IndexStore;
use crate::Result;

/// One result row: a document path and its highlighted fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub path: String,
    pub snippets: Vec<String>,
}

/// Read-side entry point over an [`IndexStore`].
#[derive(Clone)]
pub struct SearchService {
    store: IndexStore,
    limit: usize,
}

impl SearchService {
    /// Create a service returning at most `limit` hits per query.
    #[must_use]
    pub const fn new(store: IndexStore, limit: usize) -> Self {
        Self { store, limit }
    }

    /// Search and return a mapping from document id to fragments.
    ///
    /// Zero hits, and blank input, give an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns an error with no results if the query is malformed or the
    /// engine fails.
    pub fn search(&self, text: &str) -> Result<HashMap<String, Vec<String>>> {
        Ok(self
            .query(text)?
            .into_iter()
            .map(|result| (result.path, result.snippets))
            .collect())
    }

    /// Search and return results in relevance order.
    ///
    /// # Errors
    ///
    /// Returns an error with no results if the query is malformed or the
    /// engine fails.
    pub fn query(&self, text: &str) -> Result<Vec<QueryResult>> {
        let Some(plan) = QueryPlan::from_text(text) else {
            return Ok(Vec::new());
        };

        tracing::debug!(query = %text, phrase = plan.is_phrase(), "Executing search");

        let hits = self.store.search(&plan, self.limit).map_err(|e| {
            tracing::debug!(query = %text, error = %e, "Search failed");
            e
        })?;

        Ok(hits
            .into_iter()
            .map(|hit| QueryResult {
                path: hit.id,
                snippets: hit.fragments,
            })
            .collect())
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &IndexStore {
        &self.store
    }
}
