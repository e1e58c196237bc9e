//! Full-text index store.
//!
//! This module provides:
//! - The indexed document model
//! - The `DocumentMutator` capability consumed by the reconciler
//! - A tantivy-backed `IndexStore` with open-or-create semantics

mod document;
mod schema;
mod store;

pub use document::{DocumentMutator, IndexDocument};
pub use schema::{build_schema, IndexFields, FIELD_BODY, FIELD_ID, FIELD_PATH};
pub use store::{IndexStore, SearchHit};
