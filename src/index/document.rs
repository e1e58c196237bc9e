//! Indexed document model and the mutation capability.

use serde::Serialize;

use crate::Result;

/// One indexed file.
///
/// `id` is the primary key; re-indexing the same id replaces the previous
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
    /// Unique, stable identifier (the file path).
    pub id: String,
    /// Path used for projection; same value as `id`.
    pub path: String,
    /// Full file contents.
    pub body: String,
}

impl IndexDocument {
    /// Build a document for a file path and its contents.
    pub fn new(path: impl Into<String>, body: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: path.clone(),
            path,
            body: body.into(),
        }
    }
}

/// Write access to the index, without naming the engine behind it.
pub trait DocumentMutator: Send + Sync {
    /// Insert or replace the document with `document.id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn upsert(&self, document: IndexDocument) -> Result<()>;

    /// Remove the document with `id`. Removing an absent id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn delete(&self, id: &str) -> Result<()>;

    /// Remove every document in `ids` in one write.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the write.
    fn delete_many(&self, ids: &[String]) -> Result<()>;

    /// Ids of live documents starting with `prefix`, sorted. An empty prefix
    /// lists every document.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be read.
    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_mirrors_id() {
        let doc = IndexDocument::new("notes/a.md", "bleve indexing is easy");
        assert_eq!(doc.id, "notes/a.md");
        assert_eq!(doc.path, doc.id);
        assert_eq!(doc.body, "bleve indexing is easy");
    }
}
