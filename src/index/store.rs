//! Persistent full-text index backed by tantivy.
//!
//! Provides a store handle with:
//! - Open-or-create at a fixed directory
//! - Upsert and delete keyed by document id
//! - Query execution with highlighted body fragments

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tantivy::collector::{Count, TopDocs};
use tantivy::directory::error::{OpenDirectoryError, OpenReadError};
use tantivy::query::{EmptyQuery, PhraseQuery, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::snippet::SnippetGenerator;
use tantivy::tokenizer::TokenStream;
use tantivy::{
    doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term,
};

use super::document::{DocumentMutator, IndexDocument};
use super::schema::{build_schema, IndexFields};
use crate::error::{IndexError, SearchError};
use crate::search::QueryPlan;
use crate::Result;

/// Memory budget for the single index writer.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Maximum characters per highlighted fragment.
const SNIPPET_MAX_CHARS: usize = 150;

/// Maximum fragments returned per hit.
const MAX_FRAGMENTS: usize = 3;

/// A single query hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Highlighted body fragments, in document order.
    pub fragments: Vec<String>,
}

/// Full-text index handle.
///
/// Clone is cheap. Writes are serialized through one writer; reads use a
/// reader that is reloaded after every commit.
#[derive(Clone)]
pub struct IndexStore {
    index: Index,
    reader: IndexReader,
    writer: Arc<Mutex<IndexWriter>>,
    fields: IndexFields,
    location: String,
}

impl IndexStore {
    /// Open the index at `path`, creating it if the location does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing index cannot be opened for any reason
    /// other than being absent, or if creation fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let index = match Index::open_in_dir(path) {
            Ok(index) => {
                tracing::debug!(path = %path.display(), "Opened existing index");
                index
            }
            Err(e) if is_missing(&e) => {
                std::fs::create_dir_all(path)?;
                let index = Index::create_in_dir(path, build_schema())
                    .map_err(|e| IndexError::open(path, e))?;
                tracing::info!(path = %path.display(), "Created new index");
                index
            }
            Err(e) => return Err(IndexError::open(path, e).into()),
        };

        Self::from_index(index, path.display().to_string())
    }

    /// Create a RAM-only index for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer or reader cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_index(Index::create_in_ram(build_schema()), ":memory:".to_string())
    }

    fn from_index(index: Index, location: String) -> Result<Self> {
        let fields = IndexFields::from_schema(&index.schema())?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: TantivyError| IndexError::open(&location, e))?;

        let writer = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| IndexError::open(&location, e))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            fields,
            location,
        })
    }

    /// Where this index lives.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Number of live documents visible to readers.
    #[must_use]
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Execute a query plan, returning at most `limit` hits in score order.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan cannot be turned into an engine query or
    /// the engine fails. Never returns partial results.
    pub fn search(&self, plan: &QueryPlan, limit: usize) -> Result<Vec<SearchHit>> {
        let query = self.build_query(plan)?;
        let searcher = self.reader.searcher();

        let top_docs = searcher
            .search(&*query, &TopDocs::with_limit(limit))
            .map_err(|e| SearchError::Execution(e.to_string()))?;

        if top_docs.is_empty() {
            return Ok(Vec::new());
        }

        let mut generator = SnippetGenerator::create(&searcher, &*query, self.fields.body)
            .map_err(|e| SearchError::Execution(e.to_string()))?;
        generator.set_max_num_chars(SNIPPET_MAX_CHARS);

        let mut hits = Vec::with_capacity(top_docs.len());
        for (_score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| SearchError::Execution(e.to_string()))?;

            let id = doc
                .get_first(self.fields.id)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let body = doc
                .get_first(self.fields.body)
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let fragments = fragments(&generator, body);

            hits.push(SearchHit { id, fragments });
        }

        Ok(hits)
    }

    fn build_query(&self, plan: &QueryPlan) -> Result<Box<dyn Query>> {
        match plan {
            QueryPlan::FreeText(text) => {
                let parser =
                    QueryParser::for_index(&self.index, vec![self.fields.body, self.fields.path]);
                parser.parse_query(text).map_err(|e| {
                    SearchError::InvalidQuery {
                        query: text.clone(),
                        reason: e.to_string(),
                    }
                    .into()
                })
            }
            QueryPlan::Phrase(tokens) => {
                let mut terms = self.analyze_body(&tokens.join(" "))?;
                let query: Box<dyn Query> = match terms.len() {
                    0 => Box::new(EmptyQuery),
                    1 => Box::new(TermQuery::new(
                        terms.remove(0),
                        IndexRecordOption::WithFreqsAndPositions,
                    )),
                    _ => Box::new(PhraseQuery::new(terms)),
                };
                Ok(query)
            }
        }
    }

    /// Run text through the body analyzer so phrase terms match indexed terms.
    fn analyze_body(&self, text: &str) -> Result<Vec<Term>> {
        let field = self.fields.body;
        let mut analyzer = self
            .index
            .tokenizer_for_field(field)
            .map_err(|e| SearchError::Execution(e.to_string()))?;

        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            terms.push(Term::from_field_text(field, &stream.token().text));
        }
        Ok(terms)
    }

    fn live_ids(&self, prefix: &str) -> Result<Vec<String>> {
        let searcher = self.reader.searcher();
        let mut candidates = BTreeSet::new();

        for segment in searcher.segment_readers() {
            let inverted = segment
                .inverted_index(self.fields.id)
                .map_err(|e| IndexError::Read(e.to_string()))?;
            let mut stream = inverted
                .terms()
                .range()
                .ge(prefix.as_bytes())
                .into_stream()
                .map_err(|e| IndexError::Read(e.to_string()))?;

            while stream.advance() {
                let key = stream.key();
                if !key.starts_with(prefix.as_bytes()) {
                    break;
                }
                if let Ok(id) = std::str::from_utf8(key) {
                    candidates.insert(id.to_string());
                }
            }
        }

        // The term dictionary keeps deleted ids until segments merge.
        let mut ids = Vec::with_capacity(candidates.len());
        for id in candidates {
            let query = TermQuery::new(
                Term::from_field_text(self.fields.id, &id),
                IndexRecordOption::Basic,
            );
            let live = searcher
                .search(&query, &Count)
                .map_err(|e| IndexError::Read(e.to_string()))?;
            if live > 0 {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    fn commit(&self, mut writer: parking_lot::MutexGuard<'_, IndexWriter>) -> Result<()> {
        writer
            .commit()
            .map_err(|e| IndexError::Write(e.to_string()))?;
        drop(writer);

        self.reader
            .reload()
            .map_err(|e| IndexError::Read(e.to_string()))?;
        Ok(())
    }
}

impl DocumentMutator for IndexStore {
    fn upsert(&self, document: IndexDocument) -> Result<()> {
        let id_term = Term::from_field_text(self.fields.id, &document.id);
        let id = document.id.clone();

        let mut writer = self.writer.lock();
        writer.delete_term(id_term);
        let added = writer.add_document(doc!(
            self.fields.id => document.id,
            self.fields.path => document.path,
            self.fields.body => document.body,
        ));
        if let Err(e) = added {
            // The queued delete must not reach the next commit on its own.
            discard_pending(&mut writer);
            return Err(IndexError::Write(e.to_string()).into());
        }
        self.commit(writer)?;

        tracing::debug!(id = %id, "Upserted document");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.delete_term(Term::from_field_text(self.fields.id, id));
        self.commit(writer)?;

        tracing::debug!(id = %id, "Deleted document");
        Ok(())
    }

    fn delete_many(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut writer = self.writer.lock();
        for id in ids {
            writer.delete_term(Term::from_field_text(self.fields.id, id));
        }
        self.commit(writer)?;

        tracing::debug!(count = ids.len(), "Deleted documents");
        Ok(())
    }

    fn ids_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.live_ids(prefix)
    }
}

/// Drop every uncommitted operation on the writer.
fn discard_pending(writer: &mut IndexWriter) {
    if let Err(e) = writer.rollback() {
        tracing::warn!(error = %e, "Failed to roll back index writer");
    }
}

/// Highlighted fragments for `body`, in document order.
///
/// The body is cut into line-aligned chunks of about one fragment each so
/// that distant matches each get their own fragment.
fn fragments(generator: &SnippetGenerator, body: &str) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in chunks(body, SNIPPET_MAX_CHARS) {
        let snippet = generator.snippet(chunk);
        if snippet.highlighted().is_empty() {
            continue;
        }
        out.push(snippet.to_html());
        if out.len() == MAX_FRAGMENTS {
            break;
        }
    }
    out
}

/// Split `text` into runs of whole lines no longer than `max` bytes. A
/// single longer line forms its own chunk.
fn chunks(text: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let (mut start, mut end) = (0, 0);
    for line in text.split_inclusive('\n') {
        if end > start && end - start + line.len() > max {
            out.push(&text[start..end]);
            start = end;
        }
        end += line.len();
    }
    if end > start {
        out.push(&text[start..end]);
    }
    out
}

/// Check whether an open failed only because nothing exists there yet.
fn is_missing(err: &TantivyError) -> bool {
    matches!(
        err,
        TantivyError::OpenDirectoryError(OpenDirectoryError::DoesNotExist(_))
            | TantivyError::OpenReadError(OpenReadError::FileDoesNotExist(_))
    )
}
