//! Index schema definition.

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use crate::error::IndexError;
use crate::Result;

/// Primary key field (raw, untokenized).
pub const FIELD_ID: &str = "id";

/// Projection path field (raw, untokenized).
pub const FIELD_PATH: &str = "path";

/// File contents. Positions are recorded for phrase queries and the text is
/// stored for highlighting.
pub const FIELD_BODY: &str = "body";

/// Build the schema used for new indexes.
#[must_use]
pub fn build_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field(FIELD_ID, STRING | STORED);
    builder.add_text_field(FIELD_PATH, STRING | STORED);
    builder.add_text_field(FIELD_BODY, TEXT | STORED);
    builder.build()
}

/// Field handles resolved against an index schema.
#[derive(Debug, Clone, Copy)]
pub struct IndexFields {
    pub id: Field,
    pub path: Field,
    pub body: Field,
}

impl IndexFields {
    /// Resolve field handles by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema lacks one of the fields, e.g. when
    /// opening an index written by another program.
    pub fn from_schema(schema: &Schema) -> Result<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| IndexError::Schema(format!("missing field '{name}': {e}")))
        };

        Ok(Self {
            id: field(FIELD_ID)?,
            path: field(FIELD_PATH)?,
            body: field(FIELD_BODY)?,
        })
    }
}
