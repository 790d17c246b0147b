//! Core traits defining the seams to external collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Relationship, ResultSet};

/// Embedding provider.
///
/// Implementations must be deterministic for identical input, or the
/// index's change-detection hash degrades to always-recompute.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of document texts.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed output dimensionality.
    fn dimension(&self) -> usize;
}

/// Language-model provider, a stateless request/response call.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a prompt and return the raw model text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Query execution collaborator.
///
/// Implementations classify failures as connection-level
/// ([`ScoutError::Connection`], retried once by the pipeline against a fresh
/// connection) or query-level ([`ScoutError::Query`], terminal). A
/// connection is acquired per call and released on every exit path.
///
/// [`ScoutError::Connection`]: crate::error::ScoutError::Connection
/// [`ScoutError::Query`]: crate::error::ScoutError::Query
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a statement that already passed safety validation.
    async fn execute(&self, sql: &str) -> Result<ResultSet>;
}

/// Raw column metadata as introspected from the catalog, before hint
/// extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
    /// Free-text comment; may carry an `[FK: table.column]` hint.
    pub comment: Option<String>,
}

impl RawColumn {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            nullable,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Read-only catalog introspection over the underlying store's metadata
/// views.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Base tables of a schema, in catalog order.
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>>;

    /// Columns of one table, in ordinal position order.
    async fn columns(&self, schema: &str, table: &str) -> Result<Vec<RawColumn>>;

    /// Table-level comment, if any.
    async fn table_comment(&self, schema: &str, table: &str) -> Result<Option<String>>;

    /// Declared foreign-key constraints, tagged [`Origin::DatabaseConstraint`].
    ///
    /// [`Origin::DatabaseConstraint`]: crate::types::Origin::DatabaseConstraint
    async fn foreign_keys(&self, schema: &str) -> Result<Vec<Relationship>>;
}
