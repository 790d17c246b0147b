//! Core domain types for the schema context engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identity of a schema-qualified table.
///
/// Matching is case-insensitive via [`TableId::key`]; the original casing is
/// preserved for display and SQL generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId {
    pub schema: String,
    pub table: String,
}

impl TableId {
    /// Create a new table identity.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Lowercased identity key used for matching and document ids.
    pub fn key(&self) -> String {
        format!(
            "{}.{}",
            self.schema.to_lowercase(),
            self.table.to_lowercase()
        )
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// One column of a table as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, catalog casing.
    pub name: String,

    /// Declared data type (e.g. `integer`, `character varying`).
    pub declared_type: String,

    /// Whether the column admits NULL.
    pub nullable: bool,

    /// Business description, with any relationship hint tag stripped.
    pub description: Option<String>,
}

/// Naming style detected for a schema's identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStatus {
    /// Most columns carry business descriptions.
    Glossary,
    /// Abbreviated identifiers with almost no descriptions.
    CrypticNoGlossary,
    /// Human-readable identifiers.
    Descriptive,
}

/// Operator-facing report on a schema's naming quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamingReport {
    pub status: NamingStatus,
    pub commented_columns: usize,
    pub total_columns: usize,
    pub cryptic_tables: usize,
    pub total_tables: usize,
}

impl NamingReport {
    /// Percentage of columns with a description.
    pub fn comment_pct(&self) -> u32 {
        percentage(self.commented_columns, self.total_columns)
    }

    /// Percentage of tables with cryptic names.
    pub fn cryptic_pct(&self) -> u32 {
        percentage(self.cryptic_tables, self.total_tables)
    }

    /// Human-readable status message for the operator.
    pub fn message(&self) -> String {
        match self.status {
            NamingStatus::Glossary => format!(
                "Business glossary detected - {}% of columns have descriptions",
                self.comment_pct()
            ),
            NamingStatus::CrypticNoGlossary => format!(
                "Cryptic object names detected ({}% abbreviated) with minimal glossary \
                 ({}% commented); add comments to tables and columns for best results",
                self.cryptic_pct(),
                self.comment_pct()
            ),
            NamingStatus::Descriptive => {
                "Descriptive object names detected - using identifiers directly".to_string()
            }
        }
    }
}

fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (part * 100 / total) as u32
    }
}

/// The semantic text representation of one table, used for similarity search.
///
/// Rebuilt whenever the schema is (re)indexed; immutable between rebuilds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    pub table: TableId,

    /// Table-level comment from the catalog, if any.
    pub comment: Option<String>,

    /// Columns in catalog order.
    pub columns: Vec<ColumnDescriptor>,

    /// Rendered text blob: header, columns, relationship summary.
    pub text: String,
}

impl TableDocument {
    /// Document id used in the embedding index.
    pub fn document_id(&self) -> String {
        self.table.key()
    }

    /// Sub-document id for one of this table's columns.
    pub fn column_document_id(&self, column: &str) -> String {
        column_document_id(&self.table.key(), column)
    }
}

/// Sub-document id for a column of a table identified by its key.
pub fn column_document_id(table_key: &str, column: &str) -> String {
    format!("{}#{}", table_key, column.to_lowercase())
}

/// Provenance of a relationship fact.
///
/// The variant order is the merge priority: a config-file edge outranks a
/// comment hint, which outranks a database constraint; a manual edit outranks
/// everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    DatabaseConstraint,
    CommentHint,
    ConfigFile,
    ManualEdit,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DatabaseConstraint => "database constraint",
            Self::CommentHint => "comment hint",
            Self::ConfigFile => "config file",
            Self::ManualEdit => "manual edit",
        };
        write!(f, "{}", s)
    }
}

/// A directed column-to-column join path, independent of database-enforced
/// constraints. Tables are named without schema qualification; the owning
/// [`RelationshipMap`] carries the schema.
///
/// [`RelationshipMap`]: https://docs.rs/scout-relations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub description: Option<String>,
    pub origin: Origin,
}

impl Relationship {
    /// Create an edge without a description.
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
        origin: Origin,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
            description: None,
            origin,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        if !description.is_empty() {
            self.description = Some(description);
        }
        self
    }

    /// Case-insensitive identity key. Two edges with the same key are the
    /// same relationship; only the highest-priority origin survives a merge.
    pub fn key(&self) -> (String, String, String, String) {
        (
            self.source_table.to_lowercase(),
            self.source_column.to_lowercase(),
            self.target_table.to_lowercase(),
            self.target_column.to_lowercase(),
        )
    }

    /// `table.column` rendering of the source end.
    pub fn source(&self) -> String {
        format!("{}.{}", self.source_table, self.source_column)
    }

    /// `table.column` rendering of the target end.
    pub fn target(&self) -> String {
        format!("{}.{}", self.target_table, self.target_column)
    }
}

/// A stored embedding together with the hash of the text it was computed
/// from. The hash lets a rebuild skip re-embedding unchanged documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub document_id: String,

    pub vector: Vec<f32>,

    /// Blake3 hash of the source text.
    #[serde(with = "serde_hash")]
    pub source_hash: [u8; 32],
}

impl EmbeddingRecord {
    /// Create a record for a document text and its embedding.
    pub fn new(document_id: impl Into<String>, vector: Vec<f32>, text: &str) -> Self {
        Self {
            document_id: document_id.into(),
            vector,
            source_hash: text_hash(text),
        }
    }
}

/// Hash a document text for change detection.
pub fn text_hash(text: &str) -> [u8; 32] {
    *blake3::hash(text.as_bytes()).as_bytes()
}

/// Coarse question intent used to steer SQL generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Aggregation,
    TimeSeries,
    Lookup,
    Comparison,
    Analysis,
}

impl Intent {
    /// Parse a model reply into an intent; tolerant of surrounding prose.
    pub fn parse(text: &str) -> Option<Self> {
        let lowered = text.to_lowercase();
        for (name, intent) in [
            ("time_series", Self::TimeSeries),
            ("time series", Self::TimeSeries),
            ("aggregation", Self::Aggregation),
            ("comparison", Self::Comparison),
            ("lookup", Self::Lookup),
            ("analysis", Self::Analysis),
        ] {
            if lowered.contains(name) {
                return Some(intent);
            }
        }
        None
    }
}

impl Default for Intent {
    fn default() -> Self {
        Self::Analysis
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Aggregation => "aggregation",
            Self::TimeSeries => "time_series",
            Self::Lookup => "lookup",
            Self::Comparison => "comparison",
            Self::Analysis => "analysis",
        };
        write!(f, "{}", s)
    }
}

/// Tabular output of a read-only query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the first `limit` rows for a narrative prompt.
    pub fn preview(&self, limit: usize) -> String {
        let mut out = String::new();
        out.push_str(&self.columns.join(" | "));
        for row in self.rows.iter().take(limit) {
            out.push('\n');
            out.push_str(&row.join(" | "));
        }
        if self.rows.len() > limit {
            out.push_str(&format!("\n... and {} more rows", self.rows.len() - limit));
        }
        out
    }
}

/// Ephemeral state threaded through one pipeline run. Created when a
/// question arrives, discarded when the run ends; never persisted.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Run identifier, for log correlation.
    pub run_id: Ulid,

    pub question: String,

    pub intent: Option<Intent>,

    /// Tables selected by the retrieval planner, in rank order.
    pub retrieved_tables: Vec<TableId>,

    /// Columns retained for wide tables after pruning.
    pub retrieved_columns: Vec<(TableId, String)>,

    /// Assembled schema context handed to SQL generation.
    pub context_text: Option<String>,

    pub sql: Option<String>,

    pub rows: Option<ResultSet>,

    /// Best-effort narrative over the result rows.
    pub narrative: Option<String>,
}

impl QueryContext {
    /// Start a new run for a question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            run_id: Ulid::new(),
            question: question.into(),
            intent: None,
            retrieved_tables: Vec::new(),
            retrieved_columns: Vec::new(),
            context_text: None,
            sql: None,
            rows: None,
            narrative: None,
        }
    }
}

/// Helper module for hash serialization as hex.
mod serde_hash {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        hex::encode(value).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        let bytes = hex::decode(&hex_str).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("invalid hash length"))
    }
}
