//! In-memory catalog for bootstrapping and tests.

use async_trait::async_trait;

use scout_core::{Catalog, RawColumn, Relationship, Result};

struct StaticTable {
    name: String,
    comment: Option<String>,
    columns: Vec<RawColumn>,
}

/// A catalog backed by in-process data instead of a live data store.
///
/// Useful for tests and for describing schemas that exist only as
/// documentation.
pub struct StaticCatalog {
    schema: String,
    tables: Vec<StaticTable>,
    foreign_keys: Vec<Relationship>,
}

impl StaticCatalog {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Add a table with its columns, in catalog order.
    pub fn table(
        mut self,
        name: impl Into<String>,
        comment: Option<&str>,
        columns: Vec<RawColumn>,
    ) -> Self {
        self.tables.push(StaticTable {
            name: name.into(),
            comment: comment.map(String::from),
            columns,
        });
        self
    }

    /// Add a declared foreign-key constraint.
    pub fn foreign_key(mut self, edge: Relationship) -> Self {
        self.foreign_keys.push(edge);
        self
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        if !schema.eq_ignore_ascii_case(&self.schema) {
            return Ok(Vec::new());
        }
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn columns(&self, _schema: &str, table: &str) -> Result<Vec<RawColumn>> {
        Ok(self
            .tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(table))
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn table_comment(&self, _schema: &str, table: &str) -> Result<Option<String>> {
        Ok(self
            .tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(table))
            .and_then(|t| t.comment.clone()))
    }

    async fn foreign_keys(&self, _schema: &str) -> Result<Vec<Relationship>> {
        Ok(self.foreign_keys.clone())
    }
}
