//! Builds per-table semantic documents from catalog metadata.

use tracing::{debug, warn};

use scout_core::{
    Catalog, ColumnDescriptor, NamingReport, Origin, Relationship, Result, ScoutError,
    TableDocument, TableId,
};

use crate::hints::parse_comment;
use crate::naming;

/// Output of one catalog pass over a schema.
#[derive(Debug)]
pub struct CatalogBuild {
    /// One document per table, relationship section not yet applied.
    pub documents: Vec<TableDocument>,

    /// Comment-hint relationships extracted from column comments.
    pub hints: Vec<Relationship>,

    /// Naming-style report for the operator and planner.
    pub naming: NamingReport,

    /// Overview document text for broad questions.
    pub overview: String,

    /// Per-table data errors; the affected tables are skipped, the rest of
    /// the schema still indexes.
    pub errors: Vec<ScoutError>,
}

/// Turns raw catalog metadata for one schema into table documents.
pub struct DocumentBuilder {
    schema: String,
}

impl DocumentBuilder {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    /// Read the catalog and build every table's document.
    pub async fn build(&self, catalog: &dyn Catalog) -> Result<CatalogBuild> {
        let tables = catalog.list_tables(&self.schema).await?;

        let mut documents = Vec::with_capacity(tables.len());
        let mut hints = Vec::new();
        let mut errors = Vec::new();
        let mut commented_columns = 0usize;
        let mut total_columns = 0usize;

        for table in &tables {
            let raw_columns = match catalog.columns(&self.schema, table).await {
                Ok(cols) => cols,
                Err(e) => {
                    errors.push(ScoutError::data(table.clone(), e.to_string()));
                    continue;
                }
            };

            if raw_columns.is_empty() {
                errors.push(ScoutError::data(table.clone(), "table has no columns"));
                continue;
            }

            let comment = match catalog.table_comment(&self.schema, table).await {
                Ok(c) => c,
                Err(e) => {
                    warn!("Could not read comment for {}: {}", table, e);
                    None
                }
            };

            let mut columns = Vec::with_capacity(raw_columns.len());
            for raw in raw_columns {
                total_columns += 1;
                let description = match raw.comment.as_deref() {
                    Some(text) => {
                        commented_columns += 1;
                        let (description, reference) = parse_comment(text);
                        if let Some((target_table, target_column)) = reference {
                            hints.push(Relationship::new(
                                table.clone(),
                                raw.name.clone(),
                                target_table,
                                target_column,
                                Origin::CommentHint,
                            ));
                        }
                        description
                    }
                    None => None,
                };
                columns.push(ColumnDescriptor {
                    name: raw.name,
                    declared_type: raw.declared_type,
                    nullable: raw.nullable,
                    description,
                });
            }

            let table_id = TableId::new(self.schema.clone(), table.clone());
            let text = table_text(&table_id, comment.as_deref(), &columns);
            debug!("Built document for {} ({} columns)", table_id, columns.len());

            documents.push(TableDocument {
                table: table_id,
                comment,
                columns,
                text,
            });
        }

        let naming = naming::classify(&tables, commented_columns, total_columns);
        let overview = self.overview_text(&tables);

        Ok(CatalogBuild {
            documents,
            hints,
            naming,
            overview,
            errors,
        })
    }

    fn overview_text(&self, tables: &[String]) -> String {
        let qualified: Vec<String> = tables
            .iter()
            .map(|t| format!("{}.{}", self.schema, t))
            .collect();
        format!(
            "Schema: {}\nAvailable tables: {}\nIMPORTANT: Always use schema-qualified table names: {}.tablename",
            self.schema,
            qualified.join(", "),
            self.schema
        )
    }
}

/// Render a table's document text: header, then columns in catalog order.
/// The relationship section is appended separately once the resolver has run.
pub fn table_text(table: &TableId, comment: Option<&str>, columns: &[ColumnDescriptor]) -> String {
    let table_desc = comment.map(|c| format!(" ({})", c)).unwrap_or_default();

    let col_parts: Vec<String> = columns
        .iter()
        .map(|col| match col.description.as_deref() {
            Some(desc) => format!("{} ({}, {})", col.name, desc, col.declared_type),
            None => format!("{} ({})", col.name, col.declared_type),
        })
        .collect();

    format!(
        "Schema: {}, Table: {}{}\nColumns: {}",
        table.schema,
        table,
        table_desc,
        col_parts.join(" | ")
    )
}

/// Render the sub-document text for one column of a wide table.
pub fn column_text(table: &TableId, column: &ColumnDescriptor) -> String {
    match column.description.as_deref() {
        Some(desc) => format!(
            "Table: {}, Column: {} ({}) - {}",
            table, column.name, column.declared_type, desc
        ),
        None => format!("Table: {}, Column: {} ({})", table, column.name, column.declared_type),
    }
}
