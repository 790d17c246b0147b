//! Catalog introspection over SQLite metadata.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;

use scout_core::{Catalog, Origin, RawColumn, Relationship, Result, ScoutError};

use crate::pool::SqlitePool;

/// Reads table, column, and foreign-key metadata from a SQLite database.
///
/// SQLite has a single namespace per file, so the schema argument is only
/// used for display; it has no comment metadata either, so the comment
/// accessors return nothing and relationship hints come from the
/// relationship file instead.
pub struct SqliteCatalog {
    pool: Arc<SqlitePool>,
}

impl SqliteCatalog {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn list_tables(&self, _schema: &str) -> Result<Vec<String>> {
        let conn = self.pool.acquire().await?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(|e| ScoutError::query(e.to_string()))?;

        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| ScoutError::query(e.to_string()))?;
        Ok(tables)
    }

    async fn columns(&self, _schema: &str, table: &str) -> Result<Vec<RawColumn>> {
        let conn = self.pool.acquire().await?;
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))
            .map_err(|e| ScoutError::query(e.to_string()))?;

        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared_type: String = row.get(2)?;
                let notnull: i64 = row.get(3)?;
                Ok(RawColumn::new(name, declared_type.to_lowercase(), notnull == 0))
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| ScoutError::query(e.to_string()))?;
        Ok(columns)
    }

    async fn table_comment(&self, _schema: &str, _table: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn foreign_keys(&self, schema: &str) -> Result<Vec<Relationship>> {
        let tables = self.list_tables(schema).await?;
        let conn = self.pool.acquire().await?;

        let mut edges = Vec::new();
        for table in &tables {
            let mut stmt = conn
                .prepare(&format!(
                    "PRAGMA foreign_key_list({})",
                    quote_identifier(table)
                ))
                .map_err(|e| ScoutError::query(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    let target_table: String = row.get(2)?;
                    let source_column: String = row.get(3)?;
                    // The referenced column is NULL when the constraint
                    // points at the target's primary key implicitly.
                    let target_column: Option<String> = row.get(4)?;
                    Ok((target_table, source_column, target_column))
                })
                .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
                .map_err(|e| ScoutError::query(e.to_string()))?;

            for (target_table, source_column, target_column) in rows {
                let target_column = match target_column {
                    Some(col) => col,
                    None => primary_key_column(&conn, &target_table)?,
                };
                edges.push(Relationship::new(
                    table.clone(),
                    source_column,
                    target_table,
                    target_column,
                    Origin::DatabaseConstraint,
                ));
            }
        }
        Ok(edges)
    }
}

fn primary_key_column(conn: &Connection, table: &str) -> Result<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))
        .map_err(|e| ScoutError::query(e.to_string()))?;

    let pk = stmt
        .query_map([], |row| {
            let name: String = row.get(1)?;
            let pk: i64 = row.get(5)?;
            Ok((name, pk))
        })
        .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
        .map_err(|e| ScoutError::query(e.to_string()))?
        .into_iter()
        .find(|(_, pk)| *pk > 0)
        .map(|(name, _)| name);

    pk.ok_or_else(|| {
        ScoutError::query(format!("table {} has no primary key to reference", table))
    })
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn northwind_catalog(dir: &TempDir) -> SqliteCatalog {
        let path = dir.path().join("test.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE customers (customerid INTEGER PRIMARY KEY, companyname TEXT NOT NULL);
            CREATE TABLE orders (
                orderid INTEGER PRIMARY KEY,
                customerid INTEGER REFERENCES customers,
                orderdate TEXT
            );
            "#,
        )
        .unwrap();
        SqliteCatalog::new(Arc::new(SqlitePool::open(&path, 2).unwrap()))
    }

    #[tokio::test]
    async fn test_list_tables_and_columns() {
        let dir = TempDir::new().unwrap();
        let catalog = northwind_catalog(&dir).await;

        let tables = catalog.list_tables("main").await.unwrap();
        assert_eq!(tables, vec!["customers", "orders"]);

        let columns = catalog.columns("main", "customers").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "customerid");
        assert!(!columns[1].nullable);
    }

    #[tokio::test]
    async fn test_foreign_keys_resolve_implicit_pk() {
        let dir = TempDir::new().unwrap();
        let catalog = northwind_catalog(&dir).await;

        let edges = catalog.foreign_keys("main").await.unwrap();
        assert_eq!(edges.len(), 1);
        let edge = &edges[0];
        assert_eq!(edge.source_table, "orders");
        assert_eq!(edge.source_column, "customerid");
        assert_eq!(edge.target_table, "customers");
        // REFERENCES customers (no column) resolves to the primary key.
        assert_eq!(edge.target_column, "customerid");
        assert_eq!(edge.origin, Origin::DatabaseConstraint);
    }
}
