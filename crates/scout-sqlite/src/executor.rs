//! Read-only query execution against SQLite.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::ErrorCode;
use tracing::debug;

use scout_core::{QueryExecutor, Result, ResultSet, ScoutError};

use crate::pool::SqlitePool;

/// Executes already-validated statements over a pooled connection.
///
/// A connection is held only for the duration of one `execute` call and
/// returned to the pool on every exit path.
pub struct SqliteExecutor {
    pool: Arc<SqlitePool>,
}

impl SqliteExecutor {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Convenience constructor with a private pool.
    pub fn open(path: impl AsRef<Path>, max_connections: usize) -> Result<Self> {
        Ok(Self::new(Arc::new(SqlitePool::open(path, max_connections)?)))
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn execute(&self, sql: &str) -> Result<ResultSet> {
        let conn = self.pool.acquire().await?;

        let mut stmt = conn.prepare(sql).map_err(classify)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let column_count = columns.len();

        let mut rows = stmt.query([]).map_err(classify)?;
        let mut out: Vec<Vec<String>> = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(render_value(row.get_ref(i).map_err(classify)?));
            }
            out.push(values);
        }

        debug!("Query returned {} rows", out.len());
        Ok(ResultSet {
            columns,
            rows: out,
        })
    }
}

/// Connection-level failures (busy, locked, cannot-open, io) are retryable
/// against a fresh connection; everything else is a query error surfaced
/// verbatim.
fn classify(e: rusqlite::Error) -> ScoutError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure => ScoutError::connection(e.to_string()),
            _ => ScoutError::query(e.to_string()),
        },
        _ => ScoutError::query(e.to_string()),
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => hex::encode(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn seeded_executor(dir: &TempDir) -> SqliteExecutor {
        let path = dir.path().join("test.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE customers (customerid INTEGER PRIMARY KEY, companyname TEXT);
            INSERT INTO customers VALUES (1, 'Alfreds'), (2, 'Bottom-Dollar');
            "#,
        )
        .unwrap();
        SqliteExecutor::open(&path, 2).unwrap()
    }

    #[tokio::test]
    async fn test_execute_select() {
        let dir = TempDir::new().unwrap();
        let executor = seeded_executor(&dir).await;

        let result = executor
            .execute("SELECT customerid, companyname FROM customers ORDER BY customerid")
            .await
            .unwrap();

        assert_eq!(result.columns, vec!["customerid", "companyname"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0], vec!["1", "Alfreds"]);
    }

    #[tokio::test]
    async fn test_unknown_column_is_query_error() {
        let dir = TempDir::new().unwrap();
        let executor = seeded_executor(&dir).await;

        let err = executor
            .execute("SELECT nosuchcolumn FROM customers")
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::Query { .. }));
        // The underlying reason is surfaced verbatim to aid debugging.
        assert!(err.to_string().contains("nosuchcolumn"));
    }

    #[tokio::test]
    async fn test_null_rendering() {
        let dir = TempDir::new().unwrap();
        let executor = seeded_executor(&dir).await;

        let result = executor.execute("SELECT NULL, 1.5").await.unwrap();
        assert_eq!(result.rows[0][0], "NULL");
        assert_eq!(result.rows[0][1], "1.5");
    }
}
