//! Bounded connection pool with health checks.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info, warn};

use scout_core::{Result, ScoutError};

/// A small pool of SQLite connections.
///
/// `acquire` waits for a free slot, health-checks an idle connection before
/// handing it out, and replaces a stale one with a fresh connection; this
/// is the "request a fresh connection" half of the pipeline's
/// connection-retry policy.
pub struct SqlitePool {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    permits: Semaphore,
}

impl SqlitePool {
    /// Open a pool against a database file, validating the path with one
    /// eager connection.
    pub fn open(path: impl AsRef<Path>, max_connections: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let first = open_connection(&path)?;
        info!(
            "Connection pool opened at {:?} (max {})",
            path, max_connections
        );

        Ok(Self {
            idle: Mutex::new(vec![first]),
            permits: Semaphore::new(max_connections.max(1)),
            path,
        })
    }

    /// Acquire a healthy connection, waiting if the pool is exhausted.
    pub async fn acquire(&self) -> Result<PooledConnection<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ScoutError::connection("connection pool closed"))?;

        let conn = match self.pop_idle() {
            Some(conn) => {
                if is_healthy(&conn) {
                    conn
                } else {
                    // Stale (e.g. the file was swapped out underneath us);
                    // discard and reconnect.
                    warn!("Discarding stale connection");
                    drop(conn);
                    open_connection(&self.path)?
                }
            }
            None => open_connection(&self.path)?,
        };

        Ok(PooledConnection {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    fn pop_idle(&self) -> Option<Connection> {
        match self.idle.lock() {
            Ok(mut idle) => idle.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        }
    }

    fn put_idle(&self, conn: Connection) {
        match self.idle.lock() {
            Ok(mut idle) => idle.push(conn),
            Err(poisoned) => poisoned.into_inner().push(conn),
        }
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ScoutError::connection(format!("Failed to open database: {}", e)))?;

    conn.execute_batch(
        r#"
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        "#,
    )
    .map_err(|e| ScoutError::connection(format!("Failed to configure connection: {}", e)))?;

    debug!("Opened connection to {:?}", path);
    Ok(conn)
}

fn is_healthy(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map(|v| v == 1)
        .unwrap_or(false)
}

/// A connection checked out of the pool; returned on drop.
pub struct PooledConnection<'a> {
    conn: Option<Connection>,
    pool: &'a SqlitePool,
    _permit: SemaphorePermit<'a>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_idle(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let pool = SqlitePool::open(dir.path().join("test.db"), 2).unwrap();

        {
            let conn = pool.acquire().await.unwrap();
            conn.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();
        }

        // The connection went back to the pool and sees the table.
        let conn = pool.acquire().await.unwrap();
        let count: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master WHERE name = 't'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_pool_is_bounded() {
        let dir = TempDir::new().unwrap();
        let pool = SqlitePool::open(dir.path().join("test.db"), 1).unwrap();

        let held = pool.acquire().await.unwrap();
        // With the single permit held, a second acquire must wait.
        let waiting = tokio::time::timeout(std::time::Duration::from_millis(50), pool.acquire());
        assert!(waiting.await.is_err());

        drop(held);
        assert!(pool.acquire().await.is_ok());
    }
}
