//! scout-sqlite - SQLite execution collaborator
//!
//! A bounded connection pool with health checks, a read-only query
//! executor that classifies failures as connection-level vs query-level,
//! and catalog introspection over SQLite metadata.

mod catalog;
mod executor;
mod pool;

pub use catalog::SqliteCatalog;
pub use executor::SqliteExecutor;
pub use pool::SqlitePool;
