//! scout-retrieve - Indexing orchestration and retrieval planning
//!
//! This crate owns the versioned, atomically-swapped view of one indexed
//! schema ([`SchemaSnapshot`]), the [`Indexer`] that builds it from the
//! catalog, resolver, and embedding provider, and the [`Planner`] that
//! selects the minimal sufficient schema context for a question.

mod indexer;
mod planner;
mod snapshot;

pub use indexer::{IndexReport, Indexer};
pub use planner::{Planner, RetrievalPlan, RetrievedTable};
pub use snapshot::{SchemaSnapshot, SharedSnapshot};
