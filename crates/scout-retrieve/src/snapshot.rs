//! Versioned, atomically-swapped view of one indexed schema.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use scout_core::{NamingReport, NamingStatus, Relationship, TableDocument};
use scout_index::EmbeddingIndex;
use scout_relations::RelationshipMap;

/// Everything a pipeline run needs to read about one schema: the enriched
/// table documents, the merged relationship map, the embedding index, and
/// the naming report.
///
/// A snapshot is immutable once installed; rebuilds construct a fresh
/// snapshot and swap it in, so concurrent readers see either the fully-old
/// or fully-new version, never a mix.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub schema: String,

    /// Enriched documents keyed by their document id (`schema.table`,
    /// lowercased).
    pub documents: BTreeMap<String, TableDocument>,

    pub relationships: RelationshipMap,

    pub naming: NamingReport,

    /// Overview text appended to every assembled context.
    pub overview: String,

    pub index: EmbeddingIndex,

    /// Constraint and comment-hint edges cached for incremental refreshes,
    /// so a manual edit does not re-introspect the catalog.
    pub catalog_edges: Vec<Relationship>,
}

impl SchemaSnapshot {
    /// An empty snapshot for a schema that has not been indexed yet.
    pub fn empty(schema: impl Into<String>) -> Self {
        let schema = schema.into();
        Self {
            documents: BTreeMap::new(),
            relationships: RelationshipMap::build(&schema, Vec::new()),
            naming: NamingReport {
                status: NamingStatus::Descriptive,
                commented_columns: 0,
                total_columns: 0,
                cryptic_tables: 0,
                total_tables: 0,
            },
            overview: String::new(),
            index: EmbeddingIndex::new(),
            catalog_edges: Vec::new(),
            schema,
        }
    }
}

/// Shared handle to the current snapshot.
///
/// Readers take a cheap `Arc` clone and keep reading it for the duration of
/// their pipeline run; `install` swaps the pointer atomically.
pub struct SharedSnapshot {
    inner: RwLock<Arc<SchemaSnapshot>>,
}

impl SharedSnapshot {
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// The current snapshot.
    pub fn load(&self) -> Arc<SchemaSnapshot> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the current snapshot.
    pub fn install(&self, snapshot: SchemaSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_swaps_whole_snapshot() {
        let shared = SharedSnapshot::new(SchemaSnapshot::empty("northwind"));
        let before = shared.load();
        assert!(before.index.is_empty());

        let mut next = SchemaSnapshot::empty("northwind");
        next.overview = "Schema: northwind".to_string();
        shared.install(next);

        // The old handle still sees the old version; new loads see the new one.
        assert!(before.overview.is_empty());
        assert_eq!(shared.load().overview, "Schema: northwind");
    }
}
