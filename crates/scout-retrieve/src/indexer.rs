//! Builds schema snapshots and installs them atomically.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use scout_catalog::{column_text, table_text, DocumentBuilder};
use scout_core::{
    Catalog, Embedder, NamingReport, Relationship, Result, RetrievalConfig, ScoutError,
};
use scout_relations::RelationshipResolver;

use crate::snapshot::{SchemaSnapshot, SharedSnapshot};

/// Summary of one indexing pass.
#[derive(Debug)]
pub struct IndexReport {
    /// Tables successfully indexed.
    pub tables: usize,

    /// Documents whose embeddings were (re)computed.
    pub embedded: usize,

    /// Documents skipped because their text was unchanged.
    pub skipped: usize,

    pub naming: NamingReport,

    /// Per-table data errors; these tables were skipped.
    pub errors: Vec<ScoutError>,
}

/// Orchestrates Document Builder, Relationship Resolver, and the embedding
/// index into an installed [`SchemaSnapshot`].
///
/// Rebuilds (full and incremental) are serialized through a writer lock;
/// the installed snapshot itself is swapped atomically, so readers are
/// never excluded by an in-progress rebuild.
pub struct Indexer<C, E> {
    catalog: Arc<C>,
    embedder: Arc<E>,
    resolver: RelationshipResolver,
    shared: Arc<SharedSnapshot>,
    config: RetrievalConfig,
    rebuild_lock: Mutex<()>,
}

impl<C, E> Indexer<C, E>
where
    C: Catalog,
    E: Embedder,
{
    pub fn new(
        catalog: Arc<C>,
        embedder: Arc<E>,
        resolver: RelationshipResolver,
        shared: Arc<SharedSnapshot>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            catalog,
            embedder,
            resolver,
            shared,
            config,
            rebuild_lock: Mutex::new(()),
        }
    }

    /// Handle to the snapshot this indexer installs into.
    pub fn shared(&self) -> Arc<SharedSnapshot> {
        self.shared.clone()
    }

    /// Full rebuild: introspect the catalog, resolve relationships, render
    /// and embed documents, and install the new snapshot.
    pub async fn rebuild(&self) -> Result<IndexReport> {
        let _guard = self.rebuild_lock.lock().await;

        let schema = self.resolver.schema().to_string();
        info!("Indexing schema {}", schema);

        let build = DocumentBuilder::new(&schema).build(&*self.catalog).await?;

        let mut catalog_edges = self.resolver.constraint_edges(&*self.catalog).await;
        catalog_edges.extend(build.hints.iter().cloned());
        let relationships = self.resolver.resolve(&catalog_edges);

        let mut documents = BTreeMap::new();
        let mut entries: Vec<(String, String)> = Vec::new();

        for mut doc in build.documents {
            doc.text = relationships.apply(&doc.table.table, &doc.text);
            entries.push((doc.document_id(), doc.text.clone()));

            // Wide tables also index one sub-document per column.
            if doc.columns.len() > self.config.column_threshold {
                for col in &doc.columns {
                    entries.push((doc.column_document_id(&col.name), column_text(&doc.table, col)));
                }
            }

            documents.insert(doc.document_id(), doc);
        }

        // Start from the previous index so unchanged documents keep their
        // embeddings, then drop records for documents that no longer exist.
        let prev = self.shared.load();
        let mut index = prev.index.clone();
        let keep: HashSet<String> = entries.iter().map(|(id, _)| id.clone()).collect();
        index.retain_ids(&keep);
        let (embedded, skipped) = index.upsert_all(&entries, &*self.embedder).await?;

        let report = IndexReport {
            tables: documents.len(),
            embedded,
            skipped,
            naming: build.naming.clone(),
            errors: build.errors,
        };

        info!(
            "Indexed {} tables for {} ({} embedded, {} unchanged)",
            report.tables, schema, embedded, skipped
        );

        self.shared.install(SchemaSnapshot {
            schema,
            documents,
            relationships,
            naming: build.naming,
            overview: build.overview,
            index,
            catalog_edges,
        });

        Ok(report)
    }

    /// Persist a manual relationship edge and refresh only the affected
    /// tables' documents.
    pub async fn add_manual_edit(&self, edge: Relationship) -> Result<()> {
        let affected = self.resolver.add_manual_edit(&edge)?;
        self.refresh_tables(&affected).await
    }

    /// Remove a manually-managed edge (`table.column` endpoints) and
    /// refresh the affected tables' documents.
    pub async fn remove_manual_edit(&self, source: &str, target: &str) -> Result<()> {
        let affected = self.resolver.remove_manual_edit(source, target)?;
        self.refresh_tables(&affected).await
    }

    /// Incremental refresh: re-resolve relationships from cached catalog
    /// edges plus the relationship file, re-render the named tables, and
    /// re-embed whatever actually changed.
    async fn refresh_tables(&self, tables: &[String]) -> Result<()> {
        if tables.is_empty() {
            return Ok(());
        }
        let _guard = self.rebuild_lock.lock().await;

        let prev = self.shared.load();
        let mut next = (*prev).clone();
        next.relationships = self.resolver.resolve(&next.catalog_edges);

        let mut entries: Vec<(String, String)> = Vec::new();
        for table in tables {
            let key = format!("{}.{}", next.schema.to_lowercase(), table);
            if let Some(doc) = next.documents.get_mut(&key) {
                let base = table_text(&doc.table, doc.comment.as_deref(), &doc.columns);
                doc.text = next.relationships.apply(&doc.table.table, &base);
                entries.push((doc.document_id(), doc.text.clone()));
            }
        }

        let (embedded, skipped) = next.index.upsert_all(&entries, &*self.embedder).await?;
        debug!(
            "Refreshed {} documents ({} embedded, {} unchanged)",
            entries.len(),
            embedded,
            skipped
        );

        self.shared.install(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_catalog::StaticCatalog;
    use scout_core::{Origin, RawColumn};
    use scout_provider::MockEmbedder;
    use scout_relations::RelationshipFile;
    use tempfile::TempDir;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new("northwind")
            .table(
                "customers",
                None,
                vec![
                    RawColumn::new("customerid", "integer", false),
                    RawColumn::new("companyname", "character varying", false),
                ],
            )
            .table(
                "orders",
                None,
                vec![
                    RawColumn::new("orderid", "integer", false),
                    RawColumn::new("customerid", "integer", false),
                ],
            )
    }

    fn indexer(dir: &TempDir) -> Indexer<StaticCatalog, MockEmbedder> {
        let resolver = RelationshipResolver::new(
            "northwind",
            RelationshipFile::new(dir.path().join("relationships.toml")),
        );
        Indexer::new(
            Arc::new(catalog()),
            Arc::new(MockEmbedder::new(32)),
            resolver,
            Arc::new(SharedSnapshot::new(SchemaSnapshot::empty("northwind"))),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_rebuild_installs_snapshot() {
        let dir = TempDir::new().unwrap();
        let idx = indexer(&dir);

        let report = idx.rebuild().await.unwrap();
        assert_eq!(report.tables, 2);
        assert_eq!(report.embedded, 2);
        assert_eq!(report.skipped, 0);

        let snapshot = idx.shared().load();
        assert_eq!(snapshot.documents.len(), 2);
        assert!(snapshot.documents.contains_key("northwind.orders"));
    }

    #[tokio::test]
    async fn test_rebuild_is_incremental_on_unchanged_schema() {
        let dir = TempDir::new().unwrap();
        let idx = indexer(&dir);

        idx.rebuild().await.unwrap();
        let report = idx.rebuild().await.unwrap();
        assert_eq!(report.embedded, 0);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_manual_edit_refreshes_both_documents() {
        let dir = TempDir::new().unwrap();
        let idx = indexer(&dir);
        idx.rebuild().await.unwrap();

        idx.add_manual_edit(
            Relationship::new("orders", "customerid", "customers", "customerid", Origin::ManualEdit)
                .with_description("Each order belongs to a customer"),
        )
        .await
        .unwrap();

        let snapshot = idx.shared().load();
        let orders = &snapshot.documents["northwind.orders"];
        assert!(orders.text.contains("customerid -> northwind.customers.customerid"));
        let customers = &snapshot.documents["northwind.customers"];
        assert!(customers.text.contains("Referenced by northwind.orders.customerid"));
    }

    #[tokio::test]
    async fn test_remove_manual_edit_strips_section() {
        let dir = TempDir::new().unwrap();
        let idx = indexer(&dir);
        idx.rebuild().await.unwrap();

        idx.add_manual_edit(Relationship::new(
            "orders",
            "customerid",
            "customers",
            "customerid",
            Origin::ManualEdit,
        ))
        .await
        .unwrap();
        idx.remove_manual_edit("orders.customerid", "customers.customerid")
            .await
            .unwrap();

        let snapshot = idx.shared().load();
        assert!(!snapshot.documents["northwind.orders"].text.contains("Relationships:"));
    }
}
