//! Collects join-path facts from all sources and owns the merged map.

use tracing::{info, warn};

use scout_core::{Catalog, Relationship, Result};

use crate::file::RelationshipFile;
use crate::map::RelationshipMap;
use crate::merge::merge;

/// Resolves the relationship map for one schema from its four sources.
///
/// A source that is empty or unavailable contributes nothing rather than
/// failing the whole collection.
pub struct RelationshipResolver {
    schema: String,
    file: RelationshipFile,
}

impl RelationshipResolver {
    pub fn new(schema: impl Into<String>, file: RelationshipFile) -> Self {
        Self {
            schema: schema.into(),
            file,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Declared foreign-key constraints from the catalog. Unavailable
    /// catalogs contribute nothing.
    pub async fn constraint_edges(&self, catalog: &dyn Catalog) -> Vec<Relationship> {
        match catalog.foreign_keys(&self.schema).await {
            Ok(edges) => edges,
            Err(e) => {
                warn!("Could not read foreign-key constraints: {}", e);
                Vec::new()
            }
        }
    }

    /// Merge catalog-derived edges (constraints and comment hints) with the
    /// relationship file into the final map. Synchronous so incremental
    /// refreshes can reuse cached catalog edges without re-introspecting.
    pub fn resolve(&self, catalog_edges: &[Relationship]) -> RelationshipMap {
        let mut edges = catalog_edges.to_vec();

        match self.file.edges(&self.schema) {
            Ok(file_edges) => edges.extend(file_edges),
            Err(e) => warn!("Relationship file unavailable: {}", e),
        }

        let merged = merge(edges);
        info!(
            "Resolved {} relationships for schema {}",
            merged.len(),
            self.schema
        );
        RelationshipMap::build(&self.schema, merged)
    }

    /// One-shot collection: constraints, hints, and the file, merged.
    pub async fn collect(
        &self,
        catalog: &dyn Catalog,
        hints: &[Relationship],
    ) -> RelationshipMap {
        let mut edges = self.constraint_edges(catalog).await;
        edges.extend_from_slice(hints);
        self.resolve(&edges)
    }

    /// Persist a manual edge. Returns the lowercased names of the tables
    /// whose documents need a refresh: the source, and the target when its
    /// "referenced by" section changes too.
    pub fn add_manual_edit(&self, edge: &Relationship) -> Result<Vec<String>> {
        self.file.upsert(&self.schema, edge)?;
        Ok(affected_tables(
            &edge.source_table.to_lowercase(),
            &edge.target_table.to_lowercase(),
        ))
    }

    /// Remove a manually-managed edge by its `table.column` endpoints.
    /// This only removes the file entry; an edge declared by a database
    /// constraint or comment hint reappears from those sources.
    pub fn remove_manual_edit(&self, source: &str, target: &str) -> Result<Vec<String>> {
        let removed = self.file.remove(&self.schema, source, target)?;
        if !removed {
            return Ok(Vec::new());
        }
        let source_table = source.split('.').next().unwrap_or(source).to_lowercase();
        let target_table = target.split('.').next().unwrap_or(target).to_lowercase();
        Ok(affected_tables(&source_table, &target_table))
    }
}

fn affected_tables(source: &str, target: &str) -> Vec<String> {
    if source == target {
        vec![source.to_string()]
    } else {
        vec![source.to_string(), target.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_catalog::StaticCatalog;
    use scout_core::{Origin, RawColumn};
    use tempfile::TempDir;

    fn resolver(dir: &TempDir) -> RelationshipResolver {
        RelationshipResolver::new(
            "northwind",
            RelationshipFile::new(dir.path().join("relationships.toml")),
        )
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new("northwind")
            .table(
                "orders",
                None,
                vec![RawColumn::new("orderid", "integer", false)],
            )
            .foreign_key(Relationship::new(
                "orders",
                "customerid",
                "customers",
                "customerid",
                Origin::DatabaseConstraint,
            ))
    }

    #[tokio::test]
    async fn test_collect_merges_sources_by_priority() {
        let dir = TempDir::new().unwrap();
        let r = resolver(&dir);
        r.add_manual_edit(
            &Relationship::new("orders", "customerid", "customers", "customerid", Origin::ManualEdit)
                .with_description("manual override"),
        )
        .unwrap();

        let hints = vec![Relationship::new(
            "orders",
            "customerid",
            "customers",
            "customerid",
            Origin::CommentHint,
        )];
        let map = r.collect(&catalog(), &hints).await;

        assert_eq!(map.len(), 1);
        assert_eq!(map.edges()[0].origin, Origin::ManualEdit);
        assert_eq!(map.edges()[0].description.as_deref(), Some("manual override"));
    }

    #[tokio::test]
    async fn test_collect_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let r = resolver(&dir);
        let hints = vec![Relationship::new(
            "order_details",
            "orderid",
            "orders",
            "orderid",
            Origin::CommentHint,
        )];

        let first = r.collect(&catalog(), &hints).await;
        let second = r.collect(&catalog(), &hints).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_remove_manual_edit_does_not_suppress_constraint() {
        let dir = TempDir::new().unwrap();
        let r = resolver(&dir);
        r.add_manual_edit(&Relationship::new(
            "orders",
            "customerid",
            "customers",
            "customerid",
            Origin::ManualEdit,
        ))
        .unwrap();

        let affected = r
            .remove_manual_edit("orders.customerid", "customers.customerid")
            .unwrap();
        assert_eq!(affected, vec!["orders".to_string(), "customers".to_string()]);

        // The constraint edge is still there after removal.
        let map = r.collect(&catalog(), &[]).await;
        assert_eq!(map.len(), 1);
        assert_eq!(map.edges()[0].origin, Origin::DatabaseConstraint);
    }

    #[test]
    fn test_add_manual_edit_reports_affected_tables() {
        let dir = TempDir::new().unwrap();
        let r = resolver(&dir);
        let affected = r
            .add_manual_edit(&Relationship::new(
                "Orders",
                "customerid",
                "Customers",
                "customerid",
                Origin::ManualEdit,
            ))
            .unwrap();
        assert_eq!(affected, vec!["orders".to_string(), "customers".to_string()]);
    }
}
