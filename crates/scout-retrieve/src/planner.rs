//! Selects the minimal sufficient schema context for a question.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use scout_core::{Embedder, Result, RetrievalConfig, ScoutError, TableId};

use crate::snapshot::SharedSnapshot;

/// One table selected for a question.
#[derive(Debug, Clone)]
pub struct RetrievedTable {
    pub table: TableId,

    /// L2 distance of the table document from the question.
    pub distance: f32,

    /// Relationship-enriched text, pruned to retained columns for wide
    /// tables.
    pub text: String,

    /// Columns retained by pruning; empty when the table was not pruned.
    pub kept_columns: Vec<String>,
}

/// The assembled context for one question, in retrieval-rank order.
#[derive(Debug, Clone)]
pub struct RetrievalPlan {
    pub tables: Vec<RetrievedTable>,
    pub context: String,
}

impl RetrievalPlan {
    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.iter().map(|t| t.table.clone()).collect()
    }
}

/// Retrieval planner over the current schema snapshot.
pub struct Planner<E> {
    shared: Arc<SharedSnapshot>,
    embedder: Arc<E>,
    config: RetrievalConfig,
}

impl<E> Planner<E>
where
    E: Embedder,
{
    pub fn new(shared: Arc<SharedSnapshot>, embedder: Arc<E>, config: RetrievalConfig) -> Self {
        Self {
            shared,
            embedder,
            config,
        }
    }

    /// Whether anything is indexed at all. Lets the pipeline short-circuit
    /// an unindexed schema before spending a provider call.
    pub fn is_indexed(&self) -> bool {
        !self.shared.load().index.is_empty()
    }

    /// Plan the context for a question. The question is embedded once; the
    /// same vector drives the table search and any column sub-searches.
    pub async fn plan(&self, question: &str) -> Result<RetrievalPlan> {
        let snapshot = self.shared.load();
        if snapshot.index.is_empty() {
            return Err(ScoutError::RetrievalEmpty);
        }

        let query = self.embedder.embed_query(question).await?;
        let hits = snapshot.index.search_tables(&query, self.config.k_tables);
        if hits.is_empty() {
            return Err(ScoutError::RetrievalEmpty);
        }

        // Lowercased table names of everything retrieved, for the
        // join-column guarantee.
        let retrieved_names: HashSet<String> = hits
            .iter()
            .filter_map(|(id, _)| snapshot.documents.get(id))
            .map(|doc| doc.table.table.to_lowercase())
            .collect();

        let mut tables = Vec::with_capacity(hits.len());
        for (id, distance) in &hits {
            let Some(doc) = snapshot.documents.get(id) else {
                continue;
            };

            if doc.columns.len() > self.config.column_threshold {
                let col_hits = snapshot
                    .index
                    .search_columns(&query, id, self.config.k_columns);
                let mut keep: HashSet<String> = col_hits
                    .iter()
                    .filter_map(|(col_id, _)| col_id.split('#').nth(1))
                    .map(str::to_string)
                    .collect();

                // Join columns to co-retrieved tables are never pruned,
                // even when semantically dissimilar to the question.
                let name = doc.table.table.to_lowercase();
                let others: HashSet<String> =
                    retrieved_names.iter().filter(|n| **n != name).cloned().collect();
                keep.extend(snapshot.relationships.connecting_columns(&doc.table.table, &others));

                let kept: Vec<_> = doc
                    .columns
                    .iter()
                    .filter(|c| keep.contains(&c.name.to_lowercase()))
                    .cloned()
                    .collect();
                let kept_names: Vec<String> = kept.iter().map(|c| c.name.clone()).collect();

                debug!(
                    "Pruned {} from {} to {} columns",
                    doc.table,
                    doc.columns.len(),
                    kept.len()
                );

                let base = scout_catalog::table_text(&doc.table, doc.comment.as_deref(), &kept);
                let text = snapshot.relationships.apply(&doc.table.table, &base);
                tables.push(RetrievedTable {
                    table: doc.table.clone(),
                    distance: *distance,
                    text,
                    kept_columns: kept_names,
                });
            } else {
                tables.push(RetrievedTable {
                    table: doc.table.clone(),
                    distance: *distance,
                    text: doc.text.clone(),
                    kept_columns: Vec::new(),
                });
            }
        }

        if tables.is_empty() {
            return Err(ScoutError::RetrievalEmpty);
        }

        let mut context = tables
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        if !snapshot.overview.is_empty() {
            context.push_str("\n\n");
            context.push_str(&snapshot.overview);
        }

        debug!(
            "Retrieved {} tables for question {:?}",
            tables.len(),
            question
        );

        Ok(RetrievalPlan { tables, context })
    }
}
