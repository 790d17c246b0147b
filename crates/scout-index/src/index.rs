//! Flat L2 embedding index with content-hash change detection.

use std::collections::BTreeMap;

use tracing::debug;

use scout_core::{column_document_id, text_hash, Embedder, EmbeddingRecord, Result};

/// In-memory nearest-neighbor index.
///
/// Table documents are keyed by `schema.table`; column sub-documents by
/// `schema.table#column`. Records live in a `BTreeMap` so iteration order,
/// and therefore distance ties, resolve deterministically.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    records: BTreeMap<String, EmbeddingRecord>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, document_id: &str) -> Option<&EmbeddingRecord> {
        self.records.get(document_id)
    }

    /// Number of table-level documents (excludes column sub-documents).
    pub fn table_count(&self) -> usize {
        self.records.keys().filter(|id| !id.contains('#')).count()
    }

    /// Upsert documents, re-embedding only those whose text hash changed.
    /// Returns `(embedded, skipped)` counts.
    pub async fn upsert_all(
        &mut self,
        entries: &[(String, String)],
        embedder: &dyn Embedder,
    ) -> Result<(usize, usize)> {
        let mut pending: Vec<(&str, &str, [u8; 32])> = Vec::new();
        let mut skipped = 0usize;

        for (id, text) in entries {
            let hash = text_hash(text);
            match self.records.get(id) {
                Some(record) if record.source_hash == hash => skipped += 1,
                _ => pending.push((id, text, hash)),
            }
        }

        if !pending.is_empty() {
            let texts: Vec<&str> = pending.iter().map(|(_, text, _)| *text).collect();
            let vectors = embedder.embed_documents(&texts).await?;
            for ((id, _, hash), vector) in pending.iter().zip(vectors) {
                self.records.insert(
                    id.to_string(),
                    EmbeddingRecord {
                        document_id: id.to_string(),
                        vector,
                        source_hash: *hash,
                    },
                );
            }
        }

        debug!(
            "Index upsert: {} embedded, {} unchanged",
            pending.len(),
            skipped
        );
        Ok((pending.len(), skipped))
    }

    /// Drop every record whose id is not in the current document set.
    pub fn retain_ids(&mut self, keep: &std::collections::HashSet<String>) {
        self.records.retain(|id, _| keep.contains(id));
    }

    /// k nearest table documents by Euclidean distance, ascending, ties
    /// broken by document id.
    pub fn search_tables(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        self.search_filtered(query, k, |id| !id.contains('#'))
    }

    /// Same semantics, restricted to the column sub-documents of one table.
    pub fn search_columns(&self, query: &[f32], table_key: &str, k: usize) -> Vec<(String, f32)> {
        let prefix = column_document_id(table_key, "");
        self.search_filtered(query, k, |id| id.starts_with(&prefix))
    }

    fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        filter: impl Fn(&str) -> bool,
    ) -> Vec<(String, f32)> {
        let mut hits: Vec<(String, f32)> = self
            .records
            .values()
            .filter(|record| filter(&record.document_id))
            .map(|record| {
                (
                    record.document_id.clone(),
                    l2_distance(query, &record.vector),
                )
            })
            .collect();

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(k);
        hits
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds each text as a one-hot-ish vector derived from its length,
    /// and counts how many texts were actually embedded.
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn embedded(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, t.bytes().map(f32::from).sum::<f32>() % 7.0])
                .collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            Ok(self.embed_documents(&[text]).await?.remove(0))
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn entries() -> Vec<(String, String)> {
        vec![
            ("main.customers".to_string(), "customer companies".to_string()),
            ("main.orders".to_string(), "orders placed by customers".to_string()),
            ("main.orders#freight".to_string(), "shipping cost".to_string()),
        ]
    }

    #[tokio::test]
    async fn test_upsert_skips_unchanged() {
        let embedder = CountingEmbedder::new();
        let mut index = EmbeddingIndex::new();

        let (embedded, skipped) = index.upsert_all(&entries(), &embedder).await.unwrap();
        assert_eq!((embedded, skipped), (3, 0));

        let (embedded, skipped) = index.upsert_all(&entries(), &embedder).await.unwrap();
        assert_eq!((embedded, skipped), (0, 3));
        assert_eq!(embedder.embedded(), 3);

        // Changing one text re-embeds only that document.
        let mut changed = entries();
        changed[1].1 = "orders placed by customers, with ship dates".to_string();
        let (embedded, skipped) = index.upsert_all(&changed, &embedder).await.unwrap();
        assert_eq!((embedded, skipped), (1, 2));
    }

    #[tokio::test]
    async fn test_search_excludes_column_documents() {
        let embedder = CountingEmbedder::new();
        let mut index = EmbeddingIndex::new();
        index.upsert_all(&entries(), &embedder).await.unwrap();

        let hits = index.search_tables(&[0.0, 0.0], 10);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|(id, _)| !id.contains('#')));
        assert_eq!(index.table_count(), 2);
    }

    #[tokio::test]
    async fn test_search_returns_at_most_k_sorted() {
        let embedder = CountingEmbedder::new();
        let mut index = EmbeddingIndex::new();
        index.upsert_all(&entries(), &embedder).await.unwrap();

        let hits = index.search_tables(&[0.0, 0.0], 1);
        assert_eq!(hits.len(), 1);

        let all = index.search_tables(&[0.0, 0.0], 10);
        for pair in all.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[tokio::test]
    async fn test_search_is_deterministic() {
        let embedder = CountingEmbedder::new();
        let mut index = EmbeddingIndex::new();
        index.upsert_all(&entries(), &embedder).await.unwrap();

        let a = index.search_tables(&[3.0, 1.0], 5);
        let b = index.search_tables(&[3.0, 1.0], 5);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_tie_break_by_document_id() {
        let embedder = CountingEmbedder::new();
        let mut index = EmbeddingIndex::new();
        // Same text, so identical vectors and identical distances.
        let entries = vec![
            ("main.b_table".to_string(), "same text".to_string()),
            ("main.a_table".to_string(), "same text".to_string()),
        ];
        index.upsert_all(&entries, &embedder).await.unwrap();

        let hits = index.search_tables(&[0.0, 0.0], 2);
        assert_eq!(hits[0].0, "main.a_table");
        assert_eq!(hits[1].0, "main.b_table");
    }

    #[tokio::test]
    async fn test_column_search_is_scoped_to_table() {
        let embedder = CountingEmbedder::new();
        let mut index = EmbeddingIndex::new();
        index.upsert_all(&entries(), &embedder).await.unwrap();

        let hits = index.search_columns(&[0.0, 0.0], "main.orders", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "main.orders#freight");

        assert!(index.search_columns(&[0.0, 0.0], "main.customers", 10).is_empty());
    }

    #[tokio::test]
    async fn test_retain_ids_drops_stale_records() {
        let embedder = CountingEmbedder::new();
        let mut index = EmbeddingIndex::new();
        index.upsert_all(&entries(), &embedder).await.unwrap();

        let keep: std::collections::HashSet<String> = ["main.customers".to_string()].into();
        index.retain_ids(&keep);
        assert_eq!(index.len(), 1);
        assert!(index.get("main.orders").is_none());
    }
}
