//! scout-index - Embedding Index
//!
//! A flat Euclidean-distance vector index over table documents and, for
//! wide tables, per-column sub-documents. Records carry the blake3 hash of
//! their source text so a rebuild skips re-embedding unchanged documents.

mod index;

pub use index::EmbeddingIndex;
