//! scout-catalog - Document Builder
//!
//! This crate turns raw catalog metadata (tables, columns, types,
//! nullability, free-text comments) into one semantic document per table,
//! extracts `[FK: table.column]` relationship hints from comments, and
//! classifies a schema's naming style.

mod builder;
mod fixture;
mod hints;
mod naming;

pub use builder::{column_text, table_text, CatalogBuild, DocumentBuilder};
pub use fixture::StaticCatalog;
pub use hints::parse_comment;
pub use naming::{classify, is_cryptic};
