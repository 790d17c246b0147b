//! scout-relations - Relationship Resolver
//!
//! Collects join-path facts from up to four independently-maintained
//! sources (database constraints, comment hints, the relationship file,
//! manual edits), deduplicates them by identity key with an explicit
//! priority order, and exposes a per-table relationship map.

mod file;
mod map;
mod merge;
mod resolver;

pub use file::{FileEntry, RelationshipFile};
pub use map::RelationshipMap;
pub use merge::merge;
pub use resolver::RelationshipResolver;
