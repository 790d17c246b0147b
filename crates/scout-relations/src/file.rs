//! TOML persistence for config-file and manual relationship edges.
//!
//! The file is keyed by schema name; each entry references `table.column`
//! endpoints. Entries written by the manual-edit API are tagged
//! `manual = true` and outrank plain config entries on the same identity
//! key. Matching is case-insensitive; stored casing is preserved for
//! display.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use scout_core::{Origin, Relationship, Result, ScoutError};

/// One persisted relationship entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// `table.column` of the referencing end.
    pub source: String,

    /// `table.column` of the referenced end.
    pub target: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Whether this entry came from the manual-edit API.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub manual: bool,
}

type FileData = BTreeMap<String, Vec<FileEntry>>;

/// The persisted form of the ConfigFile and ManualEdit origins.
pub struct RelationshipFile {
    path: PathBuf,
}

impl RelationshipFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<FileData> {
        if !self.path.exists() {
            return Ok(FileData::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            ScoutError::config(format!(
                "Failed to parse {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, data: &FileData) -> Result<()> {
        let content = toml::to_string_pretty(data)
            .map_err(|e| ScoutError::config(format!("Failed to serialize relationships: {}", e)))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Relationship edges for one schema. Entries that do not parse as
    /// `table.column -> table.column` are skipped with a warning.
    pub fn edges(&self, schema: &str) -> Result<Vec<Relationship>> {
        let data = self.load()?;
        let entries = data
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(schema))
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[]);

        let mut edges = Vec::with_capacity(entries.len());
        for entry in entries {
            match (split_endpoint(&entry.source), split_endpoint(&entry.target)) {
                (Some((st, sc)), Some((tt, tc))) => {
                    let origin = if entry.manual {
                        Origin::ManualEdit
                    } else {
                        Origin::ConfigFile
                    };
                    edges.push(
                        Relationship::new(st, sc, tt, tc, origin)
                            .with_description(entry.description.clone()),
                    );
                }
                _ => warn!(
                    "Skipping malformed relationship entry {} -> {} in {}",
                    entry.source,
                    entry.target,
                    self.path.display()
                ),
            }
        }
        Ok(edges)
    }

    /// Insert or update a manual edge. An existing entry with the same
    /// endpoints (case-insensitive) is updated in place, keeping its stored
    /// casing.
    pub fn upsert(&self, schema: &str, edge: &Relationship) -> Result<()> {
        let mut data = self.load()?;
        let key = self.schema_key(&data, schema);
        let entries = data.entry(key).or_default();

        let source = edge.source();
        let target = edge.target();
        for existing in entries.iter_mut() {
            if existing.source.eq_ignore_ascii_case(&source)
                && existing.target.eq_ignore_ascii_case(&target)
            {
                existing.description = edge.description.clone().unwrap_or_default();
                existing.manual = true;
                return self.save(&data);
            }
        }

        entries.push(FileEntry {
            source,
            target,
            description: edge.description.clone().unwrap_or_default(),
            manual: true,
        });
        self.save(&data)
    }

    /// Remove an edge by its `table.column` endpoints. Returns whether an
    /// entry was removed.
    pub fn remove(&self, schema: &str, source: &str, target: &str) -> Result<bool> {
        let mut data = self.load()?;
        let key = self.schema_key(&data, schema);
        let Some(entries) = data.get_mut(&key) else {
            return Ok(false);
        };

        let before = entries.len();
        entries.retain(|e| {
            !(e.source.eq_ignore_ascii_case(source) && e.target.eq_ignore_ascii_case(target))
        });
        let removed = entries.len() != before;
        if removed {
            self.save(&data)?;
        }
        Ok(removed)
    }

    /// Resolve the stored key for a schema, preserving existing casing.
    fn schema_key(&self, data: &FileData, schema: &str) -> String {
        data.keys()
            .find(|k| k.eq_ignore_ascii_case(schema))
            .cloned()
            .unwrap_or_else(|| schema.to_string())
    }
}

fn split_endpoint(endpoint: &str) -> Option<(String, String)> {
    let mut parts = endpoint.splitn(2, '.');
    match (parts.next(), parts.next()) {
        (Some(table), Some(column)) if !table.is_empty() && !column.is_empty() => {
            Some((table.to_string(), column.to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(dir: &TempDir) -> RelationshipFile {
        RelationshipFile::new(dir.path().join("relationships.toml"))
    }

    fn manual_edge() -> Relationship {
        Relationship::new("orders", "customerid", "customers", "customerid", Origin::ManualEdit)
            .with_description("Each order belongs to a customer")
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(file(&dir).edges("northwind").unwrap().is_empty());
    }

    #[test]
    fn test_upsert_and_reload() {
        let dir = TempDir::new().unwrap();
        let f = file(&dir);
        f.upsert("northwind", &manual_edge()).unwrap();

        let edges = f.edges("northwind").unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].origin, Origin::ManualEdit);
        assert_eq!(
            edges[0].description.as_deref(),
            Some("Each order belongs to a customer")
        );
    }

    #[test]
    fn test_upsert_updates_existing_entry() {
        let dir = TempDir::new().unwrap();
        let f = file(&dir);
        f.upsert("northwind", &manual_edge()).unwrap();
        f.upsert(
            "northwind",
            &Relationship::new("Orders", "CustomerId", "Customers", "CustomerId", Origin::ManualEdit)
                .with_description("updated"),
        )
        .unwrap();

        let edges = f.edges("northwind").unwrap();
        assert_eq!(edges.len(), 1);
        // The original casing is preserved for display.
        assert_eq!(edges[0].source_table, "orders");
        assert_eq!(edges[0].description.as_deref(), Some("updated"));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let f = file(&dir);
        f.upsert("northwind", &manual_edge()).unwrap();

        assert!(f.remove("northwind", "ORDERS.CUSTOMERID", "customers.customerid").unwrap());
        assert!(f.edges("northwind").unwrap().is_empty());
        assert!(!f.remove("northwind", "orders.customerid", "customers.customerid").unwrap());
    }

    #[test]
    fn test_config_entries_without_manual_flag() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relationships.toml");
        std::fs::write(
            &path,
            r#"
            [[northwind]]
            source = "orders.customerid"
            target = "customers.customerid"
            description = "hand edited"
            "#,
        )
        .unwrap();

        let edges = RelationshipFile::new(&path).edges("northwind").unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].origin, Origin::ConfigFile);
    }

    #[test]
    fn test_schema_lookup_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let f = file(&dir);
        f.upsert("Northwind", &manual_edge()).unwrap();
        assert_eq!(f.edges("northwind").unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relationships.toml");
        std::fs::write(
            &path,
            r#"
            [[northwind]]
            source = "no-dot"
            target = "customers.customerid"

            [[northwind]]
            source = "orders.customerid"
            target = "customers.customerid"
            "#,
        )
        .unwrap();

        let edges = RelationshipFile::new(&path).edges("northwind").unwrap();
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("relationships.toml");
        std::fs::write(&path, "not [ valid toml").unwrap();

        let err = RelationshipFile::new(&path).edges("northwind").unwrap_err();
        assert!(matches!(err, ScoutError::Config { .. }));
    }
}
