//! Per-table relationship adjacency.

use std::collections::{HashMap, HashSet};

use scout_core::Relationship;

/// The merged set of relationships for one schema, indexed by table.
///
/// Stored unidirectionally; presentation is bidirectional (a table also
/// lists the edges that reference it). Rebuilt as a whole and swapped in
/// atomically; never partially updated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipMap {
    schema: String,
    edges: Vec<Relationship>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl RelationshipMap {
    /// Build the adjacency from already-merged edges.
    pub fn build(schema: impl Into<String>, edges: Vec<Relationship>) -> Self {
        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, edge) in edges.iter().enumerate() {
            outgoing
                .entry(edge.source_table.to_lowercase())
                .or_default()
                .push(i);
            incoming
                .entry(edge.target_table.to_lowercase())
                .or_default()
                .push(i);
        }

        Self {
            schema: schema.into(),
            edges,
            outgoing,
            incoming,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// All merged edges, in deterministic order.
    pub fn edges(&self) -> &[Relationship] {
        &self.edges
    }

    /// Edges whose source is `table` (name, case-insensitive).
    pub fn outgoing(&self, table: &str) -> impl Iterator<Item = &Relationship> {
        self.indexed(&self.outgoing, table)
    }

    /// Edges whose target is `table` (name, case-insensitive).
    pub fn incoming(&self, table: &str) -> impl Iterator<Item = &Relationship> {
        self.indexed(&self.incoming, table)
    }

    fn indexed<'a>(
        &'a self,
        side: &'a HashMap<String, Vec<usize>>,
        table: &str,
    ) -> impl Iterator<Item = &'a Relationship> {
        side.get(&table.to_lowercase())
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.edges[i])
    }

    /// Render the trailing relationship section for one table's document,
    /// or None when the table has no edges.
    pub fn section(&self, table: &str) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();

        for edge in self.outgoing(table) {
            parts.push(format!(
                "{} -> {}.{}.{}{}",
                edge.source_column,
                self.schema,
                edge.target_table,
                edge.target_column,
                desc_suffix(edge)
            ));
        }
        for edge in self.incoming(table) {
            parts.push(format!(
                "Referenced by {}.{}.{}{}",
                self.schema,
                edge.source_table,
                edge.source_column,
                desc_suffix(edge)
            ));
        }

        if parts.is_empty() {
            None
        } else {
            Some(format!("Relationships: {}", parts.join("; ")))
        }
    }

    /// Append the relationship section to a rendered document text.
    pub fn apply(&self, table: &str, text: &str) -> String {
        match self.section(table) {
            Some(section) => format!("{}\n{}", text, section),
            None => text.to_string(),
        }
    }

    /// Columns of `table` that join it to any table in `others` (lowercase
    /// table names). These columns must survive any column pruning.
    pub fn connecting_columns(&self, table: &str, others: &HashSet<String>) -> HashSet<String> {
        let mut keep = HashSet::new();

        for edge in self.outgoing(table) {
            if others.contains(&edge.target_table.to_lowercase()) {
                keep.insert(edge.source_column.to_lowercase());
            }
        }
        for edge in self.incoming(table) {
            if others.contains(&edge.source_table.to_lowercase()) {
                keep.insert(edge.target_column.to_lowercase());
            }
        }

        keep
    }
}

fn desc_suffix(edge: &Relationship) -> String {
    edge.description
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_core::Origin;

    fn map() -> RelationshipMap {
        RelationshipMap::build(
            "northwind",
            vec![
                Relationship::new("orders", "customerid", "customers", "customerid", Origin::ConfigFile)
                    .with_description("Each order belongs to a customer"),
                Relationship::new("order_details", "orderid", "orders", "orderid", Origin::DatabaseConstraint),
            ],
        )
    }

    #[test]
    fn test_section_outgoing_and_incoming() {
        let m = map();
        let orders = m.section("orders").unwrap();
        assert!(orders.contains(
            "customerid -> northwind.customers.customerid (Each order belongs to a customer)"
        ));
        assert!(orders.contains("Referenced by northwind.order_details.orderid"));

        let customers = m.section("customers").unwrap();
        assert!(customers.contains("Referenced by northwind.orders.customerid"));
    }

    #[test]
    fn test_section_none_for_isolated_table() {
        assert_eq!(map().section("shippers"), None);
    }

    #[test]
    fn test_apply_appends_section() {
        let text = "Schema: northwind, Table: northwind.orders\nColumns: orderid (integer)";
        let applied = map().apply("orders", text);
        assert!(applied.starts_with(text));
        assert!(applied.contains("\nRelationships: "));
    }

    #[test]
    fn test_connecting_columns() {
        let m = map();
        let others: HashSet<String> = ["customers".to_string()].into();
        let keep = m.connecting_columns("orders", &others);
        assert!(keep.contains("customerid"));

        // The reverse direction keeps the target column.
        let others: HashSet<String> = ["orders".to_string()].into();
        let keep = m.connecting_columns("customers", &others);
        assert!(keep.contains("customerid"));

        // Unrelated co-retrieved tables keep nothing.
        let others: HashSet<String> = ["shippers".to_string()].into();
        assert!(m.connecting_columns("orders", &others).is_empty());
    }
}
