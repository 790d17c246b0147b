//! Priority merge of relationship edges from independent sources.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use scout_core::Relationship;

/// Keep exactly one edge per identity key; the highest-priority origin wins
/// and colliding lower-priority edges are discarded. Collisions are
/// expected (the same join path is often declared in several sources) and
/// are not an error.
///
/// Output order is deterministic (sorted by identity key), which makes
/// repeated merges over unchanged sources structurally identical.
pub fn merge(edges: Vec<Relationship>) -> Vec<Relationship> {
    let mut best: BTreeMap<(String, String, String, String), Relationship> = BTreeMap::new();

    for edge in edges {
        match best.entry(edge.key()) {
            Entry::Vacant(slot) => {
                slot.insert(edge);
            }
            Entry::Occupied(mut slot) => {
                if edge.origin > slot.get().origin {
                    slot.insert(edge);
                }
            }
        }
    }

    best.into_values().collect()
}
