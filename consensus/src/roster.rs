//! Voting weights of the members allowed to create witnesses.
//!
//! Members are indexed densely (`0..len`) in ascending `NodeId` order; the
//! per-event "last see" and "strongly see" tables are indexed the same way.

use std::collections::HashMap;
use weft_types::NodeId;

#[derive(Clone, Debug)]
pub struct Roster {
    members: Vec<(NodeId, u64)>,
    index: HashMap<NodeId, usize>,
    total_weight: u64,
}

impl Roster {
    /// Build a roster. Repeated ids have their weights summed.
    pub fn new(entries: impl IntoIterator<Item = (NodeId, u64)>) -> Self {
        let mut weights: HashMap<NodeId, u64> = HashMap::new();
        for (node, weight) in entries {
            let entry = weights.entry(node).or_insert(0);
            *entry = entry.saturating_add(weight);
        }
        let mut members: Vec<(NodeId, u64)> = weights.into_iter().collect();
        members.sort_by_key(|(node, _)| *node);

        let index = members
            .iter()
            .enumerate()
            .map(|(i, (node, _))| (*node, i))
            .collect();
        let total_weight = members
            .iter()
            .fold(0u64, |acc, (_, w)| acc.saturating_add(*w));

        Self {
            members,
            index,
            total_weight,
        }
    }

    /// Dense index of a member, or `None` if the creator is not in the roster.
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.index.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Weight of a member. Returns 0 if not found.
    pub fn weight(&self, node: NodeId) -> u64 {
        self.index_of(node).map(|i| self.members[i].1).unwrap_or(0)
    }

    /// Weight of the member at a dense index. Returns 0 if out of range.
    pub fn weight_at(&self, index: usize) -> u64 {
        self.members.get(index).map(|(_, w)| *w).unwrap_or(0)
    }

    pub fn node_at(&self, index: usize) -> Option<NodeId> {
        self.members.get(index).map(|(n, _)| *n)
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Strictly more than two thirds of the total weight.
    pub fn is_super_majority(&self, part: u64) -> bool {
        3 * part as u128 > 2 * self.total_weight as u128
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.members.iter().copied()
    }
}
