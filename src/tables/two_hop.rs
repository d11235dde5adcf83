//! Two-hop neighborhood table
//!
//! Stores (two-hop node, via one-hop neighbor) associations derived from
//! symmetric neighbors' beacons. The same two-hop node may be reachable
//! through several neighbors; each pair is its own entry.

use tracing::trace;

use crate::domain::{NodeId, Timestamp};
use crate::error::TableError;

/// One (two-hop, via) association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoHopNeighbor {
    /// The node two hops away.
    pub two_hop: NodeId,
    /// The symmetric neighbor that advertised it.
    pub via: NodeId,
    /// Last time this association was advertised.
    pub last_seen: Timestamp,
}

/// Bounded table of two-hop associations.
#[derive(Debug, Clone)]
pub struct TwoHopTable {
    entries: Vec<TwoHopNeighbor>,
    capacity: usize,
}

impl TwoHopTable {
    /// Creates an empty table with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds or refreshes the (two-hop, via) pair. Returns `true` when a new
    /// entry was created.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityFull`] when the pair is new and the
    /// table has no room.
    pub fn add(
        &mut self,
        two_hop: NodeId,
        via: NodeId,
        now: Timestamp,
    ) -> Result<bool, TableError> {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.two_hop == two_hop && e.via == via)
        {
            entry.last_seen = now;
            return Ok(false);
        }

        if self.entries.len() >= self.capacity {
            return Err(TableError::CapacityFull {
                id: two_hop,
                capacity: self.capacity,
            });
        }

        trace!(%two_hop, %via, "new two-hop association");
        self.entries.push(TwoHopNeighbor {
            two_hop,
            via,
            last_seen: now,
        });
        Ok(true)
    }

    /// Drops every association advertised through `via`. Returns the number
    /// of entries removed.
    pub fn remove_via(&mut self, via: NodeId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.via != via);
        before - self.entries.len()
    }

    /// Drops every association whose two-hop node is `target`. Used when a
    /// former two-hop node becomes a direct symmetric neighbor.
    pub fn remove_target(&mut self, target: NodeId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.two_hop != target);
        before - self.entries.len()
    }

    /// Drops associations not re-advertised within `max_age`. Returns the
    /// number removed.
    pub fn cleanup_expired(&mut self, now: Timestamp, max_age: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| now.saturating_sub(e.last_seen) <= max_age);
        before - self.entries.len()
    }

    /// Distinct two-hop node ids, in order of first appearance.
    #[must_use]
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.two_hop) {
                ids.push(entry.two_hop);
            }
        }
        ids
    }

    /// Two-hop nodes reachable through `via`, in table order.
    #[must_use]
    pub fn reachable_via(&self, via: NodeId) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|e| e.via == via)
            .map(|e| e.two_hop)
            .collect()
    }

    /// Neighbors through which `two_hop` is reachable, in table order.
    #[must_use]
    pub fn vias_for(&self, two_hop: NodeId) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|e| e.two_hop == two_hop)
            .map(|e| e.via)
            .collect()
    }

    /// Whether the exact (two-hop, via) pair is present.
    #[must_use]
    pub fn contains(&self, two_hop: NodeId, via: NodeId) -> bool {
        self.entries
            .iter()
            .any(|e| e.two_hop == two_hop && e.via == via)
    }

    /// All associations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TwoHopNeighbor> {
        self.entries.iter()
    }

    /// Number of associations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
