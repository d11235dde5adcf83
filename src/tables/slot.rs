//! TDMA slot reservation table
//!
//! Reservations are piggy-backed on beacons: a neighbor announces its own
//! slot directly, and relays the slots of its neighbors as two-hop
//! information. The table answers one question for the medium-access layer:
//! is a given slot free within two hops of this node?

use tracing::trace;

use crate::domain::{HopDistance, NodeId, SlotId, Timestamp};
use crate::error::TableError;

/// One node's announced slot reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotReservation {
    /// The reserving node.
    pub node: NodeId,
    /// The slot it holds.
    pub slot: SlotId,
    /// How far away the reservation was learned.
    pub hop_distance: HopDistance,
    /// Last time the reservation was re-announced.
    pub last_updated: Timestamp,
}

/// Bounded reservation table for the two-hop neighborhood.
#[derive(Debug, Clone)]
pub struct SlotTable {
    self_id: NodeId,
    own_slot: Option<SlotId>,
    entries: Vec<SlotReservation>,
    capacity: usize,
}

impl SlotTable {
    /// Creates an empty table for the given local node.
    #[must_use]
    pub fn new(self_id: NodeId, own_slot: Option<SlotId>, capacity: usize) -> Self {
        Self {
            self_id,
            own_slot,
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// The local node's announced slot.
    #[must_use]
    pub fn own_slot(&self) -> Option<SlotId> {
        self.own_slot
    }

    /// Changes the local node's announced slot.
    pub fn set_own_slot(&mut self, slot: Option<SlotId>) {
        self.own_slot = slot;
    }

    /// Records, refreshes or clears a node's reservation.
    ///
    /// `slot = None` withdraws the node's reservation; announcements about
    /// the local node itself are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityFull`] when the node is new and the
    /// table has no room.
    pub fn update(
        &mut self,
        node: NodeId,
        slot: Option<SlotId>,
        hop_distance: HopDistance,
        now: Timestamp,
    ) -> Result<(), TableError> {
        if node == self.self_id {
            return Ok(());
        }
        let Some(slot) = slot else {
            self.remove(node);
            return Ok(());
        };

        if let Some(entry) = self.entries.iter_mut().find(|e| e.node == node) {
            entry.slot = slot;
            entry.hop_distance = hop_distance;
            entry.last_updated = now;
            return Ok(());
        }

        if self.entries.len() >= self.capacity {
            return Err(TableError::CapacityFull {
                id: node,
                capacity: self.capacity,
            });
        }

        trace!(%node, %slot, ?hop_distance, "new slot reservation");
        self.entries.push(SlotReservation {
            node,
            slot,
            hop_distance,
            last_updated: now,
        });
        Ok(())
    }

    /// Drops a node's reservation, if any.
    pub fn remove(&mut self, node: NodeId) {
        self.entries.retain(|e| e.node != node);
    }

    /// The reservation announced by `node`, if known.
    #[must_use]
    pub fn reservation_for(&self, node: NodeId) -> Option<&SlotReservation> {
        self.entries.iter().find(|e| e.node == node)
    }

    /// Whether `slot` is unused by this node and every known reservation.
    #[must_use]
    pub fn is_slot_available(&self, slot: SlotId) -> bool {
        self.own_slot != Some(slot) && !self.entries.iter().any(|e| e.slot == slot)
    }

    /// Distinct occupied slots, including this node's own, sorted.
    #[must_use]
    pub fn occupied_slots(&self) -> Vec<SlotId> {
        let mut slots: Vec<SlotId> = self.entries.iter().map(|e| e.slot).collect();
        if let Some(own) = self.own_slot {
            slots.push(own);
        }
        slots.sort_unstable();
        slots.dedup();
        slots
    }

    /// Drops reservations not re-announced within `max_age`. Returns the
    /// number removed.
    pub fn cleanup_expired(&mut self, now: Timestamp, max_age: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| now.saturating_sub(e.last_updated) <= max_age);
        before - self.entries.len()
    }

    /// All reservations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SlotReservation> {
        self.entries.iter()
    }

    /// Number of known reservations (the local node's excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no reservations are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
