//! Beacon (HELLO) subsystem
//!
//! Beacons are single-hop and carry everything a neighbor needs to sense
//! link symmetry, learn the two-hop neighborhood, track TDMA reservations
//! and discover whether it has been picked as a relay. Reception runs a
//! fixed pipeline: slot updates, symmetry sensing, two-hop derivation,
//! relay recomputation, selector bookkeeping, reservation expiry.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{
    HopDistance, LinkStatus, NodeId, SlotId, Timestamp, Ttl, Willingness,
};
use crate::engine::{OlsrEngine, broadcast};
use crate::tables::NeighborChange;
use crate::transport::ControlPayload;

/// One advertised neighbor record inside a beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisedNeighbor {
    /// The advertised neighbor's id.
    pub id: NodeId,
    /// The advertiser's view of that link.
    pub link: LinkStatus,
}

/// One advertised two-hop record inside a beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisedTwoHop {
    /// The node two hops from the advertiser.
    pub two_hop: NodeId,
    /// The advertiser's neighbor it is reached through.
    pub via: NodeId,
    /// That node's TDMA reservation, as known to the advertiser.
    pub reserved_slot: Option<SlotId>,
}

/// The structured beacon payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloSnapshot {
    /// The sender's beacon period in seconds.
    pub hello_interval: u16,
    /// The sender's willingness to relay.
    pub willingness: Willingness,
    /// The sender's own TDMA reservation.
    pub reserved_slot: Option<SlotId>,
    /// The sender's one-hop neighborhood.
    pub neighbors: Vec<AdvertisedNeighbor>,
    /// The sender's two-hop neighborhood with relayed reservations.
    pub two_hop_neighbors: Vec<AdvertisedTwoHop>,
}

impl HelloSnapshot {
    /// The advertised record for `id`, if the beacon lists it.
    #[must_use]
    pub fn advertised(&self, id: NodeId) -> Option<&AdvertisedNeighbor> {
        self.neighbors.iter().find(|n| n.id == id)
    }
}

impl OlsrEngine {
    /// Builds a beacon from the engine's current state.
    ///
    /// Neighbors currently used as relays are advertised with the relay
    /// link code instead of plain symmetric, which is how a neighbor learns
    /// it has been selected.
    #[must_use]
    pub(crate) fn generate_hello(&self) -> HelloSnapshot {
        let neighbors = self
            .neighbors
            .iter()
            .map(|n| AdvertisedNeighbor {
                id: n.id,
                link: if n.is_mpr && n.is_symmetric() {
                    LinkStatus::MprNeighbor
                } else {
                    n.link
                },
            })
            .collect();
        let two_hop_neighbors = self
            .two_hop
            .iter()
            .map(|t| AdvertisedTwoHop {
                two_hop: t.two_hop,
                via: t.via,
                reserved_slot: self.slots.reservation_for(t.two_hop).map(|r| r.slot),
            })
            .collect();
        HelloSnapshot {
            hello_interval: self.config.hello_interval.as_secs() as u16,
            willingness: self.willingness,
            reserved_slot: self.slots.own_slot(),
            neighbors,
            two_hop_neighbors,
        }
    }

    /// Generates and queues one beacon.
    pub(crate) fn send_hello(&mut self, now: Timestamp) {
        let snapshot = self.generate_hello();
        let seq = self.next_seq();
        let message = broadcast(
            ControlPayload::Hello(snapshot),
            self.node_id,
            seq,
            Ttl::one_hop(),
        );
        if self.enqueue_control(message, now) {
            self.stats.hellos_sent += 1;
        }
    }

    /// Processes one received beacon.
    pub(crate) fn apply_hello(&mut self, hello: &HelloSnapshot, sender: NodeId, now: Timestamp) {
        self.stats.hellos_received += 1;
        trace!(
            %sender,
            neighbors = hello.neighbors.len(),
            two_hop = hello.two_hop_neighbors.len(),
            "beacon received"
        );

        // Reservations first: the sender's own slot, then the relayed ones.
        if self
            .slots
            .update(sender, hello.reserved_slot, HopDistance::OneHop, now)
            .is_err()
        {
            self.stats.capacity_drops += 1;
        }
        for relayed in &hello.two_hop_neighbors {
            if relayed.two_hop == self.node_id {
                continue;
            }
            if self
                .slots
                .update(
                    relayed.two_hop,
                    relayed.reserved_slot,
                    HopDistance::TwoHop,
                    now,
                )
                .is_err()
            {
                self.stats.capacity_drops += 1;
            }
        }

        // Link symmetry: the link is bidirectional exactly when the sender
        // heard us recently enough to list us.
        let link = if hello.advertised(self.node_id).is_some() {
            LinkStatus::Symmetric
        } else {
            LinkStatus::Asymmetric
        };
        match self.neighbors.upsert(sender, link, hello.willingness, now) {
            Ok(NeighborChange::Refreshed) => {}
            Ok(NeighborChange::Created | NeighborChange::LinkChanged) => {
                self.topology_changed = true;
            }
            Err(error) => {
                trace!(%error, "beacon from unknown sender dropped at capacity");
                self.stats.capacity_drops += 1;
                return;
            }
        }
        self.neighbors.mark_heard(sender, now);

        if link == LinkStatus::Symmetric {
            // A node we now reach directly is no longer two-hop state.
            if self.two_hop.remove_target(sender) > 0 {
                self.topology_changed = true;
            }
            self.derive_two_hop(hello, sender, now);
        }

        self.recompute_mpr_set();

        // The sender advertising us with the relay code means it selected
        // this node as one of its relays.
        let selects_us = hello
            .advertised(self.node_id)
            .is_some_and(|n| n.link == LinkStatus::MprNeighbor);
        self.neighbors.set_mpr_selector(sender, selects_us);

        self.slots
            .cleanup_expired(now, self.config.slot_reservation_timeout.as_secs());
    }

    /// Two-hop derivation from a symmetric sender's advertised neighbors.
    fn derive_two_hop(&mut self, hello: &HelloSnapshot, sender: NodeId, now: Timestamp) {
        for advertised in &hello.neighbors {
            if advertised.id == self.node_id {
                continue;
            }
            if !advertised.link.is_symmetric() {
                continue;
            }
            if self.neighbors.contains(advertised.id) {
                continue;
            }
            match self.two_hop.add(advertised.id, sender, now) {
                Ok(true) => self.topology_changed = true,
                Ok(false) => {}
                Err(error) => {
                    trace!(%error, "two-hop association dropped at capacity");
                    self.stats.capacity_drops += 1;
                }
            }
        }
    }
}
