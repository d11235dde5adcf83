//! Topology control (TC) subsystem
//!
//! A node with at least one relay selector periodically floods the list of
//! those selectors; every receiver learns the advertised links
//! (originator, selector) and feeds them to route computation. Flooding is
//! relay-scoped: a receiver re-queues the message only when the sender has
//! selected it as a relay, and duplicate suppression keeps each
//! (originator, sequence) pair to a single processing.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::domain::{Ansn, HopCount, MessageSeq, NodeId, Timestamp, Ttl};
use crate::engine::{OlsrEngine, broadcast};
use crate::tables::LinkUpdate;
use crate::transport::{ControlPayload, OutboundMessage};

/// The structured topology control payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcSnapshot {
    /// Version of the originator's advertised neighbor set.
    pub ansn: Ansn,
    /// The originator's current relay selectors.
    pub mpr_selectors: Vec<NodeId>,
}

impl OlsrEngine {
    /// Builds a topology advertisement, or `None` when no neighbor has
    /// selected this node as a relay (in which case there is nothing worth
    /// flooding).
    #[must_use]
    pub(crate) fn generate_tc(&mut self) -> Option<TcSnapshot> {
        let mpr_selectors: Vec<NodeId> = self
            .neighbors
            .iter()
            .filter(|n| n.is_mpr_selector && n.is_symmetric())
            .map(|n| n.id)
            .collect();
        if mpr_selectors.is_empty() {
            return None;
        }
        Some(TcSnapshot {
            ansn: self.ansn.next(),
            mpr_selectors,
        })
    }

    /// Generates and queues one topology advertisement.
    ///
    /// The (own id, sequence) pair goes straight into the duplicate cache
    /// so an echo of our own flood is never re-processed.
    pub(crate) fn send_tc(&mut self, now: Timestamp) {
        let Some(snapshot) = self.generate_tc() else {
            return;
        };
        let seq = self.next_seq();
        self.duplicates.record(self.node_id, seq, now);
        trace!(%seq, ansn = %snapshot.ansn, selectors = snapshot.mpr_selectors.len(), "flooding topology advertisement");
        let message = broadcast(ControlPayload::Tc(snapshot), self.node_id, seq, Ttl::flood());
        if self.enqueue_control(message, now) {
            self.stats.tcs_sent += 1;
        }
    }

    /// Processes one received topology advertisement.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn apply_tc(
        &mut self,
        tc: &TcSnapshot,
        sender: NodeId,
        originator: NodeId,
        seq: MessageSeq,
        ttl: Ttl,
        hop_count: HopCount,
        now: Timestamp,
    ) {
        // Never learn topology about ourselves from the network; our own
        // floods come back as echoes with our id as originator.
        if originator == self.node_id {
            self.stats.duplicates_dropped += 1;
            return;
        }
        if self.duplicates.is_duplicate(originator, seq) {
            trace!(%originator, %seq, "duplicate flood suppressed");
            self.stats.duplicates_dropped += 1;
            return;
        }
        self.duplicates.record(originator, seq, now);
        self.stats.tcs_received += 1;

        let valid_until = now.saturating_add(self.config.tc_validity_time.as_secs());
        for &selector in &tc.mpr_selectors {
            if selector == originator {
                continue;
            }
            match self
                .topology
                .upsert(originator, selector, tc.ansn, valid_until)
            {
                Ok(LinkUpdate::Inserted | LinkUpdate::Refreshed) => {}
                Ok(LinkUpdate::Stale) => self.stats.stale_link_updates += 1,
                Err(error) => {
                    debug!(%error, "advertised link dropped at capacity");
                    self.stats.capacity_drops += 1;
                }
            }
        }

        self.update_routing_table(now);

        self.forward_tc(tc, sender, originator, seq, ttl, hop_count, now);
    }

    /// Relay-scoped flood forwarding: re-queue only when the sender has
    /// selected this node as a relay and hop budget remains.
    #[allow(clippy::too_many_arguments)]
    fn forward_tc(
        &mut self,
        tc: &TcSnapshot,
        sender: NodeId,
        originator: NodeId,
        seq: MessageSeq,
        ttl: Ttl,
        hop_count: HopCount,
        now: Timestamp,
    ) {
        let sender_selected_us = self
            .neighbors
            .find(sender)
            .is_some_and(|n| n.is_mpr_selector && n.is_symmetric());
        if !sender_selected_us || !ttl.allows_forwarding() {
            return;
        }
        trace!(%originator, %seq, "relaying topology advertisement");
        let message = OutboundMessage {
            kind: crate::transport::MsgKind::Tc,
            payload: ControlPayload::Tc(tc.clone()),
            originator,
            seq,
            ttl: ttl.decremented(),
            hop_count: hop_count.incremented(),
            destination: None,
        };
        if self.enqueue_control(message, now) {
            self.stats.tcs_forwarded += 1;
        }
    }
}
