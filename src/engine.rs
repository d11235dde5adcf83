//! The protocol engine
//!
//! One owning value holds every table and counter; all processing runs on
//! the caller's thread with exclusive access. The daemon shell drives it
//! with three calls: [`OlsrEngine::tick`] at quantum granularity,
//! [`OlsrEngine::receive`] per inbound message, and
//! [`OlsrEngine::drain_outbound`] to hand generated traffic to the
//! transport. Route queries come in through [`OlsrEngine::next_hop`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::config::{ConfigError, ProtocolConfig};
use crate::control_queue::ControlQueue;
use crate::domain::{
    AnsnCounter, HopCount, LinkStatus, MessageSeq, NodeId, SeqCounter, SlotId, Timestamp, Ttl,
    Willingness,
};
use crate::error::MessageError;
use crate::mpr;
use crate::routing::{self, NextHop, RouteEntry, RoutingTable};
use crate::stats::EngineStats;
use crate::tables::{DuplicateSet, NeighborTable, SlotTable, TopologyTable, TwoHopTable};
use crate::transport::{
    ControlPayload, InboundMessage, LinkFailureEvent, MAX_ADVERTISED_RECORDS, OutboundMessage,
};

/// The per-node routing engine.
pub struct OlsrEngine {
    pub(crate) config: ProtocolConfig,
    pub(crate) clock: SharedClock,
    pub(crate) node_id: NodeId,
    pub(crate) willingness: Willingness,

    pub(crate) msg_seq: SeqCounter,
    pub(crate) ansn: AnsnCounter,

    pub(crate) neighbors: NeighborTable,
    pub(crate) two_hop: TwoHopTable,
    pub(crate) duplicates: DuplicateSet,
    pub(crate) topology: TopologyTable,
    pub(crate) slots: SlotTable,
    pub(crate) routes: RoutingTable,
    pub(crate) queue: ControlQueue,
    pub(crate) mpr_set: Vec<NodeId>,

    last_hello_at: Option<Timestamp>,
    last_tc_at: Option<Timestamp>,
    last_timeout_scan_at: Option<Timestamp>,
    last_maintenance_at: Option<Timestamp>,
    pub(crate) topology_changed: bool,

    pending_failures: Vec<LinkFailureEvent>,
    pub(crate) stats: EngineStats,
}

impl OlsrEngine {
    /// Creates an engine for the given node.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration fails validation.
    pub fn new(
        node_id: NodeId,
        willingness: Willingness,
        own_slot: Option<SlotId>,
        config: ProtocolConfig,
        clock: SharedClock,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(node = %node_id, ?willingness, "routing engine starting");
        let slot_capacity =
            config.max_neighbors.as_usize() + config.max_two_hop_neighbors.as_usize();
        Ok(Self {
            node_id,
            willingness,
            msg_seq: SeqCounter::default(),
            ansn: AnsnCounter::default(),
            neighbors: NeighborTable::new(config.max_neighbors.as_usize()),
            two_hop: TwoHopTable::new(config.max_two_hop_neighbors.as_usize()),
            duplicates: DuplicateSet::new(config.max_duplicate_entries.as_usize()),
            topology: TopologyTable::new(config.max_topology_links.as_usize()),
            slots: SlotTable::new(node_id, own_slot, slot_capacity),
            routes: RoutingTable::new(config.max_routing_entries.as_usize()),
            queue: ControlQueue::new(config.control_queue_capacity.as_usize()),
            mpr_set: Vec::new(),
            last_hello_at: None,
            last_tc_at: None,
            last_timeout_scan_at: None,
            last_maintenance_at: None,
            topology_changed: false,
            pending_failures: Vec::new(),
            stats: EngineStats::default(),
            config,
            clock,
        })
    }

    /// This node's id.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Runs one scheduler quantum: timeout scan, retry pass, periodic
    /// beacon and topology emission, maintenance sweeps, and the routing
    /// recomputation if anything marked the topology changed.
    pub fn tick(&mut self) {
        let now = self.clock.now();

        if self.take_due(Deadline::TimeoutScan, now) {
            let failed = self.scan_neighbor_timeouts(now);
            if failed > 0 {
                self.topology_changed = true;
                self.send_hello(now);
                self.stats.emergency_hellos += 1;
                self.last_hello_at = Some(now);
            }
        }

        let sweep = self.queue.process_retries(
            now,
            self.config.retry_base_interval.as_secs(),
            self.config.max_retry_interval.as_secs(),
            self.config.max_retry_attempts.as_u8(),
        );
        self.stats.retries_exhausted += sweep.dropped as u64;

        if self.take_due(Deadline::Hello, now) {
            self.send_hello(now);
        }

        if self.is_due(Deadline::Tc, now) && self.selector_count() > 0 {
            self.send_tc(now);
            self.last_tc_at = Some(now);
        }

        if self.take_due(Deadline::Maintenance, now) {
            self.run_maintenance(now);
        }

        if self.topology_changed {
            self.update_routing_table(now);
            self.topology_changed = false;
        }
    }

    /// Ingests one received control message.
    pub fn receive(&mut self, message: InboundMessage) {
        let now = self.clock.now();
        if let Err(reason) = self.validate(&message) {
            debug!(%reason, "discarding inbound message");
            self.stats.invalid_messages += 1;
            return;
        }
        match message.payload {
            ControlPayload::Hello(hello) => self.apply_hello(&hello, message.sender, now),
            ControlPayload::Tc(tc) => self.apply_tc(
                &tc,
                message.sender,
                message.originator,
                message.seq,
                message.ttl,
                message.hop_count,
                now,
            ),
        }
    }

    /// Hands the oldest queued control message to the caller.
    pub fn drain_outbound(&mut self) -> Option<OutboundMessage> {
        self.queue.pop()
    }

    /// Takes the destination-loss events accumulated since the last call.
    pub fn take_link_failures(&mut self) -> Vec<LinkFailureEvent> {
        std::mem::take(&mut self.pending_failures)
    }

    /// Resolves the forwarding decision for `dest`.
    ///
    /// A planned next hop that has gone silent, or a known destination
    /// with no computed route, triggers an immediate recomputation; only
    /// if that still yields nothing is the destination declared
    /// unreachable and a loss event queued for the transport.
    pub fn next_hop(&mut self, dest: NodeId) -> NextHop {
        let now = self.clock.now();
        if dest == self.node_id {
            return NextHop::Local;
        }

        let Some(entry) = self.routes.lookup(dest).copied() else {
            if !self.knows_destination(dest, now) {
                return NextHop::NoRoute;
            }
            // Known destination without a computed route: recompute before
            // concluding anything, then either route or declare it lost.
            self.update_routing_table(now);
            if let Some(fresh) = self.routes.lookup(dest).copied()
                && self.neighbor_is_live(fresh.next_hop, now)
            {
                return NextHop::Route {
                    next_hop: fresh.next_hop,
                    metric: fresh.metric,
                    hops: fresh.hops,
                };
            }
            self.report_unreachable(dest, None);
            return NextHop::Unreachable;
        };

        if self.neighbor_is_live(entry.next_hop, now) {
            return NextHop::Route {
                next_hop: entry.next_hop,
                metric: entry.metric,
                hops: entry.hops,
            };
        }

        // The planned relay is gone; reroute before giving up.
        debug!(dest = %dest, dead_hop = %entry.next_hop, "next hop dead, rerouting");
        self.routes.invalidate(dest);
        if !self.knows_destination(dest, now) {
            self.report_unreachable(dest, Some(entry.next_hop));
            return NextHop::Unreachable;
        }
        self.update_routing_table(now);
        if let Some(fresh) = self.routes.lookup(dest).copied()
            && self.neighbor_is_live(fresh.next_hop, now)
        {
            return NextHop::Route {
                next_hop: fresh.next_hop,
                metric: fresh.metric,
                hops: fresh.hops,
            };
        }

        self.report_unreachable(dest, Some(entry.next_hop));
        NextHop::Unreachable
    }

    /// Changes the TDMA slot this node announces, or withdraws it with
    /// `None`.
    ///
    /// The medium-access layer picks a slot it found free via
    /// [`SlotTable::is_slot_available`] and registers it here; the next
    /// beacon carries the new reservation and peers age the old one out.
    pub fn set_reserved_slot(&mut self, slot: Option<SlotId>) {
        info!(slot = ?slot, "announced slot reservation changed");
        self.slots.set_own_slot(slot);
    }

    /// Engine counters.
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Read access to the one-hop neighbor table.
    #[must_use]
    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    /// Read access to the two-hop table.
    #[must_use]
    pub fn two_hop(&self) -> &TwoHopTable {
        &self.two_hop
    }

    /// Read access to the advertised link database.
    #[must_use]
    pub fn topology(&self) -> &TopologyTable {
        &self.topology
    }

    /// Read access to the routing table.
    #[must_use]
    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Read access to the TDMA reservation table.
    #[must_use]
    pub fn slot_table(&self) -> &SlotTable {
        &self.slots
    }

    /// Read access to the outbound queue.
    #[must_use]
    pub fn control_queue(&self) -> &ControlQueue {
        &self.queue
    }

    /// The current relay set.
    #[must_use]
    pub fn mpr_set(&self) -> &[NodeId] {
        &self.mpr_set
    }

    /// Builds a point-in-time view of the whole engine for the status API.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        let now = self.clock.now();
        StatusSnapshot {
            node: self.node_id,
            willingness: self.willingness,
            reserved_slot: self.slots.own_slot(),
            now,
            neighbors: self
                .neighbors
                .iter()
                .map(|n| NeighborView {
                    id: n.id,
                    link: n.link,
                    willingness: n.willingness,
                    is_mpr: n.is_mpr,
                    is_mpr_selector: n.is_mpr_selector,
                    silence_secs: now.saturating_sub(n.last_heard),
                })
                .collect(),
            two_hop: self
                .two_hop
                .iter()
                .map(|t| TwoHopView {
                    two_hop: t.two_hop,
                    via: t.via,
                    age_secs: now.saturating_sub(t.last_seen),
                })
                .collect(),
            mpr_set: self.mpr_set.clone(),
            mpr_selectors: self
                .neighbors
                .iter()
                .filter(|n| n.is_mpr_selector)
                .map(|n| n.id)
                .collect(),
            topology: self
                .topology
                .valid_links(now)
                .map(|l| TopologyView {
                    from: l.from,
                    to: l.to,
                    ansn: u16::from(l.ansn),
                    expires_in_secs: l.valid_until.saturating_sub(now),
                })
                .collect(),
            routes: self.routes.iter().copied().collect(),
            occupied_slots: self.slots.occupied_slots(),
            queue_depth: self.queue.len(),
            stats: self.stats,
        }
    }

    // ---- internals ----------------------------------------------------

    pub(crate) fn enqueue_control(&mut self, message: OutboundMessage, now: Timestamp) -> bool {
        match self
            .queue
            .push(message, now, self.config.retry_base_interval.as_secs())
        {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "outbound control message discarded");
                self.stats.queue_overflows += 1;
                false
            }
        }
    }

    pub(crate) fn next_seq(&mut self) -> MessageSeq {
        self.msg_seq.next()
    }

    pub(crate) fn update_routing_table(&mut self, now: Timestamp) {
        let edges = routing::build_graph(
            self.node_id,
            &self.neighbors,
            &self.two_hop,
            &self.topology,
            now,
        );
        let entries =
            routing::compute_routes(self.node_id, &edges, self.config.max_nodes.as_usize(), now);
        debug!(
            destinations = entries.len(),
            edges = edges.len(),
            "routing table rebuilt"
        );
        self.routes.replace(entries);
        self.stats.route_recomputations += 1;
    }

    pub(crate) fn recompute_mpr_set(&mut self) {
        let selection = mpr::recompute(&mut self.neighbors, &self.two_hop);
        if !selection.uncovered.is_empty() {
            debug!(
                uncovered = selection.uncovered.len(),
                "relay selection left two-hop nodes uncovered"
            );
        }
        self.mpr_set = selection.selected;
    }

    pub(crate) fn selector_count(&self) -> usize {
        self.neighbors
            .iter()
            .filter(|n| n.is_mpr_selector && n.is_symmetric())
            .count()
    }

    fn neighbor_is_live(&self, id: NodeId, now: Timestamp) -> bool {
        self.neighbors.find(id).is_some_and(|n| {
            n.is_symmetric()
                && now.saturating_sub(n.last_heard) < self.config.neighbor_hold_time.as_secs()
        })
    }

    fn knows_destination(&self, dest: NodeId, now: Timestamp) -> bool {
        self.neighbors.contains(dest)
            || self.topology.contains_node(dest, now)
            || self.two_hop.vias_for(dest).first().is_some()
    }

    fn report_unreachable(&mut self, dest: NodeId, failed_next_hop: Option<NodeId>) {
        warn!(dest = %dest, ?failed_next_hop, "destination unreachable");
        self.stats.link_failure_events += 1;
        self.pending_failures.push(LinkFailureEvent {
            dest,
            failed_next_hop,
        });
    }

    fn scan_neighbor_timeouts(&mut self, now: Timestamp) -> usize {
        let hold = self.config.neighbor_hold_time.as_secs();
        let expired = self.neighbors.expired_ids(now, hold);
        for &id in &expired {
            warn!(neighbor = %id, silence = hold, "neighbor lost");
            self.neighbors.remove(id);
            self.two_hop.remove_via(id);
            self.slots.remove(id);
        }
        if !expired.is_empty() {
            self.stats.neighbor_failures += expired.len() as u64;
            self.recompute_mpr_set();
        }
        expired.len()
    }

    fn run_maintenance(&mut self, now: Timestamp) {
        self.queue
            .cleanup_expired(now, self.config.queue_lifetime.as_secs());
        self.duplicates
            .cleanup(now, self.config.duplicate_hold_time.as_secs());
        let dead_links = self.topology.cleanup(now);
        let dead_two_hop = self
            .two_hop
            .cleanup_expired(now, self.config.neighbor_hold_time.as_secs());
        self.slots
            .cleanup_expired(now, self.config.slot_reservation_timeout.as_secs());
        if dead_links > 0 || dead_two_hop > 0 {
            debug!(dead_links, dead_two_hop, "maintenance expired stale state");
            self.topology_changed = true;
        }
        if dead_two_hop > 0 {
            self.recompute_mpr_set();
        }
    }

    fn validate(&self, message: &InboundMessage) -> Result<(), MessageError> {
        if message.sender == self.node_id {
            return Err(MessageError::SelfSender {
                sender: message.sender,
            });
        }
        if message.ttl.is_spent() {
            return Err(MessageError::SpentTtl {
                sender: message.sender,
            });
        }
        if message.payload.kind() != message.kind {
            return Err(MessageError::KindMismatch {
                sender: message.sender,
            });
        }
        let advertised = match &message.payload {
            ControlPayload::Hello(hello) => {
                hello.neighbors.len().max(hello.two_hop_neighbors.len())
            }
            ControlPayload::Tc(tc) => tc.mpr_selectors.len(),
        };
        if advertised > MAX_ADVERTISED_RECORDS {
            return Err(MessageError::ImplausibleCount {
                sender: message.sender,
                count: advertised,
                limit: MAX_ADVERTISED_RECORDS,
            });
        }
        Ok(())
    }

    fn is_due(&self, deadline: Deadline, now: Timestamp) -> bool {
        let (last, interval) = match deadline {
            Deadline::Hello => (self.last_hello_at, self.config.hello_interval.as_secs()),
            Deadline::Tc => (self.last_tc_at, self.config.tc_interval.as_secs()),
            Deadline::TimeoutScan => (
                self.last_timeout_scan_at,
                self.config.timeout_scan_interval.as_secs(),
            ),
            Deadline::Maintenance => (
                self.last_maintenance_at,
                self.config.maintenance_interval.as_secs(),
            ),
        };
        last.is_none_or(|at| now.saturating_sub(at) >= interval)
    }

    fn take_due(&mut self, deadline: Deadline, now: Timestamp) -> bool {
        if !self.is_due(deadline, now) {
            return false;
        }
        match deadline {
            Deadline::Hello => self.last_hello_at = Some(now),
            Deadline::Tc => self.last_tc_at = Some(now),
            Deadline::TimeoutScan => self.last_timeout_scan_at = Some(now),
            Deadline::Maintenance => self.last_maintenance_at = Some(now),
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
enum Deadline {
    Hello,
    Tc,
    TimeoutScan,
    Maintenance,
}

/// Point-in-time view of the engine for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// This node's id.
    pub node: NodeId,
    /// This node's willingness.
    pub willingness: Willingness,
    /// This node's announced TDMA slot.
    pub reserved_slot: Option<SlotId>,
    /// Engine time the snapshot was taken.
    pub now: Timestamp,
    /// One-hop neighborhood.
    pub neighbors: Vec<NeighborView>,
    /// Two-hop associations.
    pub two_hop: Vec<TwoHopView>,
    /// Currently selected relays.
    pub mpr_set: Vec<NodeId>,
    /// Neighbors that selected this node as their relay.
    pub mpr_selectors: Vec<NodeId>,
    /// Live advertised links.
    pub topology: Vec<TopologyView>,
    /// Computed routes.
    pub routes: Vec<RouteEntry>,
    /// Occupied TDMA slots within two hops.
    pub occupied_slots: Vec<SlotId>,
    /// Outbound queue depth.
    pub queue_depth: usize,
    /// Engine counters.
    pub stats: EngineStats,
}

/// One neighbor as seen by the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborView {
    /// Neighbor id.
    pub id: NodeId,
    /// Sensed link state.
    pub link: LinkStatus,
    /// Advertised willingness.
    pub willingness: Willingness,
    /// Whether this node relays through it.
    pub is_mpr: bool,
    /// Whether it relays through this node.
    pub is_mpr_selector: bool,
    /// Seconds since its last beacon.
    pub silence_secs: u64,
}

/// One two-hop association as seen by the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct TwoHopView {
    /// The node two hops out.
    pub two_hop: NodeId,
    /// The neighbor advertising it.
    pub via: NodeId,
    /// Seconds since it was last advertised.
    pub age_secs: u64,
}

/// One advertised link as seen by the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct TopologyView {
    /// Advertising originator.
    pub from: NodeId,
    /// Advertised neighbor.
    pub to: NodeId,
    /// Version of the advertisement.
    pub ansn: u16,
    /// Seconds of validity remaining.
    pub expires_in_secs: u64,
}

/// Builds a neighborhood broadcast with fresh hop bookkeeping.
pub(crate) fn broadcast(
    payload: ControlPayload,
    originator: NodeId,
    seq: MessageSeq,
    ttl: Ttl,
) -> OutboundMessage {
    OutboundMessage {
        kind: payload.kind(),
        payload,
        originator,
        seq,
        ttl,
        hop_count: HopCount::new(0),
        destination: None,
    }
}
