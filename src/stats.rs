//! Engine statistics
//!
//! Monotonic counters incremented as the engine works, surfaced through
//! the status API. These are the numbers an operator watches to tell a
//! healthy mesh from a sick one: beacons flowing both ways, floods being
//! suppressed rather than looping, and route recomputations tracking
//! topology churn instead of thrashing.

use serde::Serialize;

/// Monotonic event counters for one engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Beacons generated and queued.
    pub hellos_sent: u64,
    /// Beacons received and processed.
    pub hellos_received: u64,
    /// Beacons generated outside the normal interval after a link loss.
    pub emergency_hellos: u64,
    /// Topology control messages generated and queued.
    pub tcs_sent: u64,
    /// Topology control messages accepted and processed.
    pub tcs_received: u64,
    /// Topology control messages re-queued for relay flooding.
    pub tcs_forwarded: u64,
    /// Flooded messages dropped by duplicate suppression.
    pub duplicates_dropped: u64,
    /// Messages discarded before processing as malformed.
    pub invalid_messages: u64,
    /// Link updates ignored for carrying an outdated version.
    pub stale_link_updates: u64,
    /// Entries rejected because a table was at capacity.
    pub capacity_drops: u64,
    /// Snapshots discarded because the outbound queue was full.
    pub queue_overflows: u64,
    /// Queued messages dropped after exhausting their retry budget.
    pub retries_exhausted: u64,
    /// Neighbors declared lost by the timeout scan.
    pub neighbor_failures: u64,
    /// Full routing table recomputations.
    pub route_recomputations: u64,
    /// Destination-loss events pushed to the transport.
    pub link_failure_events: u64,
}
