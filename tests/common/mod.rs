//! Shared fixtures for integration tests: engines on a manual clock and
//! builders for inbound control messages.

#![allow(dead_code)]

use std::sync::Arc;

use manetd::{
    AdvertisedNeighbor, AdvertisedTwoHop, Ansn, ControlPayload, HelloSnapshot, HopCount,
    InboundMessage, LinkStatus, ManualClock, MessageSeq, MsgKind, NodeId, OlsrEngine,
    ProtocolConfig, SlotId, TcSnapshot, Ttl, Willingness,
};

/// The node id used for the local engine in most scenarios.
pub const SELF_ID: u32 = 0x0A00_0001;

pub fn node(id: u32) -> NodeId {
    NodeId::new(id)
}

pub fn engine(clock: &ManualClock) -> OlsrEngine {
    engine_with(SELF_ID, Willingness::Default, None, clock)
}

pub fn engine_with(
    id: u32,
    willingness: Willingness,
    slot: Option<u32>,
    clock: &ManualClock,
) -> OlsrEngine {
    OlsrEngine::new(
        NodeId::new(id),
        willingness,
        slot.map(SlotId::new),
        ProtocolConfig::default(),
        Arc::new(clock.clone()),
    )
    .expect("default configuration is valid")
}

/// A beacon from `sender` advertising the given (id, link) records.
pub fn hello(sender: u32, seq: u16, neighbors: &[(u32, LinkStatus)]) -> InboundMessage {
    hello_full(sender, seq, Willingness::Default, None, neighbors, &[])
}

/// A beacon with full control over willingness, slot and two-hop records.
pub fn hello_full(
    sender: u32,
    seq: u16,
    willingness: Willingness,
    slot: Option<u32>,
    neighbors: &[(u32, LinkStatus)],
    two_hop: &[(u32, u32, Option<u32>)],
) -> InboundMessage {
    InboundMessage {
        kind: MsgKind::Hello,
        payload: ControlPayload::Hello(HelloSnapshot {
            hello_interval: 2,
            willingness,
            reserved_slot: slot.map(SlotId::new),
            neighbors: neighbors
                .iter()
                .map(|&(id, link)| AdvertisedNeighbor {
                    id: NodeId::new(id),
                    link,
                })
                .collect(),
            two_hop_neighbors: two_hop
                .iter()
                .map(|&(two_hop, via, slot)| AdvertisedTwoHop {
                    two_hop: NodeId::new(two_hop),
                    via: NodeId::new(via),
                    reserved_slot: slot.map(SlotId::new),
                })
                .collect(),
        }),
        sender: NodeId::new(sender),
        originator: NodeId::new(sender),
        seq: MessageSeq::new(seq),
        ttl: Ttl::one_hop(),
        hop_count: HopCount::new(0),
    }
}

/// A topology control message relayed by `sender` for `originator`.
pub fn tc(sender: u32, originator: u32, seq: u16, ansn: u16, selectors: &[u32]) -> InboundMessage {
    InboundMessage {
        kind: MsgKind::Tc,
        payload: ControlPayload::Tc(TcSnapshot {
            ansn: Ansn::new(ansn),
            mpr_selectors: selectors.iter().map(|&id| NodeId::new(id)).collect(),
        }),
        sender: NodeId::new(sender),
        originator: NodeId::new(originator),
        seq: MessageSeq::new(seq),
        ttl: Ttl::flood(),
        hop_count: HopCount::new(0),
    }
}

/// A beacon that lists the local node symmetrically, making the sender a
/// confirmed bidirectional neighbor.
pub fn sym_hello(sender: u32, seq: u16) -> InboundMessage {
    hello(sender, seq, &[(SELF_ID, LinkStatus::Symmetric)])
}

/// A beacon that names the local node as the sender's relay.
pub fn selector_hello(sender: u32, seq: u16) -> InboundMessage {
    hello(sender, seq, &[(SELF_ID, LinkStatus::MprNeighbor)])
}
