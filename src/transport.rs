//! Transport boundary
//!
//! The engine performs no I/O of its own. It exchanges structured records
//! with a transport implementation: beacons and topology messages go out,
//! received messages come in, and destination-loss events are pushed out
//! when routing gives up on a node. Wire encoding, framing and the radio
//! itself all live on the far side of this seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::{HopCount, MessageSeq, NodeId, Ttl};
use crate::hello::HelloSnapshot;
use crate::tc::TcSnapshot;

/// Upper bound on advertised records accepted in one message. Anything
/// larger is treated as garbage rather than state.
pub const MAX_ADVERTISED_RECORDS: usize = 256;

/// Control message kinds exchanged with the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgKind {
    /// Single-hop neighborhood beacon.
    Hello,
    /// Network-flooded topology control message.
    Tc,
}

/// The structured payload of a control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPayload {
    /// Beacon snapshot.
    Hello(HelloSnapshot),
    /// Topology control snapshot.
    Tc(TcSnapshot),
}

impl ControlPayload {
    /// The message kind this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> MsgKind {
        match self {
            Self::Hello(_) => MsgKind::Hello,
            Self::Tc(_) => MsgKind::Tc,
        }
    }
}

/// A control message handed up from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Declared message kind.
    pub kind: MsgKind,
    /// Structured payload.
    pub payload: ControlPayload,
    /// The neighbor the frame physically arrived from.
    pub sender: NodeId,
    /// The node that originated the message, hops ago for flooded traffic.
    pub originator: NodeId,
    /// The originator's sequence number.
    pub seq: MessageSeq,
    /// Remaining hop budget.
    pub ttl: Ttl,
    /// Hops already traveled.
    pub hop_count: HopCount,
}

/// A control message handed down to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Message kind.
    pub kind: MsgKind,
    /// Structured payload; the queue owns this snapshot outright.
    pub payload: ControlPayload,
    /// Originating node (not necessarily this one, for forwarded traffic).
    pub originator: NodeId,
    /// The originator's sequence number.
    pub seq: MessageSeq,
    /// Remaining hop budget.
    pub ttl: Ttl,
    /// Hops already traveled.
    pub hop_count: HopCount,
    /// Unicast destination; `None` broadcasts to the neighborhood.
    pub destination: Option<NodeId>,
}

/// Pushed to the transport when routing concludes a destination is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkFailureEvent {
    /// The unreachable destination.
    pub dest: NodeId,
    /// The next hop that stopped answering, when the loss was a dead relay
    /// rather than the destination vanishing from the topology.
    pub failed_next_hop: Option<NodeId>,
}

/// Transport-side failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer end of the transport is gone.
    #[error("transport channel closed")]
    Closed,
}

/// The radio-facing half of the boundary, driven by the daemon shell.
#[async_trait]
pub trait Transport: Send {
    /// Hands one outbound control message to the radio side.
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError>;

    /// Waits for the next inbound control message. `None` means the inbound
    /// side has shut down for good.
    async fn recv(&mut self) -> Option<InboundMessage>;

    /// Reports a destination loss to the radio side.
    async fn notify_link_failure(&mut self, event: LinkFailureEvent)
    -> Result<(), TransportError>;
}

/// In-process transport over tokio channels.
///
/// The daemon shell holds the [`ChannelTransport`]; tests and the demo
/// binary hold the matching [`TransportHarness`] and play the radio.
#[derive(Debug)]
pub struct ChannelTransport {
    inbound: mpsc::Receiver<InboundMessage>,
    outbound: mpsc::Sender<OutboundMessage>,
    events: mpsc::Sender<LinkFailureEvent>,
}

/// The far (radio) side of a [`ChannelTransport`].
#[derive(Debug)]
pub struct TransportHarness {
    /// Inject received control messages here.
    pub inbound: mpsc::Sender<InboundMessage>,
    /// Outbound control messages appear here.
    pub outbound: mpsc::Receiver<OutboundMessage>,
    /// Destination-loss events appear here.
    pub events: mpsc::Receiver<LinkFailureEvent>,
}

/// Creates a connected transport pair with the given channel capacity.
#[must_use]
pub fn channel_transport(capacity: usize) -> (ChannelTransport, TransportHarness) {
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    let (events_tx, events_rx) = mpsc::channel(capacity);
    (
        ChannelTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
            events: events_tx,
        },
        TransportHarness {
            inbound: inbound_tx,
            outbound: outbound_rx,
            events: events_rx,
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<InboundMessage> {
        self.inbound.recv().await
    }

    async fn notify_link_failure(
        &mut self,
        event: LinkFailureEvent,
    ) -> Result<(), TransportError> {
        self.events
            .send(event)
            .await
            .map_err(|_| TransportError::Closed)
    }
}
