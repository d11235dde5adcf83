//! Error types for the routing engine
//!
//! Every failure here is local and recoverable: the engine drops the
//! offending entry or message, logs, and keeps running. Fresh beacons and
//! topology messages re-populate whatever state was lost.

use crate::domain::NodeId;
use thiserror::Error;

/// Errors raised by the bounded state tables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    /// The table is at capacity; the new entry was dropped.
    #[error("table full ({capacity} entries), dropped entry for {id}")]
    CapacityFull {
        /// Node the rejected entry was keyed on.
        id: NodeId,
        /// Configured capacity of the table.
        capacity: usize,
    },
}

/// Errors raised by the outbound control queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity; the message snapshot was discarded.
    #[error("control queue full ({capacity} entries)")]
    Full {
        /// Configured capacity of the queue.
        capacity: usize,
    },
}

/// Reasons an inbound message is discarded without touching any state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The message arrived with a zero hop budget.
    #[error("message from {sender} arrived with spent ttl")]
    SpentTtl {
        /// Claimed sender of the message.
        sender: NodeId,
    },

    /// The payload does not match the declared message kind.
    #[error("payload does not match declared kind from {sender}")]
    KindMismatch {
        /// Claimed sender of the message.
        sender: NodeId,
    },

    /// A node claims to have sent a message to itself.
    #[error("message claims this node ({sender}) as its sender")]
    SelfSender {
        /// The offending sender id.
        sender: NodeId,
    },

    /// Advertised record counts are implausibly large.
    #[error("message from {sender} advertises {count} records (limit {limit})")]
    ImplausibleCount {
        /// Claimed sender of the message.
        sender: NodeId,
        /// Number of advertised records.
        count: usize,
        /// Accepted upper bound.
        limit: usize,
    },
}
