//! Outbound control queue
//!
//! A bounded FIFO of generated control snapshots awaiting transport
//! pickup. Each entry owns its snapshot outright; the transport takes
//! ownership on pop and nothing ever points back into engine state.
//!
//! Messages that sit in the queue are assumed undelivered and get a
//! retransmission budget with exponential backoff. Entries are dropped
//! once the budget is spent or the message has outlived its usefulness.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::domain::Timestamp;
use crate::error::QueueError;
use crate::transport::OutboundMessage;

/// A queued message plus its delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// The owned outbound snapshot.
    pub message: OutboundMessage,
    /// When the message was generated.
    pub created_at: Timestamp,
    /// Retransmission attempts consumed so far.
    pub retry_count: u8,
    /// Next time the retry pass will touch this entry.
    pub next_retry_at: Timestamp,
}

/// Outcome of one retry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySweep {
    /// Entries whose backoff was advanced.
    pub rearmed: usize,
    /// Entries dropped for exhausting their attempt budget.
    pub dropped: usize,
}

/// Bounded FIFO of outbound control messages.
#[derive(Debug, Clone)]
pub struct ControlQueue {
    entries: VecDeque<QueuedMessage>,
    capacity: usize,
}

impl ControlQueue {
    /// Creates an empty queue with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueues a message, arming its first retry deadline.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when the queue is at capacity; the
    /// caller discards the snapshot.
    pub fn push(
        &mut self,
        message: OutboundMessage,
        now: Timestamp,
        retry_base: u64,
    ) -> Result<(), QueueError> {
        if self.entries.len() >= self.capacity {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }
        trace!(kind = ?message.kind, seq = %message.seq, "control message queued");
        self.entries.push_back(QueuedMessage {
            message,
            created_at: now,
            retry_count: 0,
            next_retry_at: now.saturating_add(retry_base),
        });
        Ok(())
    }

    /// Dequeues the oldest message, transferring ownership to the caller.
    pub fn pop(&mut self) -> Option<OutboundMessage> {
        self.entries.pop_front().map(|entry| entry.message)
    }

    /// Advances backoff on due entries and drops the ones whose attempt
    /// budget is exhausted.
    pub fn process_retries(
        &mut self,
        now: Timestamp,
        retry_base: u64,
        retry_cap: u64,
        max_attempts: u8,
    ) -> RetrySweep {
        let mut sweep = RetrySweep::default();
        self.entries.retain_mut(|entry| {
            if now < entry.next_retry_at {
                return true;
            }
            entry.retry_count += 1;
            if entry.retry_count > max_attempts {
                debug!(
                    kind = ?entry.message.kind,
                    seq = %entry.message.seq,
                    attempts = entry.retry_count,
                    "dropping undelivered control message"
                );
                sweep.dropped += 1;
                return false;
            }
            let backoff = backoff_interval(retry_base, retry_cap, entry.retry_count);
            entry.next_retry_at = now.saturating_add(backoff);
            sweep.rearmed += 1;
            true
        });
        sweep
    }

    /// Drops entries older than `lifetime`. Returns the number removed.
    pub fn cleanup_expired(&mut self, now: Timestamp, lifetime: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|entry| now.saturating_sub(entry.created_at) <= lifetime);
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!(removed, "expired control messages dropped");
        }
        removed
    }

    /// Queued entries in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedMessage> {
        self.entries.iter()
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn backoff_interval(base: u64, cap: u64, retry_count: u8) -> u64 {
    let doubled = base.saturating_mul(1u64 << u32::from(retry_count).min(16));
    doubled.min(cap)
}
