//! Advertised link database
//!
//! The mesh-wide view assembled from received topology control messages:
//! one entry per advertised (from, to) link, versioned by the originator's
//! ANSN and aged out by validity time. An update carrying an ANSN below the
//! stored one for a pair is stale information traveling a slow path and is
//! ignored.

use tracing::trace;

use crate::domain::{Ansn, NodeId, Timestamp};
use crate::error::TableError;

/// One advertised link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyLink {
    /// The advertising originator.
    pub from: NodeId,
    /// A node in the originator's advertised neighbor set.
    pub to: NodeId,
    /// Version of the originator's advertised set that produced this entry.
    pub ansn: Ansn,
    /// Engine time after which the entry is dead.
    pub valid_until: Timestamp,
}

/// What an upsert did to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkUpdate {
    /// A new link was inserted.
    Inserted,
    /// An existing link was refreshed with a current-or-newer version.
    Refreshed,
    /// The update carried an outdated version and was ignored.
    Stale,
}

/// Bounded advertised link database.
#[derive(Debug, Clone)]
pub struct TopologyTable {
    links: Vec<TopologyLink>,
    capacity: usize,
}

impl TopologyTable {
    /// Creates an empty database with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            links: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts or refreshes the (from, to) link.
    ///
    /// An existing entry is only updated when `ansn` is at least the stored
    /// version; a lower version returns [`LinkUpdate::Stale`] and leaves the
    /// entry untouched.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::CapacityFull`] when the link is new and the
    /// database has no room.
    pub fn upsert(
        &mut self,
        from: NodeId,
        to: NodeId,
        ansn: Ansn,
        valid_until: Timestamp,
    ) -> Result<LinkUpdate, TableError> {
        if let Some(link) = self
            .links
            .iter_mut()
            .find(|l| l.from == from && l.to == to)
        {
            if ansn < link.ansn {
                trace!(%from, %to, received = %ansn, stored = %link.ansn, "stale link version ignored");
                return Ok(LinkUpdate::Stale);
            }
            link.ansn = ansn;
            link.valid_until = valid_until;
            return Ok(LinkUpdate::Refreshed);
        }

        if self.links.len() >= self.capacity {
            return Err(TableError::CapacityFull {
                id: from,
                capacity: self.capacity,
            });
        }

        trace!(%from, %to, %ansn, "new advertised link");
        self.links.push(TopologyLink {
            from,
            to,
            ansn,
            valid_until,
        });
        Ok(LinkUpdate::Inserted)
    }

    /// Looks up the stored entry for a (from, to) pair, live or not.
    #[must_use]
    pub fn find(&self, from: NodeId, to: NodeId) -> Option<&TopologyLink> {
        self.links.iter().find(|l| l.from == from && l.to == to)
    }

    /// Links still valid at `now`, in insertion order.
    pub fn valid_links(&self, now: Timestamp) -> impl Iterator<Item = &TopologyLink> {
        self.links.iter().filter(move |l| l.valid_until > now)
    }

    /// Whether `id` appears as either endpoint of any live link.
    #[must_use]
    pub fn contains_node(&self, id: NodeId, now: Timestamp) -> bool {
        self.valid_links(now).any(|l| l.from == id || l.to == id)
    }

    /// Drops expired links. Returns the number removed.
    pub fn cleanup(&mut self, now: Timestamp) -> usize {
        let before = self.links.len();
        self.links.retain(|l| l.valid_until > now);
        before - self.links.len()
    }

    /// Number of stored links, live or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the database is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
