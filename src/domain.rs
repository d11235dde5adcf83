//! Domain types for the routing engine
//!
//! Strongly-typed protocol scalars so that node ids, sequence numbers and
//! hop counts cannot be mixed up at call sites. Where the original wire
//! encoding uses integer sentinels (a slot of `-1`, a willingness byte),
//! these are lifted into enums and `Option` here; the transport layer owns
//! whatever bytes end up on the air.

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Monotonic engine time in whole seconds.
///
/// The engine never reads the wall clock; everything is measured against a
/// single monotonic origin provided by [`crate::clock::Clock`].
pub type Timestamp = u64;

/// Opaque identifier of a node in the mesh.
///
/// Historically an IPv4 address, but the engine treats it purely as a unique
/// 32-bit key.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct NodeId(u32);

/// Per-node message sequence number carried on every control message.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct MessageSeq(u16);

/// Advertised Neighbor Sequence Number on topology control messages.
///
/// Compared with plain `>=` when deciding whether a topology update is
/// fresh; the originator bumps it on every generation.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct Ansn(u16);

/// Remaining hop budget of a control message.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct Ttl(u8);

impl Ttl {
    /// TTL for single-hop beacons.
    #[must_use]
    pub fn one_hop() -> Self {
        Self::new(1)
    }

    /// TTL for network-flooded messages.
    #[must_use]
    pub fn flood() -> Self {
        Self::new(u8::MAX)
    }

    /// One less hop of budget, saturating at zero.
    #[must_use]
    pub fn decremented(self) -> Self {
        Self::new(self.into_inner().saturating_sub(1))
    }

    /// Whether the message may still be relayed after this hop.
    #[must_use]
    pub fn allows_forwarding(self) -> bool {
        self.into_inner() > 1
    }

    /// A message arriving with no hop budget at all is malformed.
    #[must_use]
    pub fn is_spent(self) -> bool {
        self.into_inner() == 0
    }
}

/// Number of hops a message has already traveled.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct HopCount(u8);

impl HopCount {
    /// One more hop traveled, saturating.
    #[must_use]
    pub fn incremented(self) -> Self {
        Self::new(self.into_inner().saturating_add(1))
    }
}

/// TDMA slot index reserved by a node.
///
/// The absence of a reservation is `Option::None` rather than the `-1`
/// sentinel the original encoding used.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct SlotId(u32);

impl SlotId {
    /// Decodes the transport's signed slot field; negative means no slot.
    #[must_use]
    pub fn from_wire(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self::new)
    }

    /// Encodes an optional reservation back into the signed wire field.
    #[must_use]
    pub fn to_wire(slot: Option<Self>) -> i32 {
        slot.map_or(-1, |s| i32::try_from(s.into_inner()).unwrap_or(i32::MAX))
    }
}

/// A node's declared readiness to relay traffic for others.
///
/// Ordered: a higher willingness wins ties during relay selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Willingness {
    /// Never selected as a relay.
    Never,
    /// Selected only when nothing better covers a two-hop neighbor.
    Low,
    /// The normal case.
    #[default]
    Default,
    /// Preferred over default-willingness candidates.
    High,
    /// Unconditionally selected as a relay.
    Always,
}

impl Willingness {
    /// The protocol byte for this willingness level.
    #[must_use]
    pub fn value(self) -> u8 {
        match self {
            Self::Never => 0,
            Self::Low => 1,
            Self::Default => 3,
            Self::High => 6,
            Self::Always => 7,
        }
    }

    /// Maps an arbitrary protocol byte onto the nearest named level.
    ///
    /// Values above 7 are clamped to `Always`; the unnamed intermediate
    /// values collapse onto the level just below them.
    #[must_use]
    pub fn from_value(raw: u8) -> Self {
        match raw {
            0 => Self::Never,
            1 | 2 => Self::Low,
            3..=5 => Self::Default,
            6 => Self::High,
            _ => Self::Always,
        }
    }
}

/// State of the link to a one-hop neighbor, as sensed from beacon exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Nothing is known about the link yet.
    Unspecified,
    /// We hear the neighbor but it has not yet confirmed hearing us.
    Asymmetric,
    /// Both directions confirmed.
    Symmetric,
    /// The link existed and has since been declared down.
    Lost,
    /// Symmetric link to a neighbor we have selected as a relay; only ever
    /// used in advertised neighbor records, never stored in the table.
    MprNeighbor,
}

impl LinkStatus {
    /// The protocol link code byte.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::Asymmetric => 1,
            Self::Symmetric => 2,
            Self::Lost => 3,
            Self::MprNeighbor => 4,
        }
    }

    /// Decodes a protocol link code; unknown codes read as `Unspecified`.
    #[must_use]
    pub fn from_code(raw: u8) -> Self {
        match raw {
            1 => Self::Asymmetric,
            2 => Self::Symmetric,
            3 => Self::Lost,
            4 => Self::MprNeighbor,
            _ => Self::Unspecified,
        }
    }

    /// Whether an advertised record with this status counts as a confirmed
    /// bidirectional link on the advertising side.
    #[must_use]
    pub fn is_symmetric(self) -> bool {
        matches!(self, Self::Symmetric | Self::MprNeighbor)
    }
}

/// Hop distance at which a TDMA reservation was learned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HopDistance {
    /// Learned directly from the reserving neighbor's beacon.
    OneHop,
    /// Relayed inside a neighbor's two-hop advertisement.
    TwoHop,
}

/// Wrapping per-node counter used for message sequence numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeqCounter(u16);

impl SeqCounter {
    /// Returns the next sequence number, wrapping at `u16::MAX`.
    pub fn next(&mut self) -> MessageSeq {
        self.0 = self.0.wrapping_add(1);
        MessageSeq::new(self.0)
    }
}

/// Wrapping per-node counter for advertised neighbor set versions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsnCounter(u16);

impl AnsnCounter {
    /// Returns the next version number, wrapping at `u16::MAX`.
    pub fn next(&mut self) -> Ansn {
        self.0 = self.0.wrapping_add(1);
        Ansn::new(self.0)
    }
}
