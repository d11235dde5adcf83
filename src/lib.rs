//! # manetd — proactive mesh routing for mobile ad-hoc networks
//!
//! `manetd` implements the Optimized Link State Routing protocol: each
//! node senses its one- and two-hop neighborhood through periodic beacons,
//! selects a minimal multipoint relay set to cover the two-hop
//! neighborhood, floods reduced-overhead topology advertisements through
//! those relays, and keeps a shortest-path routing table that a radio
//! link layer consumes for data forwarding. A TDMA slot-reservation
//! sub-protocol rides along on the beacons.
//!
//! The crate splits into a synchronous, single-owner protocol engine
//! ([`OlsrEngine`]) and an async shell ([`Daemon`]) that gives it a
//! heartbeat and wires it to a [`Transport`]. The engine performs no I/O;
//! wire encoding and the radio itself are the transport's problem.
//!
//! ```no_run
//! use manetd::{
//!     Daemon, NodeId, OlsrEngine, ProtocolConfig, Willingness, channel_transport,
//!     monotonic_clock,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = OlsrEngine::new(
//!     NodeId::new(0x0A00_0001),
//!     Willingness::Default,
//!     None,
//!     ProtocolConfig::default(),
//!     monotonic_clock(),
//! )?;
//! let (transport, mut radio) = channel_transport(64);
//! let (daemon, handle) = Daemon::new(engine, transport);
//! tokio::spawn(daemon.run());
//!
//! // The radio side drains beacons and injects received messages.
//! let beacon = radio.outbound.recv().await;
//! # let _ = beacon;
//! handle.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod control_queue;
pub mod daemon;
pub mod domain;
pub mod engine;
pub mod error;
pub mod hello;
pub mod mpr;
pub mod routing;
pub mod stats;
pub mod tables;
pub mod tc;
pub mod transport;

pub use clock::{Clock, ManualClock, MonotonicClock, SharedClock, monotonic_clock};
pub use config::{ApiSettings, ConfigError, DaemonConfig, NodeSettings, ProtocolConfig};
pub use daemon::{Daemon, DaemonHandle};
pub use domain::{
    Ansn, HopCount, HopDistance, LinkStatus, MessageSeq, NodeId, SlotId, Timestamp, Ttl,
    Willingness,
};
pub use engine::{NeighborView, OlsrEngine, StatusSnapshot, TopologyView, TwoHopView};
pub use error::{MessageError, QueueError, TableError};
pub use hello::{AdvertisedNeighbor, AdvertisedTwoHop, HelloSnapshot};
pub use routing::{NextHop, RouteEntry};
pub use stats::EngineStats;
pub use tc::TcSnapshot;
pub use transport::{
    ChannelTransport, ControlPayload, InboundMessage, LinkFailureEvent, MsgKind, OutboundMessage,
    Transport, TransportError, TransportHarness, channel_transport,
};
