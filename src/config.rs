//! Engine and daemon configuration
//!
//! All protocol timers and table capacities live here. The defaults are the
//! protocol's recommended values; deployments override them from a TOML
//! file or the command line. Validation catches the cross-field mistakes
//! that would silently break the protocol (a duplicate cache that forgets
//! messages faster than they can still be flooded, a neighbor hold time
//! shorter than the beacon interval).

use std::path::Path;
use std::time::Duration;

use nutype::nutype;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{SlotId, Willingness};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field or combination of fields fails validation.
    #[error("invalid configuration: {field} - {reason}")]
    Validation {
        /// The offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("cannot read configuration file: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("cannot parse configuration file: {source}")]
    Parse {
        /// Underlying TOML error.
        #[from]
        source: toml::de::Error,
    },
}

/// A protocol timer in whole seconds.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 86_400),
    derive(
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
        TryFrom,
        Into
    )
)]
pub struct IntervalSecs(u64);

impl IntervalSecs {
    /// The raw number of seconds.
    #[must_use]
    pub fn as_secs(&self) -> u64 {
        self.into_inner()
    }

    /// As a `Duration` for the shell's timers.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.into_inner())
    }
}

/// A bounded table or queue capacity.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 4096),
    derive(
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
        TryFrom,
        Into
    )
)]
pub struct Capacity(usize);

impl Capacity {
    /// The raw capacity.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Retransmission attempt budget before a queued message is dropped.
#[nutype(
    validate(less_or_equal = 10),
    derive(
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
        TryFrom,
        Into
    )
)]
pub struct RetryAttempts(u8);

impl RetryAttempts {
    /// The raw attempt count.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.into_inner()
    }
}

/// The shell's scheduling quantum in milliseconds.
#[nutype(
    validate(greater_or_equal = 10, less_or_equal = 5_000),
    derive(
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
        TryFrom,
        Into
    )
)]
pub struct QuantumMillis(u64);

impl QuantumMillis {
    /// As a `Duration` for the shell's interval timer.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.into_inner())
    }
}

/// Protocol timers and capacities for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Beacon emission period.
    pub hello_interval: IntervalSecs,
    /// Neighbor silence beyond this declares the link lost.
    pub neighbor_hold_time: IntervalSecs,
    /// Topology control emission period.
    pub tc_interval: IntervalSecs,
    /// How long receivers treat advertised topology as live.
    pub tc_validity_time: IntervalSecs,
    /// Retention of (originator, sequence) pairs for flood suppression.
    pub duplicate_hold_time: IntervalSecs,
    /// Silence beyond which a TDMA reservation is forgotten.
    pub slot_reservation_timeout: IntervalSecs,
    /// First retransmission backoff step.
    pub retry_base_interval: IntervalSecs,
    /// Retransmission backoff ceiling.
    pub max_retry_interval: IntervalSecs,
    /// Retransmission attempts before a queued message is dropped.
    pub max_retry_attempts: RetryAttempts,
    /// Queued messages older than this are dropped outright.
    pub queue_lifetime: IntervalSecs,
    /// Period of the neighbor timeout scan.
    pub timeout_scan_interval: IntervalSecs,
    /// Period of the global expiry sweep over queue, duplicates and topology.
    pub maintenance_interval: IntervalSecs,
    /// One-hop neighbor table capacity.
    pub max_neighbors: Capacity,
    /// Two-hop association table capacity.
    pub max_two_hop_neighbors: Capacity,
    /// Advertised link database capacity.
    pub max_topology_links: Capacity,
    /// Routing table capacity.
    pub max_routing_entries: Capacity,
    /// Upper bound on nodes considered by route computation.
    pub max_nodes: Capacity,
    /// Duplicate cache capacity.
    pub max_duplicate_entries: Capacity,
    /// Outbound control queue capacity.
    pub control_queue_capacity: Capacity,
    /// Shell scheduling quantum.
    pub quantum: QuantumMillis,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            hello_interval: IntervalSecs::try_new(2).unwrap(),
            neighbor_hold_time: IntervalSecs::try_new(6).unwrap(),
            tc_interval: IntervalSecs::try_new(5).unwrap(),
            tc_validity_time: IntervalSecs::try_new(15).unwrap(),
            duplicate_hold_time: IntervalSecs::try_new(15).unwrap(),
            slot_reservation_timeout: IntervalSecs::try_new(30).unwrap(),
            retry_base_interval: IntervalSecs::try_new(2).unwrap(),
            max_retry_interval: IntervalSecs::try_new(16).unwrap(),
            max_retry_attempts: RetryAttempts::try_new(3).unwrap(),
            queue_lifetime: IntervalSecs::try_new(60).unwrap(),
            timeout_scan_interval: IntervalSecs::try_new(1).unwrap(),
            maintenance_interval: IntervalSecs::try_new(30).unwrap(),
            max_neighbors: Capacity::try_new(40).unwrap(),
            max_two_hop_neighbors: Capacity::try_new(100).unwrap(),
            max_topology_links: Capacity::try_new(200).unwrap(),
            max_routing_entries: Capacity::try_new(100).unwrap(),
            max_nodes: Capacity::try_new(50).unwrap(),
            max_duplicate_entries: Capacity::try_new(64).unwrap(),
            control_queue_capacity: Capacity::try_new(32).unwrap(),
            quantum: QuantumMillis::try_new(100).unwrap(),
        }
    }
}

impl ProtocolConfig {
    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Validation`] naming the first inconsistent
    /// field combination found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neighbor_hold_time < self.hello_interval {
            return Err(ConfigError::Validation {
                field: "neighbor_hold_time".to_string(),
                reason: format!(
                    "must be at least hello_interval ({}s); neighbors would expire \
                     between beacons",
                    self.hello_interval
                ),
            });
        }
        if self.duplicate_hold_time < self.tc_validity_time {
            return Err(ConfigError::Validation {
                field: "duplicate_hold_time".to_string(),
                reason: format!(
                    "must be at least tc_validity_time ({}s); re-flooded messages \
                     would be re-processed while still valid",
                    self.tc_validity_time
                ),
            });
        }
        if self.max_retry_interval < self.retry_base_interval {
            return Err(ConfigError::Validation {
                field: "max_retry_interval".to_string(),
                reason: format!(
                    "backoff ceiling is below its base ({}s)",
                    self.retry_base_interval
                ),
            });
        }
        Ok(())
    }
}

/// Identity of the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSettings {
    /// This node's id. Must be unique in the mesh.
    pub id: u32,
    /// Declared readiness to relay for others.
    #[serde(default)]
    pub willingness: Willingness,
    /// TDMA slot this node announces, if any.
    #[serde(default)]
    pub tdma_slot: Option<u32>,
}

impl NodeSettings {
    /// The announced slot as a typed reservation.
    #[must_use]
    pub fn slot(&self) -> Option<SlotId> {
        self.tdma_slot.map(SlotId::new)
    }
}

/// Read-only status API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSettings {
    /// Bind address, e.g. `127.0.0.1:8282`. Disabled when absent.
    pub bind: Option<String>,
}

/// Full daemon configuration as loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Local node identity.
    pub node: NodeSettings,
    /// Status API settings.
    #[serde(default)]
    pub api: ApiSettings,
    /// Protocol timers and capacities.
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

impl DaemonConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read, parsed, or
    /// fails [`ProtocolConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.protocol.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ProtocolConfig::default().validate().is_ok());
    }

    #[test]
    fn defaults_match_recommended_timers() {
        let config = ProtocolConfig::default();
        assert_eq!(config.hello_interval.as_secs(), 2);
        assert_eq!(config.neighbor_hold_time.as_secs(), 6);
        assert_eq!(config.tc_interval.as_secs(), 5);
        assert_eq!(config.tc_validity_time.as_secs(), 15);
        assert_eq!(config.max_neighbors.as_usize(), 40);
        assert_eq!(config.max_two_hop_neighbors.as_usize(), 100);
        assert_eq!(config.max_nodes.as_usize(), 50);
    }

    #[test]
    fn hold_time_below_beacon_interval_rejected() {
        let config = ProtocolConfig {
            hello_interval: IntervalSecs::try_new(10).unwrap(),
            neighbor_hold_time: IntervalSecs::try_new(6).unwrap(),
            ..ProtocolConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { field, .. }) if field == "neighbor_hold_time"
        ));
    }

    #[test]
    fn duplicate_retention_must_cover_tc_validity() {
        let config = ProtocolConfig {
            duplicate_hold_time: IntervalSecs::try_new(5).unwrap(),
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn daemon_config_round_trips_through_toml() {
        let config = DaemonConfig {
            node: NodeSettings {
                id: 0x0A00_0001,
                willingness: Willingness::High,
                tdma_slot: Some(4),
            },
            api: ApiSettings {
                bind: Some("127.0.0.1:8282".to_string()),
            },
            protocol: ProtocolConfig::default(),
        };
        let raw = toml::to_string(&config).unwrap();
        let parsed: DaemonConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let parsed: DaemonConfig = toml::from_str("[node]\nid = 7\n").unwrap();
        assert_eq!(parsed.node.id, 7);
        assert_eq!(parsed.node.willingness, Willingness::Default);
        assert_eq!(parsed.protocol, ProtocolConfig::default());
        assert!(parsed.api.bind.is_none());
    }

    #[test]
    fn load_rejects_inconsistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manetd.toml");
        std::fs::write(
            &path,
            "[node]\nid = 7\n\n[protocol]\nhello_interval = 10\nneighbor_hold_time = 6\n",
        )
        .unwrap();
        assert!(matches!(
            DaemonConfig::load(&path),
            Err(ConfigError::Validation { .. })
        ));

        std::fs::write(&path, "[node]\nid = 7\ntdma_slot = 2\n").unwrap();
        let loaded = DaemonConfig::load(&path).unwrap();
        assert_eq!(loaded.node.slot(), Some(SlotId::new(2)));
    }
}
