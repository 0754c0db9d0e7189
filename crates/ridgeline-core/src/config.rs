//! Sender configuration.
//!
//! Everything here is policy, not protocol: two peers with different
//! settings still interoperate. Resolution order: explicit file →
//! defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How redundancy slice counts are chosen per coding partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedundancyPolicy {
    /// A flat quarter of the partition's original count, regardless of
    /// observed loss. The long-standing production behavior.
    #[default]
    Flat,

    /// Loss-driven tiers: more protection for lossier connections and
    /// for smaller partitions, clamped to [1, original count].
    Tiered,
}

/// Tunables for the packetization engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Redundancy sizing policy for FEC streams.
    pub redundancy: RedundancyPolicy,

    /// Messages longer than this many bytes are paced instead of
    /// dispatched immediately.
    pub big_message_threshold: usize,

    /// Packets emitted per millisecond under pacing.
    pub pace_packets_per_ms: u32,

    /// Delay before the resend loop retransmits an unacknowledged
    /// slice, milliseconds.
    pub resend_interval_ms: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            redundancy: RedundancyPolicy::Flat,
            big_message_threshold: 14_000,
            pace_packets_per_ms: 20,
            resend_interval_ms: 500,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SenderConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
