// SPDX-License-Identifier: MIT

//! Dispatcher configuration.
//!
//! The coordination core itself has no configuration surface; these
//! knobs only shape how the external dispatch loop behaves.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Tuning for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Idle delay between polls when nothing was dispatched.
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    /// How long a dispatched step generation is shielded from
    /// re-dispatch while its completion is in flight.
    #[serde(with = "duration_ms")]
    pub dedup_window: Duration,
    /// Annotate `dispatched:{stepId}` on the goal before running the
    /// agent (observability marker).
    pub announce_dispatch: bool,
    /// Concurrency limit per work kind unless overridden.
    pub default_concurrency: usize,
    /// Per-kind concurrency overrides.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub kind_concurrency: HashMap<String, usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            dedup_window: Duration::from_secs(300),
            announce_dispatch: false,
            default_concurrency: 4,
            kind_concurrency: HashMap::new(),
        }
    }
}

impl DispatcherConfig {
    /// Parse from TOML (durations in milliseconds).
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    muster_core::setters! {
        set {
            poll_interval: Duration,
            dedup_window: Duration,
            announce_dispatch: bool,
            default_concurrency: usize,
        }
    }

    pub fn kind_limit(mut self, kind: impl Into<String>, limit: usize) -> Self {
        self.kind_concurrency.insert(kind.into(), limit);
        self
    }

    pub(crate) fn concurrency_for(&self, kind: &str) -> usize {
        self.kind_concurrency.get(kind).copied().unwrap_or(self.default_concurrency).max(1)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        // u64 keeps the TOML serializer happy (no u128 support there)
        (duration.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
