// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Casework workflow engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use casework_core::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Top-level Casework configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CaseworkConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Job retry and backoff settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Worker loop settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Chat rooms the workflow posts into.
    #[serde(default)]
    pub rooms: RoomsConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name reported in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "casework".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    "casework.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Retry configuration for failed jobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Attempts before a job is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failed attempt, in seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,

    /// Multiplier applied to the delay per additional attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    /// Upper bound for a single retry delay, in seconds.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_factor: default_backoff_factor(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

impl QueueConfig {
    /// The retry policy described by this section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.backoff_base_secs),
            factor: self.backoff_factor,
            max_delay: Duration::from_secs(self.backoff_max_secs),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_base_secs() -> u64 {
    30
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_backoff_max_secs() -> u64 {
    1200
}

/// Worker loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Sleep between polls when no job is due, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Chat room configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoomsConfig {
    /// Room where documents arrive and final replies are posted.
    #[serde(default = "default_intake_room_id")]
    pub intake_room_id: String,

    /// Room where the decision widget is posted.
    #[serde(default = "default_decision_room_id")]
    pub decision_room_id: String,

    /// Room where scheduling requests are posted.
    #[serde(default = "default_scheduling_room_id")]
    pub scheduling_room_id: String,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            intake_room_id: default_intake_room_id(),
            decision_room_id: default_decision_room_id(),
            scheduling_room_id: default_scheduling_room_id(),
        }
    }
}

fn default_intake_room_id() -> String {
    "!intake:localhost".to_string()
}

fn default_decision_room_id() -> String {
    "!decision:localhost".to_string()
}

fn default_scheduling_room_id() -> String {
    "!scheduling:localhost".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_section_builds_retry_policy() {
        let queue = QueueConfig {
            max_attempts: 3,
            backoff_base_secs: 10,
            backoff_factor: 3,
            backoff_max_secs: 60,
        };
        let policy = queue.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(30));
        assert_eq!(policy.delay_for(3), Duration::from_secs(60));
    }

    #[test]
    fn default_queue_matches_default_policy() {
        assert_eq!(QueueConfig::default().retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn rooms_deny_unknown_fields() {
        let toml_str = r#"
[rooms]
intake_room = "!a:b"
"#;
        assert!(toml::from_str::<CaseworkConfig>(toml_str).is_err());
    }
}
