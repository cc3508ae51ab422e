// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::CaseworkConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &CaseworkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.service.name.trim().is_empty() {
        fail("service.name must not be empty".to_string());
    }

    // Full EnvFilter directives are accepted; only a bare level is checked.
    let level = config.service.log_level.trim();
    if level.is_empty() {
        fail("service.log_level must not be empty".to_string());
    } else if !level.contains(['=', ',']) && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "service.log_level `{level}` is not one of {}",
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let queue = &config.queue;
    if queue.max_attempts < 1 {
        fail("queue.max_attempts must be at least 1".to_string());
    }
    if queue.backoff_max_secs < queue.backoff_base_secs {
        fail(format!(
            "queue.backoff_max_secs ({}) must not be smaller than queue.backoff_base_secs ({})",
            queue.backoff_max_secs, queue.backoff_base_secs
        ));
    }

    if config.worker.poll_interval_ms == 0 {
        fail("worker.poll_interval_ms must be greater than 0".to_string());
    }

    for (key, room) in [
        ("rooms.intake_room_id", &config.rooms.intake_room_id),
        ("rooms.decision_room_id", &config.rooms.decision_room_id),
        ("rooms.scheduling_room_id", &config.rooms.scheduling_room_id),
    ] {
        if room.trim().is_empty() {
            fail(format!("{key} must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CaseworkConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CaseworkConfig::default();
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn zero_attempts_and_inverted_backoff_both_reported() {
        let mut config = CaseworkConfig::default();
        config.queue.max_attempts = 0;
        config.queue.backoff_base_secs = 600;
        config.queue.backoff_max_secs = 60;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(has_message(&errors, "max_attempts"));
        assert!(has_message(&errors, "backoff_max_secs"));
    }

    #[test]
    fn zero_poll_interval_fails() {
        let mut config = CaseworkConfig::default();
        config.worker.poll_interval_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "poll_interval_ms"));
    }

    #[test]
    fn log_level_accepts_directives() {
        let mut config = CaseworkConfig::default();
        config.service.log_level = "casework=debug,info".to_string();
        assert!(validate_config(&config).is_ok());
        config.service.log_level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn empty_room_fails() {
        let mut config = CaseworkConfig::default();
        config.rooms.decision_room_id = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "rooms.decision_room_id"));
    }
}
