// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Casework configuration system.

use std::time::Duration;

use casework_config::diagnostic::ConfigError;
use casework_config::model::CaseworkConfig;
use casework_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_casework_config() {
    let toml = r#"
[service]
name = "triage-worker"
log_level = "debug"

[storage]
database_path = "/tmp/casework-test.db"
wal_mode = false
busy_timeout_ms = 250

[queue]
max_attempts = 3
backoff_base_secs = 5
backoff_factor = 3
backoff_max_secs = 90

[worker]
poll_interval_ms = 200

[rooms]
intake_room_id = "!r1:example.org"
decision_room_id = "!r2:example.org"
scheduling_room_id = "!r3:example.org"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "triage-worker");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/casework-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.queue.max_attempts, 3);
    assert_eq!(config.queue.retry_policy().delay_for(2), Duration::from_secs(15));
    assert_eq!(config.worker.poll_interval(), Duration::from_millis(200));
    assert_eq!(config.rooms.intake_room_id, "!r1:example.org");
    assert_eq!(config.rooms.decision_room_id, "!r2:example.org");
    assert_eq!(config.rooms.scheduling_room_id, "!r3:example.org");
}

/// Missing sections fall back to compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.service.name, "casework");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.storage.database_path, "casework.db");
    assert!(config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 5000);
    assert_eq!(config.queue.max_attempts, 5);
    assert_eq!(config.queue.backoff_base_secs, 30);
    assert_eq!(config.queue.backoff_factor, 2);
    assert_eq!(config.queue.backoff_max_secs, 1200);
    assert_eq!(config.worker.poll_interval_ms, 1000);
}

/// A typo in a known section yields an UnknownKey diagnostic with a suggestion.
#[test]
fn typo_produces_unknown_key_with_suggestion() {
    let toml = r#"
[queue]
max_atempts = 3
"#;
    let errors = load_and_validate_str(toml).expect_err("typo must be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "max_atempts" && suggestion.as_deref() == Some("max_attempts")
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn unknown_section_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// A value of the wrong type is reported as InvalidType.
#[test]
fn wrong_type_reported() {
    let toml = r#"
[worker]
poll_interval_ms = "fast"
"#;
    let errors = load_and_validate_str(toml).expect_err("string for integer must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("poll_interval_ms"))),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[queue]
max_attempts = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero attempts must fail");
    assert!(matches!(&errors[0], ConfigError::Validation { message } if message.contains("max_attempts")));
}

/// `CASEWORK_*` env vars override file values, with underscores inside key names preserved.
#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[queue]
max_attempts = 7

[rooms]
intake_room_id = "!file:example.org"
"#,
        )?;
        jail.set_env("CASEWORK_QUEUE_MAX_ATTEMPTS", "2");
        jail.set_env("CASEWORK_WORKER_POLL_INTERVAL_MS", "50");
        jail.set_env("CASEWORK_ROOMS_SCHEDULING_ROOM_ID", "!env:example.org");

        let config: CaseworkConfig =
            load_and_validate_path(std::path::Path::new("custom.toml")).map_err(|errs| {
                figment::Error::from(format!("{errs:?}"))
            })?;
        assert_eq!(config.queue.max_attempts, 2);
        assert_eq!(config.worker.poll_interval_ms, 50);
        assert_eq!(config.rooms.intake_room_id, "!file:example.org");
        assert_eq!(config.rooms.scheduling_room_id, "!env:example.org");
        Ok(())
    });
}

/// The local `casework.toml` is picked up by the XDG loader.
#[test]
fn local_config_file_is_loaded() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "casework.toml",
            r#"
[service]
name = "from-local-file"
"#,
        )?;
        let config = casework_config::load_and_validate()
            .map_err(|errs| figment::Error::from(format!("{errs:?}")))?;
        assert_eq!(config.service.name, "from-local-file");
        Ok(())
    });
}
