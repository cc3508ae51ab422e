// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./casework.toml` > `~/.config/casework/casework.toml` >
//! `/etc/casework/casework.toml` with environment variable overrides via `CASEWORK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CaseworkConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/casework/casework.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "casework.toml";

/// Section names recognized in env var keys, in match order.
const ENV_SECTIONS: &[&str] = &["service", "storage", "queue", "worker", "rooms"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/casework/casework.toml` (system-wide)
/// 3. `~/.config/casework/casework.toml` (user XDG config)
/// 4. `./casework.toml` (local directory)
/// 5. `CASEWORK_*` environment variables
pub fn load_config() -> Result<CaseworkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
pub fn load_config_from_str(toml_content: &str) -> Result<CaseworkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CaseworkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CaseworkConfig, figment::Error> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    Figment::new()
        .merge(Serialized::defaults(CaseworkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for XDG config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CaseworkConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("casework").join(LOCAL_CONFIG_FILE))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment variable provider mapping `CASEWORK_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CASEWORK_QUEUE_MAX_ATTEMPTS` must become `queue.max_attempts`.
fn env_provider() -> Env {
    Env::prefixed("CASEWORK_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("queue_max_attempts"), "queue.max_attempts");
        assert_eq!(map_env_key("storage_busy_timeout_ms"), "storage.busy_timeout_ms");
        assert_eq!(map_env_key("rooms_intake_room_id"), "rooms.intake_room_id");
        assert_eq!(map_env_key("service_log_level"), "service.log_level");
    }

    #[test]
    fn unknown_env_section_passes_through() {
        assert_eq!(map_env_key("unrelated"), "unrelated");
        assert_eq!(map_env_key("workers_x"), "workers_x");
    }
}
