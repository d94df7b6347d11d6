// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tollgate.toml` > `~/.config/tollgate/tollgate.toml` > `/etc/tollgate/tollgate.toml`
//! with environment variable overrides via the `TOLLGATE_` prefix and the two
//! legacy budget variables `DAILY_COST_BUDGET` / `SESSION_COST_BUDGET`.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TollgateConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tollgate/tollgate.toml` (system-wide)
/// 3. `~/.config/tollgate/tollgate.toml` (user XDG config)
/// 4. `./tollgate.toml` (local directory)
/// 5. `DAILY_COST_BUDGET` / `SESSION_COST_BUDGET`
/// 6. `TOLLGATE_*` environment variables
pub fn load_config() -> Result<TollgateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TollgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TollgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::file(path))
        .merge(legacy_budget_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::file("/etc/tollgate/tollgate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tollgate/tollgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tollgate.toml"))
        .merge(legacy_budget_provider())
        .merge(env_provider())
}

/// Environment provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")`: `TOLLGATE_COST_DAILY_BUDGET_USD`
/// must map to `cost.daily_budget_usd`, not `cost.daily.budget.usd`.
fn env_provider() -> Env {
    Env::prefixed("TOLLGATE_").map(|key| section_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Config sections; only the leading one is turned into a dot so that
/// `storage_memo_database_path` stays `storage.memo_database_path`.
const SECTIONS: &[&str] = &["log", "storage", "cost", "memo", "compaction", "provider"];

fn section_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// The budget variables older deployments set without a prefix.
fn legacy_budget_provider() -> Env {
    Env::raw()
        .only(&["DAILY_COST_BUDGET", "SESSION_COST_BUDGET"])
        .map(|key| {
            let lower = key.as_str().to_ascii_lowercase();
            let mapped = match lower.as_str() {
                "daily_cost_budget" => "cost.daily_budget_usd".to_string(),
                "session_cost_budget" => "cost.session_budget_usd".to_string(),
                _ => lower.clone(),
            };
            mapped.into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_key_maps_only_leading_section() {
        assert_eq!(
            section_key("storage_memo_database_path"),
            "storage.memo_database_path"
        );
        assert_eq!(section_key("cost_daily_budget_usd"), "cost.daily_budget_usd");
        assert_eq!(section_key("memo_enabled"), "memo.enabled");
        assert_eq!(section_key("unrelated"), "unrelated");
    }
}
