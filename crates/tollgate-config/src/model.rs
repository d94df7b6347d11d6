// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Tollgate.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Model used for pricing when none is configured or the priced model is unknown.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4-20250514";

/// Top-level Tollgate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TollgateConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Database file locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Budget limits and pricing.
    #[serde(default)]
    pub cost: CostConfig,

    /// Response memoization settings.
    #[serde(default)]
    pub memo: MemoConfig,

    /// Prompt compaction settings.
    #[serde(default)]
    pub compaction: CompactionConfig,

    /// External call provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite storage configuration.
///
/// The usage ledger and the response memo live in separate database files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path of the usage event database.
    #[serde(default = "default_usage_database_path")]
    pub usage_database_path: String,

    /// Path of the response memo database.
    #[serde(default = "default_memo_database_path")]
    pub memo_database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            usage_database_path: default_usage_database_path(),
            memo_database_path: default_memo_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_usage_database_path() -> String {
    "cost_tracking.db".to_string()
}

fn default_memo_database_path() -> String {
    "cost_optimization.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Budget limits and model pricing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CostConfig {
    /// Spending limit for one session (process lifetime). This is the hard stop.
    #[serde(default = "default_session_budget")]
    pub session_budget_usd: f64,

    /// Spending limit for one calendar day (UTC). Advisory only.
    #[serde(default = "default_daily_budget")]
    pub daily_budget_usd: f64,

    /// Model whose rates apply to unknown models.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Trailing window for the per-agent breakdown in summaries.
    #[serde(default = "default_agent_window_hours")]
    pub agent_window_hours: u32,

    /// Extra or overriding per-model rates.
    #[serde(default)]
    pub models: Vec<ModelRateConfig>,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            session_budget_usd: default_session_budget(),
            daily_budget_usd: default_daily_budget(),
            default_model: default_model(),
            agent_window_hours: default_agent_window_hours(),
            models: Vec::new(),
        }
    }
}

fn default_session_budget() -> f64 {
    5.0
}

fn default_daily_budget() -> f64 {
    10.0
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_agent_window_hours() -> u32 {
    24
}

/// Per-model rates in USD per thousand units.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRateConfig {
    /// Exact model identifier.
    pub name: String,
    /// Price per 1000 input units.
    pub input_per_1k: f64,
    /// Price per 1000 output units.
    pub output_per_1k: f64,
}

/// Response memo configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoConfig {
    /// Whether the gateway consults the memo at all.
    #[serde(default = "default_memo_enabled")]
    pub enabled: bool,

    /// Freshness horizon measured from entry creation.
    #[serde(default = "default_memo_duration_hours")]
    pub duration_hours: u32,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            enabled: default_memo_enabled(),
            duration_hours: default_memo_duration_hours(),
        }
    }
}

fn default_memo_enabled() -> bool {
    true
}

fn default_memo_duration_hours() -> u32 {
    24
}

/// Prompt compaction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompactionConfig {
    #[serde(default = "default_compaction_enabled")]
    pub enabled: bool,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            enabled: default_compaction_enabled(),
        }
    }
}

fn default_compaction_enabled() -> bool {
    true
}

/// External call provider configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Model the provider calls. Falls back to `cost.default_model` when unset.
    #[serde(default)]
    pub model: Option<String>,
}

impl TollgateConfig {
    /// The model the provider is priced as.
    pub fn provider_model(&self) -> &str {
        self.provider
            .model
            .as_deref()
            .unwrap_or(self.cost.default_model.as_str())
    }
}
