// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-negative budgets, usable database paths, and a pricing table that
//! contains its own default model.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{DEFAULT_MODEL, TollgateConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TollgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.usage_database_path.trim().is_empty() {
        errors.push(validation("storage.usage_database_path must not be empty"));
    }
    if config.storage.memo_database_path.trim().is_empty() {
        errors.push(validation("storage.memo_database_path must not be empty"));
    }

    let session = config.cost.session_budget_usd;
    if !session.is_finite() || session < 0.0 {
        errors.push(validation(format!(
            "cost.session_budget_usd must be non-negative, got {session}"
        )));
    }
    let daily = config.cost.daily_budget_usd;
    if !daily.is_finite() || daily < 0.0 {
        errors.push(validation(format!(
            "cost.daily_budget_usd must be non-negative, got {daily}"
        )));
    }

    if config.cost.agent_window_hours == 0 {
        errors.push(validation("cost.agent_window_hours must be at least 1"));
    }

    if config.memo.duration_hours == 0 {
        errors.push(validation("memo.duration_hours must be at least 1"));
    }

    let mut seen = HashSet::new();
    for (i, rate) in config.cost.models.iter().enumerate() {
        if rate.name.trim().is_empty() {
            errors.push(validation(format!("cost.models[{i}].name must not be empty")));
        }
        if !seen.insert(rate.name.as_str()) {
            errors.push(validation(format!(
                "duplicate model `{}` in [[cost.models]]",
                rate.name
            )));
        }
        if rate.input_per_1k < 0.0 || rate.output_per_1k < 0.0 {
            errors.push(validation(format!(
                "cost.models[{i}] (`{}`) rates must be non-negative",
                rate.name
            )));
        }
    }

    // Unknown models fall back to the default model's rates, so it must be priced.
    let default_model = config.cost.default_model.as_str();
    if default_model != DEFAULT_MODEL && !seen.contains(default_model) {
        errors.push(validation(format!(
            "cost.default_model `{default_model}` has no rates; add it to [[cost.models]]"
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelRateConfig;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = TollgateConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn negative_budgets_fail_validation() {
        let mut config = TollgateConfig::default();
        config.cost.session_budget_usd = -1.0;
        config.cost.daily_budget_usd = -5.0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "session_budget_usd"));
        assert!(has_error(&errors, "daily_budget_usd"));
    }

    #[test]
    fn zero_budget_is_allowed() {
        let mut config = TollgateConfig::default();
        config.cost.session_budget_usd = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TollgateConfig::default();
        config.storage.memo_database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "memo_database_path"));
    }

    #[test]
    fn zero_memo_duration_fails_validation() {
        let mut config = TollgateConfig::default();
        config.memo.duration_hours = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "memo.duration_hours"));
    }

    #[test]
    fn duplicate_model_rates_fail_validation() {
        let mut config = TollgateConfig::default();
        let rate = ModelRateConfig {
            name: "m".to_string(),
            input_per_1k: 0.001,
            output_per_1k: 0.002,
        };
        config.cost.models = vec![rate.clone(), rate];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "duplicate model"));
    }

    #[test]
    fn unpriced_default_model_fails_validation() {
        let mut config = TollgateConfig::default();
        config.cost.default_model = "mystery".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "has no rates"));

        config.cost.models.push(ModelRateConfig {
            name: "mystery".to_string(),
            input_per_1k: 0.01,
            output_per_1k: 0.02,
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = TollgateConfig::default();
        config.cost.session_budget_usd = -1.0;
        config.memo.duration_hours = 0;
        config.storage.usage_database_path = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
