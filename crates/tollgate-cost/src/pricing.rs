// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing tables and cost calculation.
//!
//! Rates are USD per thousand units. Built-in rates:
//!
//! anthropic/claude-sonnet-4-20250514:  input=$0.003/1k, output=$0.015/1k
//! anthropic/claude-3-sonnet-20240229:  input=$0.003/1k, output=$0.015/1k
//!
//! `[[cost.models]]` entries add models or override the built-ins.

use std::collections::HashMap;

use tollgate_config::model::{CostConfig, DEFAULT_MODEL};
use tracing::warn;

/// Per-model rates in USD per thousand units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    /// Cost per 1000 input units.
    pub input_per_1k: f64,
    /// Cost per 1000 output units.
    pub output_per_1k: f64,
}

impl ModelRate {
    pub const fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }
}

const SONNET_RATE: ModelRate = ModelRate::new(0.003, 0.015);

const BUILTIN_RATES: &[(&str, ModelRate)] = &[
    (DEFAULT_MODEL, SONNET_RATE),
    ("anthropic/claude-3-sonnet-20240229", SONNET_RATE),
];

/// Exact-match lookup from model identifier to rates.
///
/// Unknown models are priced at the default model's rates. Pricing never fails.
#[derive(Debug, Clone)]
pub struct PricingTable {
    rates: HashMap<String, ModelRate>,
    default_model: String,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PricingTable {
    /// The built-in rates with [`DEFAULT_MODEL`] as the fallback.
    pub fn builtin() -> Self {
        Self {
            rates: BUILTIN_RATES
                .iter()
                .map(|(name, rate)| (name.to_string(), *rate))
                .collect(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Built-in rates merged with the configured overrides.
    pub fn from_config(config: &CostConfig) -> Self {
        let mut table = Self::builtin();
        for model in &config.models {
            table.rates.insert(
                model.name.clone(),
                ModelRate::new(model.input_per_1k, model.output_per_1k),
            );
        }
        table.default_model = config.default_model.clone();
        table
    }

    /// An empty table holding only `default_model`.
    pub fn single(default_model: impl Into<String>, rate: ModelRate) -> Self {
        let default_model = default_model.into();
        Self {
            rates: HashMap::from([(default_model.clone(), rate)]),
            default_model,
        }
    }

    /// Add or replace one model's rates.
    pub fn with_rate(mut self, model: impl Into<String>, rate: ModelRate) -> Self {
        self.rates.insert(model.into(), rate);
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn contains(&self, model: &str) -> bool {
        self.rates.contains_key(model)
    }

    /// Rates for `model`, falling back to the default model's rates.
    pub fn rate(&self, model: &str) -> ModelRate {
        if let Some(rate) = self.rates.get(model) {
            return *rate;
        }
        warn!(
            model = %model,
            default_model = %self.default_model,
            "unknown model, using default pricing"
        );
        self.rates
            .get(&self.default_model)
            .copied()
            .unwrap_or(SONNET_RATE)
    }

    /// Cost in USD for one call, rounded to 6 decimal places.
    pub fn price(&self, model: &str, input_units: u32, output_units: u32) -> f64 {
        let rate = self.rate(model);
        let input = (f64::from(input_units) / 1000.0) * rate.input_per_1k;
        let output = (f64::from(output_units) / 1000.0) * rate.output_per_1k;
        round_cost(input + output)
    }
}

/// Round a USD amount to 6 decimal places.
pub fn round_cost(cost: f64) -> f64 {
    (cost * 1_000_000.0).round() / 1_000_000.0
}
