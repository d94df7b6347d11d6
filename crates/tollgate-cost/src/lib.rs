// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage recording, budget enforcement, and pricing for Tollgate.
//!
//! This crate provides:
//! - **Pricing**: per-model rates with a default-model fallback
//! - **Usage recorder**: one persisted event per metered call, aggregates on demand
//! - **Budget guard**: session/daily classification and the session hard stop

pub mod budget;
pub mod pricing;
pub mod recorder;

pub use budget::{
    Authorization, BudgetGuard, BudgetLevel, BudgetStatus, Confidence, CostPrediction,
    suggest_optimizations,
};
pub use pricing::{ModelRate, PricingTable};
pub use recorder::{AgentCost, CostSummary, UsageEvent, UsageRecorder, generate_session_id};
