// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Budget classification and the authorize/deny gate.
//!
//! Every status is recomputed from the usage recorder's aggregates; nothing is
//! cached in memory. The session limit is the hard stop: `should_continue` is
//! false once the session reaches 90% of its limit. The daily limit only
//! produces recommendations.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use tollgate_core::TollgateError;

use crate::pricing::PricingTable;
use crate::recorder::UsageRecorder;

/// Ratio at which a scope becomes WARNING.
pub const WARNING_THRESHOLD: f64 = 0.7;
/// Ratio at which a scope becomes CRITICAL (and the session gate closes).
pub const CRITICAL_THRESHOLD: f64 = 0.9;
/// Ratio at which a scope becomes MODERATE.
pub const MODERATE_THRESHOLD: f64 = 0.3;

/// Trailing window used to decide whether an actor has history.
const PREDICTION_HISTORY_HOURS: u32 = 168;

const OPTIMIZATION_TIPS: [&str; 5] = [
    "Consider using cached results for similar queries",
    "Try more specific prompts to reduce token usage",
    "Break large research tasks into smaller, focused queries",
    "Use agent-specific optimized prompts",
    "Enable prompt optimization to reduce redundancy",
];

/// Spend classification for one scope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetLevel {
    Low,
    Moderate,
    Warning,
    Critical,
    Exceeded,
}

impl BudgetLevel {
    pub fn classify(ratio: f64) -> Self {
        if ratio >= 1.0 {
            Self::Exceeded
        } else if ratio >= CRITICAL_THRESHOLD {
            Self::Critical
        } else if ratio >= WARNING_THRESHOLD {
            Self::Warning
        } else if ratio >= MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

/// `cost / limit`, or 0 when the limit is not positive.
pub fn usage_ratio(cost: f64, limit: f64) -> f64 {
    if limit > 0.0 { cost / limit } else { 0.0 }
}

/// Computed view of spend against both limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub session_cost: f64,
    pub session_limit: f64,
    pub session_ratio: f64,
    pub session_level: BudgetLevel,
    pub daily_cost: f64,
    pub daily_limit: f64,
    pub daily_ratio: f64,
    pub daily_level: BudgetLevel,
}

impl BudgetStatus {
    pub fn from_costs(
        session_cost: f64,
        session_limit: f64,
        daily_cost: f64,
        daily_limit: f64,
    ) -> Self {
        let session_ratio = usage_ratio(session_cost, session_limit);
        let daily_ratio = usage_ratio(daily_cost, daily_limit);
        Self {
            session_cost,
            session_limit,
            session_ratio,
            session_level: BudgetLevel::classify(session_ratio),
            daily_cost,
            daily_limit,
            daily_ratio,
            daily_level: BudgetLevel::classify(daily_ratio),
        }
    }

    /// Whether another call may be dispatched.
    pub fn should_continue(&self) -> bool {
        self.session_ratio < CRITICAL_THRESHOLD
    }
}

/// Gate decision plus the messages to show the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    pub should_continue: bool,
    pub recommendations: Vec<String>,
    pub status: BudgetStatus,
}

impl Authorization {
    /// Decide from a status. `date` picks the rotating tip.
    pub fn from_status(status: BudgetStatus, date: NaiveDate) -> Self {
        let mut recommendations = Vec::new();

        if status.session_ratio >= CRITICAL_THRESHOLD {
            recommendations.extend([
                "Session budget critically low - consider ending session".to_string(),
                "Use the `summary` command to see a detailed breakdown".to_string(),
            ]);
        } else if status.session_ratio >= WARNING_THRESHOLD {
            recommendations.push("Session budget approaching limit".to_string());
            recommendations.push("Consider enabling caching for remaining queries".to_string());
        }

        if status.daily_ratio >= CRITICAL_THRESHOLD {
            recommendations.push("Daily budget critically low".to_string());
            recommendations.push("Focus on essential queries only".to_string());
        } else if status.daily_ratio >= WARNING_THRESHOLD {
            recommendations.push("Daily budget approaching limit".to_string());
            recommendations.push("Consider prompt optimization".to_string());
        }

        if status.session_level == BudgetLevel::Moderate
            || status.daily_level == BudgetLevel::Moderate
        {
            recommendations.push(daily_tip(date).to_string());
        }

        Self {
            should_continue: status.should_continue(),
            recommendations,
            status,
        }
    }
}

/// The optimization tip for `date`; stable for a whole day.
pub fn daily_tip(date: NaiveDate) -> &'static str {
    let index = date.num_days_from_ce().rem_euclid(OPTIMIZATION_TIPS.len() as i32) as usize;
    OPTIMIZATION_TIPS[index]
}

/// Concrete savings actions for a status that is running hot.
pub fn suggest_optimizations(status: &BudgetStatus) -> Vec<&'static str> {
    let mut suggestions = Vec::new();
    if status.session_ratio > 0.8 || status.daily_ratio > 0.8 {
        suggestions.extend([
            "Use more specific prompts to reduce token usage",
            "Check the cache for similar previous queries",
            "Break complex queries into smaller parts",
        ]);
    }
    if status.session_ratio > 0.5 {
        suggestions.extend([
            "Enable query caching if not already active",
            "Use prompt compaction to remove redundancy",
            "Review per-agent costs in the summary report",
        ]);
    }
    suggestions
}

/// How much history backs a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
}

/// Heuristic forecast for a request that has not been sent yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostPrediction {
    pub estimated_cost: f64,
    pub estimated_input_units: u32,
    pub estimated_output_units: u32,
    pub confidence: Confidence,
}

/// Classifies spend and gates new calls.
pub struct BudgetGuard {
    recorder: Arc<UsageRecorder>,
    pricing: Arc<PricingTable>,
}

impl BudgetGuard {
    pub fn new(recorder: Arc<UsageRecorder>, pricing: Arc<PricingTable>) -> Self {
        Self { recorder, pricing }
    }

    /// Current status against today's (UTC) spend.
    pub async fn status(&self) -> Result<BudgetStatus, TollgateError> {
        self.status_on(Utc::now().date_naive()).await
    }

    /// Status with the daily scope evaluated for `date`.
    pub async fn status_on(&self, date: NaiveDate) -> Result<BudgetStatus, TollgateError> {
        let session_cost = self.recorder.session_cost().await?;
        let daily_cost = self.recorder.daily_cost(date).await?;
        Ok(BudgetStatus::from_costs(
            session_cost,
            self.recorder.session_budget(),
            daily_cost,
            self.recorder.daily_budget(),
        ))
    }

    /// Decide whether another call may be dispatched now.
    pub async fn authorize(&self) -> Result<Authorization, TollgateError> {
        self.authorize_on(Utc::now().date_naive()).await
    }

    pub async fn authorize_on(&self, date: NaiveDate) -> Result<Authorization, TollgateError> {
        let status = self.status_on(date).await?;
        let auth = Authorization::from_status(status, date);
        if !auth.should_continue {
            warn!(
                session_cost = auth.status.session_cost,
                session_limit = auth.status.session_limit,
                level = %auth.status.session_level,
                "session budget critical, denying further calls"
            );
        } else {
            debug!(
                session_level = %auth.status.session_level,
                daily_level = %auth.status.daily_level,
                "budget check passed"
            );
        }
        Ok(auth)
    }

    /// Forecast the cost of sending `request_text` as `actor`.
    ///
    /// Actors with spend in the trailing week are assumed to produce as much
    /// output as input; unknown actors 1.5x.
    pub async fn predict(
        &self,
        request_text: &str,
        actor: &str,
    ) -> Result<CostPrediction, TollgateError> {
        let input_units = u32::try_from(request_text.chars().count() / 4).unwrap_or(u32::MAX);
        let history = self.recorder.agent_costs(PREDICTION_HISTORY_HOURS).await?;
        let has_history = history
            .iter()
            .any(|entry| entry.actor == actor && entry.cost_usd > 0.0);

        let (output_units, confidence) = if has_history {
            (input_units, Confidence::Medium)
        } else {
            (input_units.saturating_add(input_units / 2), Confidence::Low)
        };

        Ok(CostPrediction {
            estimated_cost: self
                .pricing
                .price(self.pricing.default_model(), input_units, output_units),
            estimated_input_units: input_units,
            estimated_output_units: output_units,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::UsageEvent;
    use tollgate_config::model::CostConfig;
    use tollgate_core::{SessionId, TokenUsage};
    use tollgate_storage::Database;

    async fn guard_with(
        session_budget: f64,
        daily_budget: f64,
    ) -> (BudgetGuard, Arc<UsageRecorder>) {
        let db = Database::open_in_memory().await.unwrap();
        let config = CostConfig {
            session_budget_usd: session_budget,
            daily_budget_usd: daily_budget,
            ..CostConfig::default()
        };
        let recorder = Arc::new(UsageRecorder::with_session(
            db,
            &config,
            SessionId("sess-budget".to_string()),
        ));
        let guard = BudgetGuard::new(recorder.clone(), Arc::new(PricingTable::builtin()));
        (guard, recorder)
    }

    async fn spend(recorder: &UsageRecorder, actor: &str, cost: f64) {
        let event = UsageEvent::new(
            actor,
            recorder.session_id(),
            "anthropic/claude-sonnet-4-20250514",
            TokenUsage::new(100, 100),
            cost,
            "task",
        );
        recorder.record(&event).await.unwrap();
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(BudgetLevel::classify(0.0), BudgetLevel::Low);
        assert_eq!(BudgetLevel::classify(0.29), BudgetLevel::Low);
        assert_eq!(BudgetLevel::classify(0.3), BudgetLevel::Moderate);
        assert_eq!(BudgetLevel::classify(0.69), BudgetLevel::Moderate);
        assert_eq!(BudgetLevel::classify(0.7), BudgetLevel::Warning);
        assert_eq!(BudgetLevel::classify(0.9), BudgetLevel::Critical);
        assert_eq!(BudgetLevel::classify(0.99), BudgetLevel::Critical);
        assert_eq!(BudgetLevel::classify(1.0), BudgetLevel::Exceeded);
        assert_eq!(BudgetLevel::classify(3.0), BudgetLevel::Exceeded);
    }

    #[test]
    fn level_display_is_screaming_case() {
        assert_eq!(BudgetLevel::Critical.to_string(), "CRITICAL");
        assert_eq!(Confidence::Medium.to_string(), "medium");
    }

    #[test]
    fn zero_limit_means_zero_ratio() {
        assert_eq!(usage_ratio(3.0, 0.0), 0.0);
        assert_eq!(usage_ratio(3.0, -1.0), 0.0);
        let status = BudgetStatus::from_costs(3.0, 0.0, 3.0, 0.0);
        assert_eq!(status.session_level, BudgetLevel::Low);
        assert!(status.should_continue());
    }

    #[test]
    fn gate_closes_exactly_at_critical_session_ratio() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let open = Authorization::from_status(BudgetStatus::from_costs(4.49, 5.0, 0.0, 10.0), date);
        assert!(open.should_continue);
        let closed = Authorization::from_status(BudgetStatus::from_costs(4.5, 5.0, 0.0, 10.0), date);
        assert!(!closed.should_continue);
    }

    #[test]
    fn daily_critical_alone_does_not_block() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let auth = Authorization::from_status(BudgetStatus::from_costs(0.1, 5.0, 9.9, 10.0), date);
        assert!(auth.should_continue);
        assert_eq!(auth.status.daily_level, BudgetLevel::Critical);
        assert!(auth.recommendations.iter().any(|r| r == "Daily budget critically low"));
    }

    #[test]
    fn warning_recommendations_per_scope() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let auth = Authorization::from_status(BudgetStatus::from_costs(3.6, 5.0, 7.5, 10.0), date);
        assert_eq!(
            auth.recommendations,
            vec![
                "Session budget approaching limit",
                "Consider enabling caching for remaining queries",
                "Daily budget approaching limit",
                "Consider prompt optimization",
            ]
        );
    }

    #[test]
    fn moderate_band_adds_the_daily_tip() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let auth = Authorization::from_status(BudgetStatus::from_costs(2.0, 5.0, 0.0, 10.0), date);
        assert_eq!(auth.recommendations, vec![daily_tip(date)]);

        let low = Authorization::from_status(BudgetStatus::from_costs(0.1, 5.0, 0.1, 10.0), date);
        assert!(low.recommendations.is_empty());
    }

    #[test]
    fn daily_tip_is_stable_and_rotates() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(daily_tip(day), daily_tip(day));
        let tips: std::collections::HashSet<&str> = (0..5)
            .map(|offset| daily_tip(day + chrono::Duration::days(offset)))
            .collect();
        assert_eq!(tips.len(), OPTIMIZATION_TIPS.len());
    }

    #[test]
    fn suggestions_by_ratio() {
        assert!(suggest_optimizations(&BudgetStatus::from_costs(1.0, 5.0, 1.0, 10.0)).is_empty());
        assert_eq!(suggest_optimizations(&BudgetStatus::from_costs(3.0, 5.0, 0.0, 10.0)).len(), 3);
        assert_eq!(suggest_optimizations(&BudgetStatus::from_costs(0.0, 5.0, 8.5, 10.0)).len(), 3);
        assert_eq!(suggest_optimizations(&BudgetStatus::from_costs(4.5, 5.0, 0.0, 10.0)).len(), 6);
    }

    #[tokio::test]
    async fn status_reads_recorded_spend() {
        let (guard, recorder) = guard_with(5.0, 10.0).await;
        spend(&recorder, "coordinator", 4.60).await;

        let status = guard.status().await.unwrap();
        assert_eq!(status.session_level, BudgetLevel::Critical);
        assert!((status.session_ratio - 0.92).abs() < 1e-10);

        let auth = guard.authorize().await.unwrap();
        assert!(!auth.should_continue);
        assert!(
            auth.recommendations
                .iter()
                .any(|r| r.starts_with("Session budget critically low"))
        );
    }

    #[tokio::test]
    async fn authorize_flips_as_spend_accumulates() {
        let (guard, recorder) = guard_with(10.0, 100.0).await;
        for _ in 0..8 {
            spend(&recorder, "a", 1.0).await;
            assert!(guard.authorize().await.unwrap().should_continue);
        }
        spend(&recorder, "a", 1.0).await;
        assert!(!guard.authorize().await.unwrap().should_continue);
    }

    #[tokio::test]
    async fn predict_without_history_is_low_confidence() {
        let (guard, _recorder) = guard_with(5.0, 10.0).await;
        let text = "x".repeat(400);
        let prediction = guard.predict(&text, "newcomer").await.unwrap();
        assert_eq!(prediction.confidence, Confidence::Low);
        assert_eq!(prediction.estimated_input_units, 100);
        assert_eq!(prediction.estimated_output_units, 150);
        // 100/1k * 0.003 + 150/1k * 0.015
        assert!((prediction.estimated_cost - 0.00255).abs() < 1e-12);
    }

    #[tokio::test]
    async fn predict_with_history_is_medium_confidence() {
        let (guard, recorder) = guard_with(5.0, 10.0).await;
        spend(&recorder, "searcher", 0.2).await;
        let prediction = guard.predict(&"y".repeat(400), "searcher").await.unwrap();
        assert_eq!(prediction.confidence, Confidence::Medium);
        assert_eq!(prediction.estimated_output_units, 100);
    }
}
