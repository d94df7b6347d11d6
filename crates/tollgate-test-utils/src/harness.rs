// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full metering stack the way the binary does:
//! two temp SQLite files, a usage recorder, a response memo, and a gateway
//! over a [`MockProvider`].

use std::sync::Arc;

use tollgate_config::model::{DEFAULT_MODEL, ModelRateConfig, TollgateConfig};
use tollgate_core::{SessionId, TollgateError};
use tollgate_cost::{UsageEvent, UsageRecorder};
use tollgate_gateway::{CallRequest, GatewayOutcome, MeteredCallGateway};
use tollgate_memo::ResponseMemo;
use tollgate_storage::Database;

use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: TollgateConfig,
    session_id: SessionId,
    model: String,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: TollgateConfig::default(),
            session_id: SessionId("session_test".to_string()),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Set the session (hard stop) budget.
    pub fn with_session_budget(mut self, usd: f64) -> Self {
        self.config.cost.session_budget_usd = usd;
        self
    }

    /// Set the daily (advisory) budget.
    pub fn with_daily_budget(mut self, usd: f64) -> Self {
        self.config.cost.daily_budget_usd = usd;
        self
    }

    pub fn with_memo_duration_hours(mut self, hours: u32) -> Self {
        self.config.memo.duration_hours = hours;
        self
    }

    pub fn with_memo(mut self, enabled: bool) -> Self {
        self.config.memo.enabled = enabled;
        self
    }

    pub fn with_compaction(mut self, enabled: bool) -> Self {
        self.config.compaction.enabled = enabled;
        self
    }

    /// Price the mock provider's model with custom rates.
    pub fn with_model_rates(mut self, model: &str, input_per_1k: f64, output_per_1k: f64) -> Self {
        self.config.cost.models.push(ModelRateConfig {
            name: model.to_string(),
            input_per_1k,
            output_per_1k,
        });
        self.model = model.to_string();
        self
    }

    pub fn with_session_id(mut self, session_id: &str) -> Self {
        self.session_id = SessionId(session_id.to_string());
        self
    }

    /// Build the harness, opening fresh databases in a temp directory.
    pub async fn build(self) -> Result<TestHarness, TollgateError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| TollgateError::Storage { source: e.into() })?;
        let mut config = self.config;
        config.storage.usage_database_path = temp_dir
            .path()
            .join("cost_tracking.db")
            .to_string_lossy()
            .to_string();
        config.storage.memo_database_path = temp_dir
            .path()
            .join("cost_optimization.db")
            .to_string_lossy()
            .to_string();
        config.provider.model = Some(self.model.clone());

        let usage_db = Database::open(&config.storage.usage_database_path).await?;
        let memo_db = Database::open(&config.storage.memo_database_path).await?;

        let recorder = Arc::new(UsageRecorder::with_session(
            usage_db,
            &config.cost,
            self.session_id,
        ));
        let memo = ResponseMemo::new(memo_db, &config.memo);
        let provider = Arc::new(MockProvider::new(self.model));
        let gateway = MeteredCallGateway::from_config(
            &config,
            provider.clone(),
            recorder.clone(),
            memo.clone(),
        );

        Ok(TestHarness {
            provider,
            recorder,
            memo,
            gateway,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete metering stack with a mock provider and temp storage.
pub struct TestHarness {
    /// The scripted provider behind the gateway.
    pub provider: Arc<MockProvider>,
    pub recorder: Arc<UsageRecorder>,
    pub memo: ResponseMemo,
    pub gateway: MeteredCallGateway,
    pub config: TollgateConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send one user message as `actor` through the gateway.
    pub async fn send(&self, actor: &str, text: &str) -> Result<GatewayOutcome, TollgateError> {
        self.gateway.call(CallRequest::user(actor, text)).await
    }

    /// Every usage event recorded in this harness's session.
    pub async fn events(&self) -> Result<Vec<UsageEvent>, TollgateError> {
        self.recorder.session_events(self.recorder.session_id()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_builds_with_defaults() {
        let harness = TestHarness::builder().build().await.unwrap();
        assert_eq!(
            harness.gateway.stage_names(),
            vec!["cache", "budget", "compaction", "dispatch"]
        );
        assert!(harness.events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_goes_through_the_mock() {
        let harness = TestHarness::builder()
            .with_compaction(false)
            .build()
            .await
            .unwrap();
        let outcome = harness.send("searcher", "hello").await.unwrap();
        assert_eq!(outcome.content(), "mock response");
        assert_eq!(harness.provider.call_count(), 1);
        assert_eq!(harness.events().await.unwrap().len(), 1);
    }
}
