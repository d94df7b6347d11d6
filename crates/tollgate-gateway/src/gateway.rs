// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The metered call gateway.
//!
//! Composition root for one provider: owns the stage pipeline plus handles to
//! the recorder, budget guard and memo so callers can query spend without
//! going through a call.

use std::sync::Arc;

use tracing::debug;

use tollgate_compact::PromptCompactor;
use tollgate_config::model::TollgateConfig;
use tollgate_core::{CallProvider, TollgateError};
use tollgate_cost::{
    BudgetGuard, BudgetStatus, CostPrediction, CostSummary, PricingTable, UsageRecorder,
};
use tollgate_memo::{MemoStats, ResponseMemo};

use crate::outcome::{CallRequest, GatewayOutcome};
use crate::stage::{
    BudgetStage, CacheStage, CallContext, CompactionStage, DispatchStage, Stage, StageFlow,
};
use crate::usage::UsageExtractor;

/// Builder for [`MeteredCallGateway`]. Memo and compaction are off until set.
pub struct GatewayBuilder {
    provider: Arc<dyn CallProvider>,
    recorder: Arc<UsageRecorder>,
    pricing: Arc<PricingTable>,
    memo: Option<ResponseMemo>,
    compactor: Option<PromptCompactor>,
    extractors: Vec<UsageExtractor>,
}

impl GatewayBuilder {
    /// Enable the cache stage and memoize fresh responses.
    pub fn memo(mut self, memo: ResponseMemo) -> Self {
        self.memo = Some(memo);
        self
    }

    /// Enable the compaction stage.
    pub fn compactor(mut self, compactor: PromptCompactor) -> Self {
        self.compactor = Some(compactor);
        self
    }

    /// Replace the usage extractor order.
    pub fn extractors(mut self, extractors: Vec<UsageExtractor>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn build(self) -> MeteredCallGateway {
        let guard = Arc::new(BudgetGuard::new(
            self.recorder.clone(),
            self.pricing.clone(),
        ));

        let mut stages: Vec<Box<dyn Stage>> = Vec::new();
        if let Some(memo) = &self.memo {
            stages.push(Box::new(CacheStage::new(memo.clone())));
        }
        stages.push(Box::new(BudgetStage::new(guard.clone())));
        if let Some(compactor) = self.compactor {
            stages.push(Box::new(CompactionStage::new(compactor)));
        }
        stages.push(Box::new(DispatchStage::new(
            self.provider,
            self.pricing,
            self.recorder.clone(),
            self.memo.clone(),
            self.extractors,
        )));

        MeteredCallGateway {
            stages,
            recorder: self.recorder,
            guard,
            memo: self.memo,
        }
    }
}

/// Wraps every outbound call with memo, budget gate, compaction and metering.
pub struct MeteredCallGateway {
    stages: Vec<Box<dyn Stage>>,
    recorder: Arc<UsageRecorder>,
    guard: Arc<BudgetGuard>,
    memo: Option<ResponseMemo>,
}

impl MeteredCallGateway {
    pub fn builder(
        provider: Arc<dyn CallProvider>,
        recorder: Arc<UsageRecorder>,
        pricing: Arc<PricingTable>,
    ) -> GatewayBuilder {
        GatewayBuilder {
            provider,
            recorder,
            pricing,
            memo: None,
            compactor: None,
            extractors: UsageExtractor::DEFAULT_ORDER.to_vec(),
        }
    }

    /// Assemble a gateway with the stages `config` enables.
    pub fn from_config(
        config: &TollgateConfig,
        provider: Arc<dyn CallProvider>,
        recorder: Arc<UsageRecorder>,
        memo: ResponseMemo,
    ) -> Self {
        let pricing = Arc::new(PricingTable::from_config(&config.cost));
        let mut builder = Self::builder(provider, recorder, pricing);
        if config.memo.enabled {
            builder = builder.memo(memo);
        }
        if config.compaction.enabled {
            builder = builder.compactor(PromptCompactor::new());
        }
        builder.build()
    }

    /// Names of the active stages in run order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run one call through the pipeline.
    ///
    /// Returns `Err` only when the provider itself failed; that error is
    /// returned unchanged after a failure event has been recorded.
    pub async fn call(&self, request: CallRequest) -> Result<GatewayOutcome, TollgateError> {
        let mut ctx = CallContext::from(request);
        for stage in &self.stages {
            match stage.run(&mut ctx).await? {
                StageFlow::Continue => continue,
                StageFlow::ShortCircuit(outcome) => {
                    debug!(actor = %ctx.actor, stage = stage.name(), "pipeline finished");
                    return Ok(outcome);
                }
            }
        }
        Err(TollgateError::Internal(
            "call pipeline ended without an outcome".to_string(),
        ))
    }

    pub fn recorder(&self) -> &Arc<UsageRecorder> {
        &self.recorder
    }

    pub async fn budget_status(&self) -> Result<BudgetStatus, TollgateError> {
        self.guard.status().await
    }

    /// Memo statistics, or `None` when the memo is disabled.
    pub async fn cache_stats(&self) -> Result<Option<MemoStats>, TollgateError> {
        match &self.memo {
            Some(memo) => memo.stats().await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn cost_summary(&self) -> Result<CostSummary, TollgateError> {
        self.recorder.summary().await
    }

    pub async fn predict(
        &self,
        request_text: &str,
        actor: &str,
    ) -> Result<CostPrediction, TollgateError> {
        self.guard.predict(request_text, actor).await
    }
}
