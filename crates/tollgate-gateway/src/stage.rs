// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline stages run by the gateway for every call.
//!
//! Fixed order: cache, budget, compaction, dispatch. Each stage either lets
//! the call continue or ends it with an outcome. Only a provider failure is
//! returned as an error; storage failures inside a stage are logged and the
//! call proceeds.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use tollgate_compact::PromptCompactor;
use tollgate_core::{
    CallOptions, CallProvider, ChatMessage, TokenUsage, TollgateError, estimate_units,
    payload_text,
};
use tollgate_cost::{BudgetGuard, PricingTable, UsageEvent, UsageRecorder};
use tollgate_memo::ResponseMemo;

use crate::outcome::{CallRequest, GatewayOutcome};
use crate::usage::{UsageExtractor, extract_usage};

/// Label prefix for events recorded after a failed dispatch.
pub const FAILED_LABEL_PREFIX: &str = "FAILED: ";

/// Mutable state for one call as it moves through the stages.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub actor: String,
    pub task_label: String,
    /// Payload as it will be dispatched. Compaction rewrites this.
    pub messages: Vec<ChatMessage>,
    pub options: CallOptions,
    /// Joined payload before compaction. The memo key.
    pub request_text: String,
    /// Units removed by compaction.
    pub units_saved: u32,
}

impl From<CallRequest> for CallContext {
    fn from(request: CallRequest) -> Self {
        Self {
            request_text: payload_text(&request.messages),
            actor: request.actor,
            task_label: request.task_label,
            messages: request.messages,
            options: request.options,
            units_saved: 0,
        }
    }
}

/// Whether the pipeline goes on to the next stage.
#[derive(Debug)]
pub enum StageFlow {
    Continue,
    ShortCircuit(GatewayOutcome),
}

/// One step of the call pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut CallContext) -> Result<StageFlow, TollgateError>;
}

/// Serves fresh memo entries without dispatching.
pub struct CacheStage {
    memo: ResponseMemo,
}

impl CacheStage {
    pub fn new(memo: ResponseMemo) -> Self {
        Self { memo }
    }
}

#[async_trait]
impl Stage for CacheStage {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn run(&self, ctx: &mut CallContext) -> Result<StageFlow, TollgateError> {
        match self.memo.lookup(&ctx.request_text, &ctx.actor).await {
            Ok(Some(hit)) => Ok(StageFlow::ShortCircuit(GatewayOutcome::Cached {
                content: hit.response_text,
                cost_saved: hit.cost_saved,
            })),
            Ok(None) => Ok(StageFlow::Continue),
            Err(e) => {
                warn!(actor = %ctx.actor, error = %e, "memo lookup failed, treating as miss");
                Ok(StageFlow::Continue)
            }
        }
    }
}

/// Denies the call once the session budget is critical.
pub struct BudgetStage {
    guard: Arc<BudgetGuard>,
}

impl BudgetStage {
    pub fn new(guard: Arc<BudgetGuard>) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl Stage for BudgetStage {
    fn name(&self) -> &'static str {
        "budget"
    }

    async fn run(&self, ctx: &mut CallContext) -> Result<StageFlow, TollgateError> {
        let auth = match self.guard.authorize().await {
            Ok(auth) => auth,
            Err(e) => {
                warn!(actor = %ctx.actor, error = %e, "budget check failed, allowing call");
                return Ok(StageFlow::Continue);
            }
        };

        for recommendation in &auth.recommendations {
            info!(actor = %ctx.actor, recommendation = %recommendation, "budget notice");
        }

        if auth.should_continue {
            Ok(StageFlow::Continue)
        } else {
            warn!(actor = %ctx.actor, "budget limit reached, call cancelled");
            Ok(StageFlow::ShortCircuit(GatewayOutcome::Cancelled {
                recommendations: auth.recommendations,
            }))
        }
    }
}

/// Rewrites message contents with the prompt compactor.
pub struct CompactionStage {
    compactor: PromptCompactor,
}

impl CompactionStage {
    pub fn new(compactor: PromptCompactor) -> Self {
        Self { compactor }
    }
}

#[async_trait]
impl Stage for CompactionStage {
    fn name(&self) -> &'static str {
        "compaction"
    }

    async fn run(&self, ctx: &mut CallContext) -> Result<StageFlow, TollgateError> {
        for message in &mut ctx.messages {
            let compacted = self.compactor.compact(&message.content, &ctx.actor);
            ctx.units_saved = ctx.units_saved.saturating_add(compacted.units_saved);
            message.content = compacted.text;
        }
        if ctx.units_saved > 0 {
            debug!(actor = %ctx.actor, units_saved = ctx.units_saved, "payload compacted");
        }
        Ok(StageFlow::Continue)
    }
}

/// Calls the provider, then meters and memoizes the result.
pub struct DispatchStage {
    provider: Arc<dyn CallProvider>,
    pricing: Arc<PricingTable>,
    recorder: Arc<UsageRecorder>,
    memo: Option<ResponseMemo>,
    extractors: Vec<UsageExtractor>,
}

impl DispatchStage {
    pub fn new(
        provider: Arc<dyn CallProvider>,
        pricing: Arc<PricingTable>,
        recorder: Arc<UsageRecorder>,
        memo: Option<ResponseMemo>,
        extractors: Vec<UsageExtractor>,
    ) -> Self {
        Self {
            provider,
            pricing,
            recorder,
            memo,
            extractors,
        }
    }

    async fn record(&self, ctx: &CallContext, usage: TokenUsage, cost: f64, label: String) {
        let event = UsageEvent::new(
            &ctx.actor,
            self.recorder.session_id(),
            self.provider.model(),
            usage,
            cost,
            label,
        );
        if let Err(e) = self.recorder.record(&event).await {
            error!(actor = %ctx.actor, error = %e, "failed to record usage event");
        }
    }
}

#[async_trait]
impl Stage for DispatchStage {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    async fn run(&self, ctx: &mut CallContext) -> Result<StageFlow, TollgateError> {
        let model = self.provider.model();
        let dispatched = payload_text(&ctx.messages);

        let reply = match self.provider.call(&ctx.messages, &ctx.options).await {
            Ok(reply) => reply,
            Err(err) => {
                let usage = TokenUsage::new(estimate_units(&dispatched), 0);
                let cost = self.pricing.price(model, usage.input_tokens, 0);
                warn!(actor = %ctx.actor, model = %model, error = %err, "metered call failed");
                let label = format!("{FAILED_LABEL_PREFIX}{}", ctx.task_label);
                self.record(ctx, usage, cost, label).await;
                return Err(err);
            }
        };

        let (usage, usage_source) = match extract_usage(&self.extractors, &reply) {
            Some((extractor, usage)) => (usage, Some(extractor)),
            None => {
                debug!(actor = %ctx.actor, "no usage reported, estimating from text length");
                let usage = TokenUsage::new(
                    estimate_units(&dispatched),
                    estimate_units(&reply.content),
                );
                (usage, None)
            }
        };

        let cost = self
            .pricing
            .price(model, usage.input_tokens, usage.output_tokens);
        self.record(ctx, usage, cost, ctx.task_label.clone()).await;

        if let Some(memo) = &self.memo {
            if let Err(e) = memo
                .store(&ctx.request_text, &reply.content, &ctx.actor, usage, cost)
                .await
            {
                warn!(actor = %ctx.actor, error = %e, "failed to cache response");
            }
        }

        Ok(StageFlow::ShortCircuit(GatewayOutcome::Fresh {
            reply,
            usage,
            cost_usd: cost,
            usage_source,
        }))
    }
}
