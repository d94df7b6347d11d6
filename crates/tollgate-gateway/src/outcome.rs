// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and result types for one metered call.

use serde::{Deserialize, Serialize};

use tollgate_core::{CallOptions, ChatMessage, ProviderReply, TokenUsage};

use crate::usage::UsageExtractor;

/// Text callers see when the budget gate denied a call.
pub const CANCELLED_MESSAGE: &str = "Operation cancelled due to budget constraints.";

/// One unit of work submitted to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Logical agent issuing the call; unit of cost and memo attribution.
    pub actor: String,
    /// Free-text description stored with the usage event.
    pub task_label: String,
    pub messages: Vec<ChatMessage>,
    /// Forwarded to the provider unchanged.
    pub options: CallOptions,
}

impl CallRequest {
    pub fn new(actor: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            actor: actor.into(),
            task_label: String::new(),
            messages,
            options: CallOptions::new(),
        }
    }

    /// A request carrying a single user message.
    pub fn user(actor: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(actor, vec![ChatMessage::user(text)])
    }

    pub fn with_label(mut self, task_label: impl Into<String>) -> Self {
        self.task_label = task_label.into();
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }
}

/// What the gateway returns for a call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome {
    /// The provider was called and the call was metered.
    Fresh {
        reply: ProviderReply,
        usage: TokenUsage,
        cost_usd: f64,
        /// Extractor that supplied `usage`; `None` when it was estimated.
        usage_source: Option<UsageExtractor>,
    },
    /// Served from the memo. Nothing was dispatched or recorded.
    Cached { content: String, cost_saved: f64 },
    /// Denied by the budget gate. Nothing was dispatched or recorded.
    Cancelled { recommendations: Vec<String> },
}

impl GatewayOutcome {
    /// Response text, or [`CANCELLED_MESSAGE`] for a denied call.
    pub fn content(&self) -> &str {
        match self {
            Self::Fresh { reply, .. } => &reply.content,
            Self::Cached { content, .. } => content,
            Self::Cancelled { .. } => CANCELLED_MESSAGE,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached { .. })
    }
}
