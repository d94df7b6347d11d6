// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait for the external metered call (the LLM client the gateway wraps).

use async_trait::async_trait;

use crate::error::TollgateError;
use crate::types::{CallOptions, ChatMessage, ProviderReply};

/// An external, metered language-model call.
///
/// The gateway never interprets the reply content; it only reads usage out of
/// it. Errors returned here reach the gateway's caller unchanged.
#[async_trait]
pub trait CallProvider: Send + Sync + 'static {
    /// Model identifier used for pricing this provider's calls.
    fn model(&self) -> &str;

    /// Performs one call with the given messages and keyword options.
    async fn call(
        &self,
        messages: &[ChatMessage],
        options: &CallOptions,
    ) -> Result<ProviderReply, TollgateError>;
}
