// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock call provider for deterministic testing.
//!
//! `MockProvider` implements `CallProvider` with a FIFO script of replies and
//! failures, and records every payload it was asked to dispatch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tollgate_core::{
    CallOptions, CallProvider, ChatMessage, ProviderReply, TokenUsage, TollgateError,
    payload_text,
};

/// One scripted provider result.
#[derive(Debug, Clone)]
pub enum MockReply {
    Reply(ProviderReply),
    Fail(String),
}

/// A mock provider that pops scripted results.
///
/// When the script is empty, a default "mock response" reply reporting 10
/// input and 20 output units is returned.
pub struct MockProvider {
    model: String,
    script: Arc<Mutex<VecDeque<MockReply>>>,
    dispatched: Arc<Mutex<Vec<String>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
            dispatched: Arc::new(Mutex::new(Vec::new())),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock provider pre-loaded with the given script.
    pub fn with_script(model: impl Into<String>, script: Vec<MockReply>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::from(script))),
            ..Self::new(model)
        }
    }

    /// Queue a reply with reported usage.
    pub async fn push_reply(&self, content: &str, usage: TokenUsage) {
        self.push(MockReply::Reply(ProviderReply::text(content).with_usage(usage)))
            .await;
    }

    /// Queue a reply that reports no usage at all.
    pub async fn push_text(&self, content: &str) {
        self.push(MockReply::Reply(ProviderReply::text(content))).await;
    }

    /// Queue a provider failure.
    pub async fn push_failure(&self, message: &str) {
        self.push(MockReply::Fail(message.to_string())).await;
    }

    pub async fn push(&self, reply: MockReply) {
        self.script.lock().await.push_back(reply);
    }

    /// Number of times `call` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Joined payload text of every dispatched call, in order.
    pub async fn dispatched(&self) -> Vec<String> {
        self.dispatched.lock().await.clone()
    }
}

#[async_trait]
impl CallProvider for MockProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn call(
        &self,
        messages: &[ChatMessage],
        _options: &CallOptions,
    ) -> Result<ProviderReply, TollgateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.dispatched.lock().await.push(payload_text(messages));

        let next = self.script.lock().await.pop_front();
        match next {
            Some(MockReply::Reply(reply)) => Ok(reply),
            Some(MockReply::Fail(message)) => Err(TollgateError::provider(message)),
            None => Ok(ProviderReply::text("mock response").with_usage(TokenUsage::new(10, 20))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_response_when_script_empty() {
        let provider = MockProvider::new("test-model");
        let reply = provider
            .call(&[ChatMessage::user("hi")], &CallOptions::new())
            .await
            .unwrap();
        assert_eq!(reply.content, "mock response");
        assert_eq!(reply.usage, Some(TokenUsage::new(10, 20)));
    }

    #[tokio::test]
    async fn scripted_results_returned_in_order() {
        let provider = MockProvider::with_script(
            "test-model",
            vec![
                MockReply::Reply(ProviderReply::text("first")),
                MockReply::Fail("boom".to_string()),
            ],
        );
        provider.push_text("third").await;
        let messages = [ChatMessage::user("q")];
        let options = CallOptions::new();
        let call = || provider.call(&messages, &options);

        assert_eq!(call().await.unwrap().content, "first");
        assert_eq!(
            call().await.unwrap_err().to_string(),
            "provider error: boom"
        );
        assert_eq!(call().await.unwrap().content, "third");
        assert_eq!(call().await.unwrap().content, "mock response");
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn payloads_are_captured() {
        let provider = MockProvider::new("m");
        provider
            .call(
                &[ChatMessage::system("sys"), ChatMessage::user("body")],
                &CallOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(provider.dispatched().await, vec!["sys\nbody"]);
        assert_eq!(provider.model(), "m");
    }
}
