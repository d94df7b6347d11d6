// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common value types shared between the metering crates and their callers.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier for one process lifetime of metering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit counts consumed (input) and produced (output) by one metered call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Usage as reported by OpenAI-style APIs (`prompt_tokens` / `completion_tokens`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCompletionUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Role of a message in a chat request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in the payload sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Keyword options forwarded verbatim to the provider (temperature, max_tokens, ...).
pub type CallOptions = serde_json::Map<String, serde_json::Value>;

/// Raw result of one provider call.
///
/// Providers differ in how (and whether) they report usage, so every shape
/// the gateway knows how to read is optional here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply {
    /// Generated text.
    pub content: String,
    /// Usage in `input_tokens` / `output_tokens` form.
    #[serde(default)]
    pub usage: Option<TokenUsage>,
    /// Usage in `prompt_tokens` / `completion_tokens` form.
    #[serde(default)]
    pub token_usage: Option<PromptCompletionUsage>,
    /// Any extra provider payload, kept as JSON.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl ProviderReply {
    /// A reply carrying only text, with no usage information at all.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Join message contents into the single text the meter works with.
pub fn payload_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Character-count heuristic for unit estimation (4 chars ~ 1 unit, minimum 1).
pub fn estimate_units(text: &str) -> u32 {
    let units = text.chars().count() / 4;
    u32::try_from(units).unwrap_or(u32::MAX).max(1)
}
