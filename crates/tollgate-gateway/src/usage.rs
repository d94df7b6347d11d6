// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage extraction from provider replies.
//!
//! Providers report usage in several shapes, or not at all. Each
//! [`UsageExtractor`] reads one shape; the gateway tries them in order and the
//! first hit wins. When none applies the caller estimates from text length.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use strum::Display;

use tollgate_core::{ProviderReply, TokenUsage};

static INPUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:input|prompt)_tokens["']?\s*[:=]\s*(\d+)"#).unwrap()
});

static OUTPUT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:output|completion)_tokens["']?\s*[:=]\s*(\d+)"#).unwrap()
});

/// One way of reading unit counts out of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UsageExtractor {
    /// `reply.usage` (`input_tokens` / `output_tokens`).
    Structured,
    /// `reply.token_usage` (`prompt_tokens` / `completion_tokens`).
    PromptCompletion,
    /// A `usage` object, or top-level counts, in `reply.metadata`.
    JsonMetadata,
    /// `input_tokens: N` style text anywhere in the serialized reply.
    TextPattern,
}

impl UsageExtractor {
    /// The order the gateway tries extractors in.
    pub const DEFAULT_ORDER: [Self; 4] = [
        Self::Structured,
        Self::PromptCompletion,
        Self::JsonMetadata,
        Self::TextPattern,
    ];

    pub fn extract(self, reply: &ProviderReply) -> Option<TokenUsage> {
        match self {
            Self::Structured => reply.usage,
            Self::PromptCompletion => reply
                .token_usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            Self::JsonMetadata => reply.metadata.as_ref().and_then(from_json),
            Self::TextPattern => {
                let text = serde_json::to_string(reply).unwrap_or_else(|_| reply.content.clone());
                from_text(&text)
            }
        }
    }
}

/// First successful extractor and its reading, or `None` if every one fails.
pub fn extract_usage(
    extractors: &[UsageExtractor],
    reply: &ProviderReply,
) -> Option<(UsageExtractor, TokenUsage)> {
    extractors
        .iter()
        .find_map(|extractor| extractor.extract(reply).map(|usage| (*extractor, usage)))
}

fn from_json(metadata: &Value) -> Option<TokenUsage> {
    let object = metadata.get("usage").unwrap_or(metadata);
    let input = count(object, "input_tokens").or_else(|| count(object, "prompt_tokens"))?;
    let output = count(object, "output_tokens").or_else(|| count(object, "completion_tokens"))?;
    Some(TokenUsage::new(input, output))
}

fn count(object: &Value, key: &str) -> Option<u32> {
    object
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn from_text(text: &str) -> Option<TokenUsage> {
    let capture = |pattern: &Regex| -> Option<u32> {
        pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    };
    Some(TokenUsage::new(
        capture(&INPUT_PATTERN)?,
        capture(&OUTPUT_PATTERN)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tollgate_core::PromptCompletionUsage;

    fn first(reply: &ProviderReply) -> Option<(UsageExtractor, TokenUsage)> {
        extract_usage(&UsageExtractor::DEFAULT_ORDER, reply)
    }

    #[test]
    fn structured_usage_wins() {
        let reply = ProviderReply {
            content: "ok".into(),
            usage: Some(TokenUsage::new(10, 20)),
            token_usage: Some(PromptCompletionUsage {
                prompt_tokens: 1,
                completion_tokens: 2,
            }),
            metadata: None,
        };
        assert_eq!(
            first(&reply),
            Some((UsageExtractor::Structured, TokenUsage::new(10, 20)))
        );
    }

    #[test]
    fn prompt_completion_form() {
        let reply = ProviderReply {
            content: "ok".into(),
            token_usage: Some(PromptCompletionUsage {
                prompt_tokens: 7,
                completion_tokens: 9,
            }),
            ..ProviderReply::default()
        };
        assert_eq!(
            first(&reply),
            Some((UsageExtractor::PromptCompletion, TokenUsage::new(7, 9)))
        );
    }

    #[test]
    fn metadata_usage_object() {
        let reply = ProviderReply {
            content: "ok".into(),
            metadata: Some(json!({"id": "r1", "usage": {"prompt_tokens": 30, "completion_tokens": 40}})),
            ..ProviderReply::default()
        };
        assert_eq!(
            first(&reply),
            Some((UsageExtractor::JsonMetadata, TokenUsage::new(30, 40)))
        );
    }

    #[test]
    fn metadata_top_level_counts() {
        let reply = ProviderReply {
            content: "ok".into(),
            metadata: Some(json!({"input_tokens": 5, "output_tokens": 6})),
            ..ProviderReply::default()
        };
        assert_eq!(
            UsageExtractor::JsonMetadata.extract(&reply),
            Some(TokenUsage::new(5, 6))
        );
    }

    #[test]
    fn metadata_with_partial_counts_falls_through() {
        let reply = ProviderReply {
            content: "ok".into(),
            metadata: Some(json!({"input_tokens": 5})),
            ..ProviderReply::default()
        };
        assert_eq!(UsageExtractor::JsonMetadata.extract(&reply), None);
        assert_eq!(first(&reply), None);
    }

    #[test]
    fn text_pattern_in_content() {
        let reply = ProviderReply::text("done (input_tokens=120, output_tokens: 45)");
        assert_eq!(
            first(&reply),
            Some((UsageExtractor::TextPattern, TokenUsage::new(120, 45)))
        );
    }

    #[test]
    fn plain_text_has_no_usage() {
        assert_eq!(first(&ProviderReply::text("just an answer")), None);
    }

    #[test]
    fn custom_order_is_respected() {
        let reply = ProviderReply {
            content: "prompt_tokens=1 completion_tokens=2".into(),
            usage: Some(TokenUsage::new(10, 20)),
            ..ProviderReply::default()
        };
        let order = [UsageExtractor::TextPattern, UsageExtractor::Structured];
        assert_eq!(
            extract_usage(&order, &reply),
            Some((UsageExtractor::TextPattern, TokenUsage::new(1, 2)))
        );
    }
}
