// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Tollgate.
//!
//! This crate provides the error type, the value types exchanged with the
//! external call provider, and the [`CallProvider`] trait that the metered
//! call gateway wraps.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TollgateError;
pub use traits::CallProvider;
pub use types::{
    CallOptions, ChatMessage, PromptCompletionUsage, ProviderReply, Role, SessionId, TokenUsage,
    estimate_units, payload_text,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render() {
        let storage = TollgateError::Storage {
            source: Box::new(std::io::Error::other("disk full")),
        };
        assert_eq!(storage.to_string(), "storage error: disk full");
        assert!(storage.is_storage());

        let provider = TollgateError::provider("rate limited");
        assert_eq!(provider.to_string(), "provider error: rate limited");
        assert!(!provider.is_storage());
    }

    #[test]
    fn role_display_and_parse() {
        use std::str::FromStr;
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
    }

    #[test]
    fn payload_text_joins_messages() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("what is rust?"),
        ];
        assert_eq!(payload_text(&messages), "be brief\nwhat is rust?");
    }

    #[test]
    fn estimate_units_is_length_over_four_with_floor() {
        assert_eq!(estimate_units(""), 1);
        assert_eq!(estimate_units("abc"), 1);
        assert_eq!(estimate_units(&"x".repeat(400)), 100);
    }

    #[test]
    fn provider_reply_deserializes_without_usage() {
        let reply: ProviderReply = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(reply.content, "hi");
        assert!(reply.usage.is_none());
        assert!(reply.token_usage.is_none());
    }

    #[test]
    fn call_provider_is_object_safe() {
        fn _assert_dyn(_: &dyn CallProvider) {}
    }
}
