// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The compaction pipeline.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::profile::RoleProfile;

/// Literal substitutions applied to every request, in order.
const REDUNDANT_PHRASES: &[(&str, &str)] = &[
    ("comprehensive and detailed", "comprehensive"),
    ("analyze and examine", "analyze"),
    ("identify and find", "identify"),
    ("research and investigate", "research"),
    ("please make sure to", "ensure"),
    ("it is important to", ""),
    ("you should focus on", "focus on"),
];

const EXAMPLE_MARKERS: &[(&str, &str)] = &[("For example:", "e.g."), ("Such as:", "e.g.")];

/// Result of compacting one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compaction {
    pub text: String,
    /// `(original chars - compacted chars) / 4`, never negative.
    pub units_saved: u32,
}

/// Stateless text compactor.
#[derive(Debug, Clone, Default)]
pub struct PromptCompactor;

impl PromptCompactor {
    pub fn new() -> Self {
        Self
    }

    /// Compact `text` for the role named in `context_label`.
    ///
    /// The pipeline is repeated until the text stops changing, so compacting
    /// already-compacted text is a no-op.
    pub fn compact(&self, text: &str, context_label: &str) -> Compaction {
        let role = RoleProfile::detect(context_label);
        // Every redundant phrase shortens the text and no role rule output
        // contains a rule input, so the passes reach a fixed point.
        let mut current = text.to_string();
        loop {
            let next = run_pass(&current, role);
            if next == current {
                break;
            }
            current = next;
        }

        let original_len = text.chars().count();
        let compacted_len = current.chars().count();
        let units_saved =
            u32::try_from(original_len.saturating_sub(compacted_len) / 4).unwrap_or(u32::MAX);

        debug!(
            role = ?role,
            original_len,
            compacted_len,
            units_saved,
            "prompt compacted"
        );

        Compaction {
            text: current,
            units_saved,
        }
    }
}

fn run_pass(text: &str, role: Option<RoleProfile>) -> String {
    let mut out = apply(text, REDUNDANT_PHRASES);
    if let Some(role) = role {
        out = apply(&out, role.substitutions());
    }
    compress_examples(&out)
}

fn apply(text: &str, rules: &[(&str, &str)]) -> String {
    rules
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Shorten example markers on bullet lines that carry an example.
fn compress_examples(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.trim_start().starts_with("- ") && line.to_lowercase().contains("example:") {
                apply(line, EXAMPLE_MARKERS)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
