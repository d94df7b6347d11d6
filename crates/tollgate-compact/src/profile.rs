// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role-specific substitution sets.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Known roles, matched against the context label in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RoleProfile {
    /// Plans and delegates research; steer toward strategy.
    Coordinator,
    /// Finds literature; steer toward precision.
    Searcher,
    /// Synthesizes findings.
    Analyzer,
}

impl RoleProfile {
    /// First role whose tag appears (case-insensitively) in `context_label`.
    pub fn detect(context_label: &str) -> Option<Self> {
        let label = context_label.to_lowercase();
        Self::iter().find(|role| label.contains(&role.to_string()))
    }

    pub fn substitutions(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Coordinator => &[
                ("detailed analysis", "strategic analysis"),
                ("comprehensive review", "focused review"),
            ],
            Self::Searcher => &[
                ("find all possible", "find key"),
                ("exhaustive search", "targeted search"),
            ],
            Self::Analyzer => &[("list everything", "synthesize key points")],
        }
    }
}
