// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt compaction for Tollgate.
//!
//! Shrinks a request before it is sent using only literal phrase
//! substitutions, so keywords are never rewritten. Three passes run in order:
//! 1. Redundant wording (paired synonyms, filler)
//! 2. A role profile chosen from the context label
//! 3. Enumerated example lines (`- For example: ...` becomes `- e.g. ...`)

pub mod compactor;
pub mod profile;

pub use compactor::{Compaction, PromptCompactor};
pub use profile::RoleProfile;
