// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response memoization for Tollgate.
//!
//! A [`ResponseMemo`] maps a fingerprint of (actor, normalized request) to the
//! response a previous call produced and the cost that call incurred. Entries
//! expire a fixed time after creation; hits do not extend their life.

pub mod memo;

pub use memo::{ActorSavings, MemoHit, MemoStats, ResponseMemo, fingerprint, normalize};
