// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Tollgate.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. The usage ledger and
//! the response memo each open their own [`Database`].

pub mod database;
pub mod migrations;
pub mod timestamp;

pub use database::{Database, map_tr_err};
pub use timestamp::{day_bounds, format_timestamp, parse_timestamp};
