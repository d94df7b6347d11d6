// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tollgate integration tests.
//!
//! Provides a scripted provider and a harness that wires the full gateway
//! over temp SQLite files, for fast, deterministic tests without external
//! services.
//!
//! # Components
//!
//! - [`MockProvider`] - Scripted call provider with dispatch capture
//! - [`TestHarness`] - Gateway, recorder and memo over temp databases

pub mod harness;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockProvider, MockReply};
