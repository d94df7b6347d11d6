// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metered call gateway for Tollgate.
//!
//! Every outbound provider call runs through a fixed stage pipeline:
//! memo lookup, budget gate, prompt compaction, then dispatch with usage
//! extraction, pricing, recording and memo store.

pub mod gateway;
pub mod outcome;
pub mod stage;
pub mod usage;

pub use gateway::{GatewayBuilder, MeteredCallGateway};
pub use outcome::{CANCELLED_MESSAGE, CallRequest, GatewayOutcome};
pub use stage::{CallContext, Stage, StageFlow};
pub use usage::{UsageExtractor, extract_usage};
