// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete metering pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite files and a
//! scripted mock provider. Tests are independent and order-insensitive.

use tollgate_core::{TokenUsage, TollgateError};
use tollgate_cost::{BudgetLevel, UsageEvent};
use tollgate_gateway::{CANCELLED_MESSAGE, GatewayOutcome};
use tollgate_test_utils::TestHarness;

// ---- Budget gate ----

#[tokio::test]
async fn critical_session_spend_cancels_without_dispatch() {
    let harness = TestHarness::builder()
        .with_session_budget(5.0)
        .build()
        .await
        .unwrap();

    let prior = UsageEvent::new(
        "coordinator",
        harness.recorder.session_id(),
        "anthropic/claude-sonnet-4-20250514",
        TokenUsage::new(1000, 1000),
        4.60,
        "plan",
    );
    harness.recorder.record(&prior).await.unwrap();

    let status = harness.gateway.budget_status().await.unwrap();
    assert_eq!(status.session_level, BudgetLevel::Critical);
    assert!(!status.should_continue());

    let outcome = harness.send("searcher", "find papers").await.unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(outcome.content(), CANCELLED_MESSAGE);
    assert_eq!(harness.provider.call_count(), 0);
    assert_eq!(harness.events().await.unwrap().len(), 1);
}

#[tokio::test]
async fn daily_overspend_alone_does_not_block() {
    let harness = TestHarness::builder()
        .with_session_budget(100.0)
        .with_daily_budget(1.0)
        .build()
        .await
        .unwrap();

    let prior = UsageEvent::new(
        "analyzer",
        harness.recorder.session_id(),
        "m",
        TokenUsage::new(10, 10),
        5.0,
        "",
    );
    harness.recorder.record(&prior).await.unwrap();

    let outcome = harness.send("analyzer", "summarize").await.unwrap();
    assert!(!outcome.is_cancelled());
    assert_eq!(harness.provider.call_count(), 1);
}

// ---- Failure accounting ----

#[tokio::test]
async fn provider_failure_is_metered_and_propagated() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.provider.push_failure("upstream unavailable").await;

    let err = harness.send("searcher", "query text here").await.unwrap_err();
    match err {
        TollgateError::Provider { message, .. } => assert_eq!(message, "upstream unavailable"),
        other => panic!("expected provider error, got {other:?}"),
    }

    let events = harness.events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].output_units, 0);
    assert!(events[0].task_label.starts_with("FAILED: "));
    assert_eq!(events[0].actor, "searcher");
}

// ---- Pricing through the gateway ----

#[tokio::test]
async fn reported_usage_is_priced_with_configured_rates() {
    let harness = TestHarness::builder()
        .with_session_budget(100.0)
        .with_model_rates("test-model", 3.0, 15.0)
        .build()
        .await
        .unwrap();
    harness
        .provider
        .push_reply("priced", TokenUsage::new(1000, 500))
        .await;

    let outcome = harness.send("analyzer", "price me").await.unwrap();
    match outcome {
        GatewayOutcome::Fresh { cost_usd, usage, .. } => {
            assert!((cost_usd - 10.5).abs() < 1e-9);
            assert_eq!(usage, TokenUsage::new(1000, 500));
        }
        other => panic!("expected fresh outcome, got {other:?}"),
    }

    let session_cost = harness.recorder.session_cost().await.unwrap();
    assert!((session_cost - 10.5).abs() < 1e-9);
}

// ---- Memo path ----

#[tokio::test]
async fn repeated_request_is_served_from_memo() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .provider
        .push_reply("Rust is a systems language.", TokenUsage::new(100, 50))
        .await;

    let first = harness.send("searcher", "What is Rust?").await.unwrap();
    assert!(matches!(first, GatewayOutcome::Fresh { .. }));

    let second = harness.send("searcher", "  what is rust?  ").await.unwrap();
    assert!(second.is_cached());
    assert_eq!(second.content(), "Rust is a systems language.");

    assert_eq!(harness.provider.call_count(), 1);
    assert_eq!(harness.events().await.unwrap().len(), 1);

    let stats = harness.gateway.cache_stats().await.unwrap().unwrap();
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.per_actor.len(), 1);
    assert_eq!(stats.per_actor[0].actor, "searcher");
}

#[tokio::test]
async fn memo_is_scoped_per_actor() {
    let harness = TestHarness::builder().build().await.unwrap();

    harness.send("searcher", "same question").await.unwrap();
    let other = harness.send("analyzer", "same question").await.unwrap();

    assert!(!other.is_cached());
    assert_eq!(harness.provider.call_count(), 2);
}

#[tokio::test]
async fn disabled_memo_always_dispatches() {
    let harness = TestHarness::builder()
        .with_memo(false)
        .build()
        .await
        .unwrap();
    assert!(!harness.gateway.stage_names().contains(&"cache"));

    harness.send("searcher", "again").await.unwrap();
    harness.send("searcher", "again").await.unwrap();

    assert_eq!(harness.provider.call_count(), 2);
    assert!(harness.gateway.cache_stats().await.unwrap().is_none());
}

// ---- Compaction ----

#[tokio::test]
async fn compaction_rewrites_dispatched_text() {
    let harness = TestHarness::builder().build().await.unwrap();

    harness
        .send("coordinator", "please make sure to cite every source")
        .await
        .unwrap();

    let dispatched = harness.provider.dispatched().await;
    assert_eq!(dispatched.len(), 1);
    assert!(dispatched[0].contains("ensure"));
    assert!(!dispatched[0].contains("please make sure to"));
}

#[tokio::test]
async fn compaction_can_be_disabled() {
    let harness = TestHarness::builder()
        .with_compaction(false)
        .build()
        .await
        .unwrap();

    harness
        .send("coordinator", "please make sure to cite every source")
        .await
        .unwrap();

    let dispatched = harness.provider.dispatched().await;
    assert_eq!(dispatched[0], "please make sure to cite every source");
}

// ---- Reporting queries ----

#[tokio::test]
async fn cost_summary_breaks_down_by_actor() {
    let harness = TestHarness::builder()
        .with_memo(false)
        .build()
        .await
        .unwrap();
    harness
        .provider
        .push_reply("a", TokenUsage::new(1000, 1000))
        .await;
    harness
        .provider
        .push_reply("b", TokenUsage::new(100, 100))
        .await;

    harness.send("analyzer", "big job").await.unwrap();
    harness.send("searcher", "small job").await.unwrap();

    let summary = harness.gateway.cost_summary().await.unwrap();
    assert_eq!(summary.agent_breakdown.len(), 2);
    assert_eq!(summary.agent_breakdown[0].actor, "analyzer");
    assert!(summary.session.cost > 0.0);
    assert!((summary.session.cost - summary.today.cost).abs() < 1e-9);
}
