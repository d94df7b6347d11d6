// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tollgate - metering, budgeting and memoization for paid external calls.
//!
//! This binary is the operator's view of the two stores: spend reports,
//! budget checks, pre-flight estimates and memo maintenance.

mod report;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tollgate_compact::PromptCompactor;
use tollgate_config::TollgateConfig;
use tollgate_core::{SessionId, TollgateError};
use tollgate_cost::{BudgetGuard, PricingTable, UsageRecorder, suggest_optimizations};
use tollgate_memo::ResponseMemo;
use tollgate_storage::Database;

use crate::report::{BudgetReport, Output};

/// Tollgate - metering, budgeting and memoization for paid external calls.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of a formatted report.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show session, daily and per-agent spend.
    Summary {
        /// Report on an existing session instead of a fresh one.
        #[arg(long)]
        session: Option<String>,
    },
    /// Classify spend against both limits and show recommendations.
    Budget {
        #[arg(long)]
        session: Option<String>,
    },
    /// Predict the cost of a request before sending it.
    Estimate {
        /// Actor the request would be attributed to.
        #[arg(long)]
        actor: String,
        /// Request text. Read from stdin when omitted.
        #[arg(long)]
        text: Option<String>,
    },
    /// Inspect or maintain the response memo.
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Compact text read from stdin.
    Compact {
        /// Context label selecting the role profile (e.g. "searcher").
        #[arg(long, default_value = "")]
        context: String,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Show entry counts and savings.
    Stats,
    /// Delete entries older than the freshness horizon.
    Evict,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tollgate_config::load_and_validate_path(path),
        None => tollgate_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tollgate_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    let output = Output::detect(cli.json, cli.plain);
    if let Err(e) = run(cli.command, &config, output).await {
        eprintln!("tollgate: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &TollgateConfig, output: Output) -> Result<(), TollgateError> {
    match command {
        Commands::Summary { session } => {
            let recorder = open_recorder(config, session).await?;
            let summary = recorder.summary().await?;
            report::print_summary(&summary, output);
        }
        Commands::Budget { session } => {
            let guard = open_guard(config, session).await?;
            let authorization = guard.authorize().await?;
            let suggestions = suggest_optimizations(&authorization.status)
                .into_iter()
                .map(String::from)
                .collect();
            report::print_budget(
                &BudgetReport {
                    authorization,
                    suggestions,
                },
                output,
            );
        }
        Commands::Estimate { actor, text } => {
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };
            let guard = open_guard(config, None).await?;
            let prediction = guard.predict(&text, &actor).await?;
            report::print_prediction(&actor, &prediction, output);
        }
        Commands::Cache { action } => {
            let db = Database::open_with(&config.storage.memo_database_path, config.storage.wal_mode)
                .await?;
            let memo = ResponseMemo::new(db.clone(), &config.memo);
            match action {
                CacheCommands::Stats => {
                    let stats = memo.stats().await?;
                    report::print_cache_stats(&stats, output);
                }
                CacheCommands::Evict => {
                    let evicted = evict_cache(&db, &memo, config.storage.wal_mode).await?;
                    report::print_evicted(evicted, memo.duration_hours(), output);
                }
            }
        }
        Commands::Compact { context } => {
            let text = read_stdin()?;
            let compaction = PromptCompactor::new().compact(&text, &context);
            report::print_compaction(&compaction, output);
        }
    }
    Ok(())
}

async fn open_recorder(
    config: &TollgateConfig,
    session: Option<String>,
) -> Result<UsageRecorder, TollgateError> {
    let db = Database::open_with(
        &config.storage.usage_database_path,
        config.storage.wal_mode,
    )
    .await?;
    Ok(match session {
        Some(id) => UsageRecorder::with_session(db, &config.cost, SessionId(id)),
        None => UsageRecorder::new(db, &config.cost),
    })
}

async fn open_guard(
    config: &TollgateConfig,
    session: Option<String>,
) -> Result<BudgetGuard, TollgateError> {
    let recorder = open_recorder(config, session).await?;
    let pricing = PricingTable::from_config(&config.cost);
    Ok(BudgetGuard::new(Arc::new(recorder), Arc::new(pricing)))
}

/// Drop expired memo entries, then fold the WAL back into the database file.
async fn evict_cache(
    db: &Database,
    memo: &ResponseMemo,
    wal_mode: bool,
) -> Result<usize, TollgateError> {
    let evicted = memo.evict_expired().await?;
    if wal_mode {
        db.checkpoint().await?;
    }
    Ok(evicted)
}

fn read_stdin() -> Result<String, TollgateError> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|e| TollgateError::Internal(format!("failed to read stdin: {e}")))?;
    Ok(text)
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tollgate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_estimate_with_global_json_flag() {
        let cli = Cli::try_parse_from([
            "tollgate", "estimate", "--actor", "searcher", "--text", "hi", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Estimate { actor, text } => {
                assert_eq!(actor, "searcher");
                assert_eq!(text.as_deref(), Some("hi"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_cache_evict() {
        let cli = Cli::try_parse_from(["tollgate", "cache", "evict"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheCommands::Evict
            }
        ));
    }

    #[tokio::test]
    async fn cache_evict_truncates_the_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.db");
        let db = Database::open_with(path.to_str().unwrap(), true).await.unwrap();
        let memo = ResponseMemo::with_duration_hours(db.clone(), 24);
        memo.store("q", "a", "searcher", tollgate_core::TokenUsage::new(1, 1), 0.01)
            .await
            .unwrap();

        let wal = dir.path().join("memo.db-wal");
        assert!(std::fs::metadata(&wal).unwrap().len() > 0);

        let evicted = evict_cache(&db, &memo, true).await.unwrap();
        assert_eq!(evicted, 0);
        assert_eq!(std::fs::metadata(&wal).unwrap().len(), 0);
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = tollgate_config::load_and_validate_str("").unwrap();
        assert_eq!(config.memo.duration_hours, 24);
    }
}
