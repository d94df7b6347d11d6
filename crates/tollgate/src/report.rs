// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report rendering for the CLI.
//!
//! Every command prints either pretty JSON (`--json`) or a formatted block.
//! Colors are used only when stdout is a terminal and `--plain` is not set.

use std::io::IsTerminal;

use colored::Colorize;
use serde::Serialize;
use tollgate_compact::Compaction;
use tollgate_cost::{Authorization, BudgetLevel, CostPrediction, CostSummary};
use tollgate_memo::MemoStats;

/// How a report should be printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Json,
    Text { color: bool },
}

impl Output {
    pub fn detect(json: bool, plain: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text {
                color: !plain && std::io::stdout().is_terminal(),
            }
        }
    }
}

/// `budget` output: the gate decision plus optimization suggestions.
#[derive(Debug, Serialize)]
pub struct BudgetReport {
    #[serde(flatten)]
    pub authorization: Authorization,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EvictReport {
    evicted: usize,
    duration_hours: u32,
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn header(title: &str) {
    println!();
    println!("  {title}");
    println!("  {}", "-".repeat(35));
}

fn level_label(level: BudgetLevel, color: bool) -> String {
    let label = level.to_string();
    if !color {
        return label;
    }
    match level {
        BudgetLevel::Low => label.green().to_string(),
        BudgetLevel::Moderate => label.cyan().to_string(),
        BudgetLevel::Warning => label.yellow().to_string(),
        BudgetLevel::Critical | BudgetLevel::Exceeded => label.red().bold().to_string(),
    }
}

pub fn print_summary(summary: &CostSummary, output: Output) {
    let Output::Text { .. } = output else {
        print_json(summary);
        return;
    };

    header("tollgate summary");
    println!("    Session:  {}", summary.session.session_id);
    println!(
        "    Spent:    ${:.4} of ${:.2} (${:.4} remaining)",
        summary.session.cost, summary.session.budget, summary.session.remaining
    );
    println!(
        "    Today:    ${:.4} of ${:.2} (${:.4} remaining, {})",
        summary.today.cost, summary.today.budget, summary.today.remaining, summary.today.date
    );

    if summary.agent_breakdown.is_empty() {
        println!("    Agents:   no calls recorded");
    } else {
        println!("    Agents:");
        for agent in &summary.agent_breakdown {
            println!("      {:<20} ${:.4}", agent.actor, agent.cost_usd);
        }
    }
    println!();
}

pub fn print_budget(report: &BudgetReport, output: Output) {
    let Output::Text { color } = output else {
        print_json(report);
        return;
    };

    let status = &report.authorization.status;
    header("tollgate budget");
    println!(
        "    Session:  ${:.4} / ${:.2} ({:.1}%) {}",
        status.session_cost,
        status.session_limit,
        status.session_ratio * 100.0,
        level_label(status.session_level, color)
    );
    println!(
        "    Daily:    ${:.4} / ${:.2} ({:.1}%) {}",
        status.daily_cost,
        status.daily_limit,
        status.daily_ratio * 100.0,
        level_label(status.daily_level, color)
    );

    let decision = if report.authorization.should_continue {
        "calls allowed"
    } else {
        "calls blocked"
    };
    if color {
        let decision = if report.authorization.should_continue {
            decision.green()
        } else {
            decision.red()
        };
        println!("    Gate:     {decision}");
    } else {
        println!("    Gate:     {decision}");
    }

    for recommendation in &report.authorization.recommendations {
        println!("    - {recommendation}");
    }
    if !report.suggestions.is_empty() {
        println!();
        println!("  Suggestions:");
        for suggestion in &report.suggestions {
            println!("    - {suggestion}");
        }
    }
    println!();
}

pub fn print_prediction(actor: &str, prediction: &CostPrediction, output: Output) {
    let Output::Text { .. } = output else {
        print_json(prediction);
        return;
    };

    header("tollgate estimate");
    println!("    Actor:    {actor}");
    println!(
        "    Units:    {} in / {} out",
        prediction.estimated_input_units, prediction.estimated_output_units
    );
    println!(
        "    Cost:     ${:.6} ({} confidence)",
        prediction.estimated_cost, prediction.confidence
    );
    println!();
}

pub fn print_cache_stats(stats: &MemoStats, output: Output) {
    let Output::Text { .. } = output else {
        print_json(stats);
        return;
    };

    header("tollgate cache");
    println!("    Entries:  {} ({} in the last 24h)", stats.total_entries, stats.entries_last_24h);
    println!("    Saved:    ${:.4}", stats.total_cost_saved);
    println!("    Horizon:  {}h", stats.duration_hours);
    for actor in &stats.per_actor {
        println!(
            "      {:<20} {:>5} hits  ${:.4}",
            actor.actor, actor.hits, actor.saved
        );
    }
    println!();
}

pub fn print_evicted(evicted: usize, duration_hours: u32, output: Output) {
    let Output::Text { .. } = output else {
        print_json(&EvictReport {
            evicted,
            duration_hours,
        });
        return;
    };
    println!("tollgate: evicted {evicted} entries older than {duration_hours}h");
}

/// Compacted text goes to stdout unadorned so the command can sit in a pipe.
pub fn print_compaction(compaction: &Compaction, output: Output) {
    match output {
        Output::Json => print_json(compaction),
        Output::Text { .. } => {
            print!("{}", compaction.text);
            eprintln!("tollgate: saved ~{} units", compaction.units_saved);
        }
    }
}
