// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage recorder persisting one event per metered call to SQLite.
//!
//! Events are append-only. Every aggregate (session, day, per-actor window) is
//! a `SUM` over the `usage_events` table computed on demand, so concurrent
//! writers never race on a shared counter.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tollgate_config::model::CostConfig;
use tollgate_core::{SessionId, TokenUsage, TollgateError};
use tollgate_storage::{Database, day_bounds, format_timestamp, map_tr_err, parse_timestamp};

/// A single usage event representing one metered call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Unique event identifier (UUID v4).
    pub id: String,
    /// When the call completed (or failed).
    pub created_at: DateTime<Utc>,
    /// Logical agent that issued the call.
    pub actor: String,
    /// Process-lifetime session the call belongs to.
    pub session_id: String,
    /// Model the call was priced as.
    pub model: String,
    pub input_units: u32,
    pub output_units: u32,
    /// Calculated cost in USD.
    pub cost_usd: f64,
    /// Free-text description of the work, `FAILED: ...` for failed dispatches.
    pub task_label: String,
}

impl UsageEvent {
    /// Create a new event stamped with the current time.
    pub fn new(
        actor: impl Into<String>,
        session_id: &SessionId,
        model: impl Into<String>,
        usage: TokenUsage,
        cost_usd: f64,
        task_label: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            actor: actor.into(),
            session_id: session_id.to_string(),
            model: model.into(),
            input_units: usage.input_tokens,
            output_units: usage.output_tokens,
            cost_usd,
            task_label: task_label.into(),
        }
    }

    /// Same event with a different timestamp.
    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Summed cost for one actor over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCost {
    pub actor: String,
    pub cost_usd: f64,
}

/// Cost, limit and headroom for the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub cost: f64,
    pub budget: f64,
    pub remaining: f64,
}

/// Cost, limit and headroom for one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub cost: f64,
    pub budget: f64,
    pub remaining: f64,
}

/// Everything the `summary` report shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub session: SessionSummary,
    pub today: DailySummary,
    pub agent_breakdown: Vec<AgentCost>,
}

/// Generate a `session_<unix-seconds>_<short-uuid>` identifier.
pub fn generate_session_id() -> SessionId {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    SessionId(format!("session_{}_{}", Utc::now().timestamp(), &uuid[..8]))
}

/// Persistent usage recorder backed by SQLite.
///
/// One recorder is one session: the session id is fixed at construction.
pub struct UsageRecorder {
    db: Database,
    session_id: SessionId,
    session_budget_usd: f64,
    daily_budget_usd: f64,
    agent_window_hours: u32,
}

impl UsageRecorder {
    /// Create a recorder with a freshly generated session id.
    pub fn new(db: Database, config: &CostConfig) -> Self {
        Self::with_session(db, config, generate_session_id())
    }

    /// Create a recorder that attributes events to an existing session.
    pub fn with_session(db: Database, config: &CostConfig, session_id: SessionId) -> Self {
        info!(
            session_id = %session_id,
            session_budget_usd = config.session_budget_usd,
            daily_budget_usd = config.daily_budget_usd,
            "usage recorder initialized"
        );
        Self {
            db,
            session_id,
            session_budget_usd: config.session_budget_usd,
            daily_budget_usd: config.daily_budget_usd,
            agent_window_hours: config.agent_window_hours,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn session_budget(&self) -> f64 {
        self.session_budget_usd
    }

    pub fn daily_budget(&self) -> f64 {
        self.daily_budget_usd
    }

    /// Append one event, then warn if either budget is now exceeded.
    ///
    /// The threshold check is observational. It never fails the record.
    pub async fn record(&self, event: &UsageEvent) -> Result<(), TollgateError> {
        let row = event.clone();
        let created_at = format_timestamp(row.created_at);

        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO usage_events (id, created_at, actor, session_id, model, \
                     input_units, output_units, cost_usd, task_label) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        row.id,
                        created_at,
                        row.actor,
                        row.session_id,
                        row.model,
                        row.input_units,
                        row.output_units,
                        row.cost_usd,
                        row.task_label,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        info!(
            actor = %event.actor,
            session_id = %event.session_id,
            model = %event.model,
            input_units = event.input_units,
            output_units = event.output_units,
            cost_usd = event.cost_usd,
            "usage recorded"
        );

        self.check_budget_alerts(event.created_at.date_naive()).await;
        Ok(())
    }

    async fn check_budget_alerts(&self, date: NaiveDate) {
        match self.session_cost().await {
            Ok(cost) if cost > self.session_budget_usd => warn!(
                session_id = %self.session_id,
                session_cost = cost,
                session_budget = self.session_budget_usd,
                "session budget exceeded"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "session budget check failed"),
        }

        match self.daily_cost(date).await {
            Ok(cost) if cost > self.daily_budget_usd => warn!(
                date = %date,
                daily_cost = cost,
                daily_budget = self.daily_budget_usd,
                "daily budget exceeded"
            ),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "daily budget check failed"),
        }
    }

    /// Sum of costs for the current session.
    pub async fn session_cost(&self) -> Result<f64, TollgateError> {
        self.session_cost_for(&self.session_id).await
    }

    /// Sum of costs for any session.
    pub async fn session_cost_for(&self, session_id: &SessionId) -> Result<f64, TollgateError> {
        let session_id = session_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<f64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COALESCE(SUM(cost_usd), 0.0) FROM usage_events \
                     WHERE session_id = ?1",
                    rusqlite::params![session_id],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Sum of costs for events in `[date 00:00, date+1 00:00)` UTC.
    pub async fn daily_cost(&self, date: NaiveDate) -> Result<f64, TollgateError> {
        let (start, end) = day_bounds(date);
        self.db
            .connection()
            .call(move |conn| -> Result<f64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COALESCE(SUM(cost_usd), 0.0) FROM usage_events \
                     WHERE created_at >= ?1 AND created_at < ?2",
                    rusqlite::params![start, end],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
    }

    /// Sum of costs for the current UTC day.
    pub async fn today_cost(&self) -> Result<f64, TollgateError> {
        self.daily_cost(Utc::now().date_naive()).await
    }

    /// Per-actor cost over the trailing `window_hours`, highest first.
    pub async fn agent_costs(&self, window_hours: u32) -> Result<Vec<AgentCost>, TollgateError> {
        self.agent_costs_at(window_hours, Utc::now()).await
    }

    /// Per-actor cost over the `window_hours` preceding `now`, highest first.
    pub async fn agent_costs_at(
        &self,
        window_hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<AgentCost>, TollgateError> {
        let cutoff = format_timestamp(now - Duration::hours(i64::from(window_hours)));
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<AgentCost>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT actor, SUM(cost_usd) AS total FROM usage_events \
                     WHERE created_at >= ?1 \
                     GROUP BY actor ORDER BY total DESC, actor ASC",
                )?;
                let rows = stmt.query_map(rusqlite::params![cutoff], |row| {
                    Ok(AgentCost {
                        actor: row.get(0)?,
                        cost_usd: row.get(1)?,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    /// All events recorded for one session, oldest first.
    pub async fn session_events(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<UsageEvent>, TollgateError> {
        let session_id = session_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<UsageEvent>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, created_at, actor, session_id, model, input_units, \
                     output_units, cost_usd, task_label FROM usage_events \
                     WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(rusqlite::params![session_id], |row| {
                    let created_at: String = row.get(1)?;
                    Ok(UsageEvent {
                        id: row.get(0)?,
                        created_at: parse_timestamp(&created_at).ok_or_else(|| {
                            rusqlite::Error::FromSqlConversionFailure(
                                1,
                                rusqlite::types::Type::Text,
                                format!("malformed timestamp `{created_at}`").into(),
                            )
                        })?,
                        actor: row.get(2)?,
                        session_id: row.get(3)?,
                        model: row.get(4)?,
                        input_units: row.get(5)?,
                        output_units: row.get(6)?,
                        cost_usd: row.get(7)?,
                        task_label: row.get(8)?,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Session, today and per-actor figures in one snapshot.
    pub async fn summary(&self) -> Result<CostSummary, TollgateError> {
        let now = Utc::now();
        let today = now.date_naive();
        let session_cost = self.session_cost().await?;
        let daily_cost = self.daily_cost(today).await?;
        let agent_breakdown = self.agent_costs_at(self.agent_window_hours, now).await?;

        Ok(CostSummary {
            session: SessionSummary {
                session_id: self.session_id.to_string(),
                cost: session_cost,
                budget: self.session_budget_usd,
                remaining: (self.session_budget_usd - session_cost).max(0.0),
            },
            today: DailySummary {
                date: today,
                cost: daily_cost,
                budget: self.daily_budget_usd,
                remaining: (self.daily_budget_usd - daily_cost).max(0.0),
            },
            agent_breakdown,
        })
    }
}
