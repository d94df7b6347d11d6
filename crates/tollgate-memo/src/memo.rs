// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed response memo with a fixed freshness horizon.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use tollgate_config::model::MemoConfig;
use tollgate_core::{TokenUsage, TollgateError};
use tollgate_storage::{Database, format_timestamp, map_tr_err};

/// Stored request text is cut to this many characters; the fingerprint is not.
const REQUEST_TEXT_LIMIT: usize = 500;

/// Window for `entries_last_24h` in [`MemoStats`].
const RECENT_WINDOW_HOURS: i64 = 24;

/// Trim and lowercase. Requests that differ only in case or surrounding
/// whitespace share one entry.
pub fn normalize(request_text: &str) -> String {
    request_text.trim().to_lowercase()
}

/// Hex SHA-256 of the length-prefixed actor, `:` and the normalized request.
///
/// The big-endian actor length keeps `("b:c", "a")` and `("c", "a:b")` apart.
pub fn fingerprint(request_text: &str, actor: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((actor.len() as u64).to_be_bytes());
    hasher.update(actor.as_bytes());
    hasher.update(b":");
    hasher.update(normalize(request_text).as_bytes());
    hex::encode(hasher.finalize())
}

/// A fresh memo entry returned by a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoHit {
    pub response_text: String,
    /// Cost the original call incurred; what this reuse avoided.
    pub cost_saved: f64,
    /// Reuses of this entry including this one.
    pub hit_count: u32,
}

/// Reuse totals for one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSavings {
    pub actor: String,
    pub hits: u64,
    pub saved: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoStats {
    pub total_entries: u64,
    /// Sum over entries of `(hit_count - 1) * cost_saved`.
    pub total_cost_saved: f64,
    /// Actors with at least one reuse, highest saving first.
    pub per_actor: Vec<ActorSavings>,
    pub entries_last_24h: u64,
    pub duration_hours: u32,
}

/// Durable map from (actor, normalized request) to a previous response.
#[derive(Clone)]
pub struct ResponseMemo {
    db: Database,
    duration_hours: u32,
}

impl ResponseMemo {
    pub fn new(db: Database, config: &MemoConfig) -> Self {
        Self::with_duration_hours(db, config.duration_hours)
    }

    pub fn with_duration_hours(db: Database, duration_hours: u32) -> Self {
        Self { db, duration_hours }
    }

    pub fn duration_hours(&self) -> u32 {
        self.duration_hours
    }

    fn horizon(&self) -> Duration {
        Duration::hours(i64::from(self.duration_hours))
    }

    /// Look up a fresh response for `request_text` issued by `actor`.
    pub async fn lookup(
        &self,
        request_text: &str,
        actor: &str,
    ) -> Result<Option<MemoHit>, TollgateError> {
        self.lookup_at(request_text, actor, Utc::now()).await
    }

    /// Lookup as of `now`. An entry is fresh while its age is below the horizon.
    ///
    /// The freshness check and the hit-count increment are one statement.
    pub async fn lookup_at(
        &self,
        request_text: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<MemoHit>, TollgateError> {
        let key = fingerprint(request_text, actor);
        let owner = actor.to_string();
        let cutoff = format_timestamp(now - self.horizon());

        let hit = self
            .db
            .connection()
            .call(move |conn| -> Result<Option<MemoHit>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "UPDATE response_cache SET hit_count = hit_count + 1 \
                     WHERE fingerprint = ?1 AND actor = ?2 AND created_at > ?3 \
                     RETURNING response_text, cost_saved, hit_count",
                )?;
                let mut rows = stmt.query(rusqlite::params![key, owner, cutoff])?;
                match rows.next()? {
                    Some(row) => Ok(Some(MemoHit {
                        response_text: row.get(0)?,
                        cost_saved: row.get(1)?,
                        hit_count: row.get(2)?,
                    })),
                    None => Ok(None),
                }
            })
            .await
            .map_err(map_tr_err)?;

        match &hit {
            Some(hit) => info!(
                actor = %actor,
                cost_saved = hit.cost_saved,
                hit_count = hit.hit_count,
                "cache hit"
            ),
            None => debug!(actor = %actor, "cache miss"),
        }
        Ok(hit)
    }

    /// Insert or fully replace the entry for (`actor`, `request_text`).
    pub async fn store(
        &self,
        request_text: &str,
        response_text: &str,
        actor: &str,
        usage: TokenUsage,
        cost: f64,
    ) -> Result<(), TollgateError> {
        self.store_at(request_text, response_text, actor, usage, cost, Utc::now())
            .await
    }

    /// Store stamped with `now`. A re-store resets freshness and the hit count.
    pub async fn store_at(
        &self,
        request_text: &str,
        response_text: &str,
        actor: &str,
        usage: TokenUsage,
        cost: f64,
        now: DateTime<Utc>,
    ) -> Result<(), TollgateError> {
        let key = fingerprint(request_text, actor);
        let stored_request: String = request_text.chars().take(REQUEST_TEXT_LIMIT).collect();
        let response = response_text.to_string();
        let owner = actor.to_string();
        let created_at = format_timestamp(now);

        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO response_cache (fingerprint, request_text, response_text, \
                     actor, created_at, cost_saved, input_units, output_units, hit_count) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0) \
                     ON CONFLICT(fingerprint) DO UPDATE SET \
                     request_text = excluded.request_text, \
                     response_text = excluded.response_text, \
                     actor = excluded.actor, \
                     created_at = excluded.created_at, \
                     cost_saved = excluded.cost_saved, \
                     input_units = excluded.input_units, \
                     output_units = excluded.output_units, \
                     hit_count = 0",
                    rusqlite::params![
                        key,
                        stored_request,
                        response,
                        owner,
                        created_at,
                        cost,
                        usage.input_tokens,
                        usage.output_tokens,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(actor = %actor, cost_usd = cost, "response cached");
        Ok(())
    }

    /// Aggregate reuse figures across every stored entry.
    pub async fn stats(&self) -> Result<MemoStats, TollgateError> {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> Result<MemoStats, TollgateError> {
        let recent_cutoff = format_timestamp(now - Duration::hours(RECENT_WINDOW_HOURS));
        let duration_hours = self.duration_hours;

        self.db
            .connection()
            .call(move |conn| -> Result<MemoStats, rusqlite::Error> {
                let (total_entries, total_cost_saved): (u64, f64) = conn.query_row(
                    "SELECT COUNT(*), \
                     COALESCE(SUM(MAX(hit_count - 1, 0) * cost_saved), 0.0) \
                     FROM response_cache",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;

                let mut stmt = conn.prepare(
                    "SELECT actor, SUM(hit_count) AS hits, \
                     SUM(MAX(hit_count - 1, 0) * cost_saved) AS saved \
                     FROM response_cache WHERE hit_count > 0 \
                     GROUP BY actor ORDER BY saved DESC, actor ASC",
                )?;
                let per_actor = stmt
                    .query_map([], |row| {
                        Ok(ActorSavings {
                            actor: row.get(0)?,
                            hits: row.get(1)?,
                            saved: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let entries_last_24h: u64 = conn.query_row(
                    "SELECT COUNT(*) FROM response_cache WHERE created_at > ?1",
                    rusqlite::params![recent_cutoff],
                    |row| row.get(0),
                )?;

                Ok(MemoStats {
                    total_entries,
                    total_cost_saved,
                    per_actor,
                    entries_last_24h,
                    duration_hours,
                })
            })
            .await
            .map_err(map_tr_err)
    }

    /// Delete entries whose age has reached the horizon. Returns the count removed.
    pub async fn evict_expired(&self) -> Result<usize, TollgateError> {
        self.evict_expired_at(Utc::now()).await
    }

    pub async fn evict_expired_at(&self, now: DateTime<Utc>) -> Result<usize, TollgateError> {
        let cutoff = format_timestamp(now - self.horizon());
        let removed = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                conn.execute(
                    "DELETE FROM response_cache WHERE created_at <= ?1",
                    rusqlite::params![cutoff],
                )
            })
            .await
            .map_err(map_tr_err)?;

        if removed > 0 {
            info!(removed, "evicted expired cache entries");
        }
        Ok(removed)
    }
}
