// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements for one database file are serialized through a single
//! tokio-rusqlite background thread. `Database` IS that single writer: query
//! code takes `&Database` and goes through `connection().call()`. Do NOT open
//! additional connections for writes.

use std::time::Duration;

use tokio_rusqlite::Connection;
use tracing::debug;

use tollgate_core::TollgateError;

use crate::migrations;

/// Convert a tokio-rusqlite error into `TollgateError::Storage`.
pub fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> TollgateError
where
    tokio_rusqlite::Error<E>: std::error::Error + Send + Sync + 'static,
{
    TollgateError::Storage {
        source: Box::new(e),
    }
}

/// Handle to one migrated SQLite database file.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, TollgateError> {
        Self::open_with(path, true).await
    }

    /// Open (or create) the database at `path` and run migrations.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, TollgateError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| TollgateError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path = %path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema. Used by tests.
    pub async fn open_in_memory() -> Result<Self, TollgateError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| TollgateError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), TollgateError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), TollgateError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.busy_timeout(Duration::from_secs(5))?;
                if wal_mode {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                        row.get::<_, String>(0)
                    })?;
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        self.conn
            .call(|conn| -> Result<(), TollgateError> { migrations::run_migrations(conn) })
            .await
            .map_err(map_tr_err)
    }
}
