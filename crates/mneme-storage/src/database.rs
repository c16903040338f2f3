// SPDX-FileCopyrightText: 2026 Mneme Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use mneme_config::model::StorageConfig;
use mneme_core::MnemeError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations;

/// Convert a tokio-rusqlite error into [`MnemeError::Store`].
pub fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> MnemeError
where
    E: std::error::Error + Send + Sync + 'static,
{
    MnemeError::store(e)
}

/// Handle to the migrated SQLite database.
///
/// Cloning is cheap: every clone talks to the same background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database described by `config` and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, MnemeError> {
        let path = config.database_path.clone();
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(MnemeError::store)?;
            }
        }

        let conn = Connection::open(&path).await.map_err(MnemeError::store)?;
        let db = Self::prepare(conn, config.wal_mode).await?;
        info!(path = %path, wal_mode = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with all migrations applied.
    pub async fn open_in_memory() -> Result<Self, MnemeError> {
        let conn = Connection::open_in_memory().await.map_err(MnemeError::store)?;
        Self::prepare(conn, false).await
    }

    async fn prepare(conn: Connection, wal_mode: bool) -> Result<Self, MnemeError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), MnemeError> { migrations::run_migrations(conn) })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => MnemeError::store(other.to_string()),
            })?;
        debug!("migrations applied");

        Ok(Self { conn })
    }

    /// The shared connection. All SQL goes through `call`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), MnemeError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)
    }
}
