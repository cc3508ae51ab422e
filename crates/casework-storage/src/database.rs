// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements of one process run on tokio-rusqlite's single background
//! thread. Separate processes (or separate `Database` handles on the same
//! file) coordinate through SQLite's write lock: every write is an IMMEDIATE
//! transaction, and `busy_timeout` makes a blocked writer wait instead of
//! failing straight away.

use casework_config::model::StorageConfig;
use casework_core::{CaseworkError, HealthStatus};
use tracing::{debug, info};

use crate::migrations;

/// Handle to the durable store.
///
/// Cloning is cheap; clones share the same background connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open (creating if needed) the database at `path` with default settings.
    pub async fn open(path: &str) -> Result<Self, CaseworkError> {
        let config = StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        };
        Self::open_with_config(&config).await
    }

    /// Open the database described by the storage section, apply PRAGMAs,
    /// and run pending migrations.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self, CaseworkError> {
        let path = config.database_path.clone();
        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| CaseworkError::Storage {
                source: Box::new(e),
            })?;

        let wal_mode = config.wal_mode;
        let busy_timeout_ms = config.busy_timeout_ms;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| -> Result<(), CaseworkError> { migrations::run_migrations(conn) })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => inner,
                other => CaseworkError::Storage {
                    source: other.to_string().into(),
                },
            })?;

        info!(path = %path, wal = wal_mode, "database opened");
        Ok(Self { conn, path })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Path of the database file.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Round-trips a trivial query through the background connection.
    pub async fn health_check(&self) -> Result<HealthStatus, CaseworkError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), CaseworkError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| CaseworkError::Storage {
            source: Box::new(e),
        })?;
        debug!(path = %self.path, "database closed");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into `CaseworkError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CaseworkError {
    CaseworkError::Storage {
        source: Box::new(e),
    }
}

/// Whether an error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
