// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transaction helpers.
//!
//! Query modules are synchronous functions over `&rusqlite::Connection`. Callers
//! compose them inside [`Database::write`], which runs the closure in a single
//! `BEGIN IMMEDIATE` transaction on the background thread, or
//! [`Database::read`] for plain reads.
//!
//! IMMEDIATE takes the write lock up front, so two writers (in this process or
//! another one) can never both read a row and then act on the same stale view.
//! Any `Err` from the closure rolls the whole transaction back.

use casework_core::CaseworkError;
use rusqlite::TransactionBehavior;

use crate::database::{Database, map_tr_err};

impl Database {
    /// Run `f` in an IMMEDIATE transaction and commit when it returns `Ok`.
    pub async fn write<F, R>(&self, f: F) -> Result<R, CaseworkError>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.connection()
            .call(move |conn| -> Result<R, rusqlite::Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let out = f(&tx)?;
                tx.commit()?;
                Ok(out)
            })
            .await
            .map_err(map_tr_err)
    }

    /// Run a read-only closure on the connection.
    pub async fn read<F, R>(&self, f: F) -> Result<R, CaseworkError>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.connection()
            .call(move |conn| -> Result<R, rusqlite::Error> { f(conn) })
            .await
            .map_err(map_tr_err)
    }
}
