// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Casework workflow engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, IMMEDIATE
//! transaction helpers, and typed operations for cases, the append-only audit
//! log, tracked chat messages, and the job queue.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod writer;

pub use database::{Database, is_unique_violation, map_tr_err};
pub use models::*;
pub use queries::cases::AppointmentFields;
