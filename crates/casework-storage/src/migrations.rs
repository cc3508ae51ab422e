// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!`. Migrations run automatically on database open.

use casework_core::CaseworkError;
use tracing::debug;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied migrations in its own `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), CaseworkError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| CaseworkError::Storage {
            source: Box::new(e),
        })?;
    for migration in report.applied_migrations() {
        debug!(version = migration.version(), name = migration.name(), "applied migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_rejects_attempts_above_max() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO cases (id, origin_id, origin_room_id, sender_user_id, document_url)
             VALUES ('c1', 'o1', '!r', '@u', 'mxc://x')",
            [],
        )
        .unwrap();
        let err = conn
            .execute(
                "INSERT INTO jobs (case_id, job_type, payload, attempts, max_attempts)
                 VALUES ('c1', 'ack_intake', '{}', 4, 3)",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("CHECK"), "got: {err}");
    }

    #[test]
    fn schema_rejects_unknown_job_type_and_status() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO cases (id, origin_id, origin_room_id, sender_user_id, document_url)
             VALUES ('c1', 'o1', '!r', '@u', 'mxc://x')",
            [],
        )
        .unwrap();
        assert!(
            conn.execute(
                "INSERT INTO jobs (case_id, job_type, payload, max_attempts)
                 VALUES ('c1', 'send_fax', '{}', 3)",
                [],
            )
            .is_err()
        );
        assert!(
            conn.execute("UPDATE cases SET status = 'ARCHIVED' WHERE id = 'c1'", [])
                .is_err()
        );
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
    }
}
