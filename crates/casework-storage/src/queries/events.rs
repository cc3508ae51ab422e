// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only case audit log.

use casework_core::{CaseEvent, CaseEventKind, CaseId};
use rusqlite::params;

use crate::models::{NewEvent, json_column, parse_column, parse_optional_column};

pub fn append(conn: &rusqlite::Connection, event: &NewEvent) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO case_events (case_id, actor, kind, from_status, to_status, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.case_id.to_string(),
            event.actor.as_ref(),
            event.kind.as_ref(),
            event.from_status.map(|s| s.as_ref().to_string()),
            event.to_status.map(|s| s.as_ref().to_string()),
            event.payload.to_string()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Events of a case in insertion order.
pub fn list_for_case(conn: &rusqlite::Connection, case_id: CaseId) -> rusqlite::Result<Vec<CaseEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, case_id, actor, kind, from_status, to_status, payload, created_at
         FROM case_events WHERE case_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![case_id.to_string()], |row| {
        Ok(CaseEvent {
            id: row.get(0)?,
            case_id: parse_column(row, 1)?,
            actor: parse_column(row, 2)?,
            kind: parse_column(row, 3)?,
            from_status: parse_optional_column(row, 4)?,
            to_status: parse_optional_column(row, 5)?,
            payload: json_column(row, 6)?.unwrap_or(serde_json::Value::Null),
            created_at: row.get(7)?,
        })
    })?;
    rows.collect()
}

/// Number of events of one kind recorded for a case.
pub fn count_kind(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    kind: CaseEventKind,
) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COUNT(*) FROM case_events WHERE case_id = ?1 AND kind = ?2",
        params![case_id.to_string(), kind.as_ref()],
        |row| row.get(0),
    )
}

#[cfg(test)]
mod tests {
    use casework_core::CaseStatus;
    use tempfile::tempdir;

    use super::*;
    use crate::database::Database;
    use crate::models::NewCase;
    use crate::queries::cases;

    #[tokio::test]
    async fn audit_log_is_append_only() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("events.db").to_str().unwrap())
            .await
            .unwrap();
        let case_id = CaseId::new();
        db.write(move |tx| {
            cases::insert(
                tx,
                &NewCase {
                    id: case_id,
                    origin_id: "$E1".into(),
                    origin_room_id: "!intake:test".into(),
                    sender_user_id: "@nurse:test".into(),
                    document_url: "mxc://test/doc".into(),
                },
            )?;
            append(tx, &NewEvent::system(case_id, CaseEventKind::CaseCreated))?;
            append(
                tx,
                &NewEvent::system(case_id, CaseEventKind::StatusChanged)
                    .transition(CaseStatus::New, CaseStatus::R1AckProcessing)
                    .with_payload(serde_json::json!({"job_type": "ack_intake"})),
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let update = db
            .write(|tx| tx.execute("UPDATE case_events SET kind = 'CASE_FAILED'", []))
            .await;
        assert!(update.is_err(), "UPDATE on the audit log must abort");
        let delete = db
            .write(|tx| tx.execute("DELETE FROM case_events", []))
            .await;
        assert!(delete.is_err(), "DELETE on the audit log must abort");

        let events = db.read(move |c| list_for_case(c, case_id)).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, CaseEventKind::CaseCreated);
        assert_eq!(events[1].from_status, Some(CaseStatus::New));
        assert_eq!(events[1].to_status, Some(CaseStatus::R1AckProcessing));
        assert_eq!(events[1].payload["job_type"], "ack_intake");
        assert!(events[0].id < events[1].id);

        let created = db
            .read(move |c| count_kind(c, case_id, CaseEventKind::CaseCreated))
            .await
            .unwrap();
        assert_eq!(created, 1);
        db.close().await.unwrap();
    }
}
