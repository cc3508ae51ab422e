// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracked chat messages of a case.

use casework_core::{CaseId, CaseMessage, MessageRole, ReactionKind};
use rusqlite::{OptionalExtension, params};

use crate::models::{parse_column, parse_optional_column};

const MESSAGE_COLUMNS: &str =
    "id, case_id, room_id, event_id, role, reaction_kind, reacted_by, reacted_at, created_at";

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CaseMessage> {
    Ok(CaseMessage {
        id: row.get(0)?,
        case_id: parse_column(row, 1)?,
        room_id: row.get(2)?,
        event_id: row.get(3)?,
        role: parse_column(row, 4)?,
        reaction_kind: parse_optional_column(row, 5)?,
        reacted_by: row.get(6)?,
        reacted_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Track a message. A protocol event id already tracked is left untouched
/// and `None` is returned.
pub fn insert(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    room_id: &str,
    event_id: &str,
    role: MessageRole,
) -> rusqlite::Result<Option<i64>> {
    let changed = conn.execute(
        "INSERT INTO case_messages (case_id, room_id, event_id, role)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(event_id) DO NOTHING",
        params![case_id.to_string(), room_id, event_id, role.as_ref()],
    )?;
    Ok((changed == 1).then(|| conn.last_insert_rowid()))
}

pub fn list_for_case(
    conn: &rusqlite::Connection,
    case_id: CaseId,
) -> rusqlite::Result<Vec<CaseMessage>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM case_messages WHERE case_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![case_id.to_string()], message_from_row)?;
    rows.collect()
}

/// Most recent message of a role for a case.
pub fn latest_with_role(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    role: MessageRole,
) -> rusqlite::Result<Option<CaseMessage>> {
    conn.query_row(
        &format!(
            "SELECT {MESSAGE_COLUMNS} FROM case_messages
             WHERE case_id = ?1 AND role = ?2
             ORDER BY id DESC LIMIT 1"
        ),
        params![case_id.to_string(), role.as_ref()],
        message_from_row,
    )
    .optional()
}

/// Record the reaction that triggered cleanup. Only the first one sticks.
pub fn record_reaction(
    conn: &rusqlite::Connection,
    message_id: i64,
    kind: ReactionKind,
    reacted_by: &str,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE case_messages SET reaction_kind = ?1, reacted_by = ?2,
             reacted_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?3 AND reaction_kind IS NULL",
        params![kind.as_ref(), reacted_by, message_id],
    )?;
    Ok(changed == 1)
}
