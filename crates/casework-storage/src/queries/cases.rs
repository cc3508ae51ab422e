// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case row operations.
//!
//! Every status change is a conditional `UPDATE ... WHERE status = ?` so a
//! transition only applies from its source status. Callers check the returned
//! flag to learn whether they won.

use casework_core::{Case, CaseId, CaseStatus, Decision, Milestones, SupportFlag};
use rusqlite::{OptionalExtension, params};

use crate::database::is_unique_violation;
use crate::models::{Milestone, NewCase, json_column, parse_column, parse_optional_column};

const CASE_COLUMNS: &str = "id, origin_id, origin_room_id, sender_user_id, document_url, status, \
     extracted_text, record_number, structured_data, summary, suggestion, \
     decision, support_flag, decision_reason, decided_by, \
     appointment_status, appointment_at, appointment_location, appointment_instructions, \
     appointment_reason, \
     ack_posted_at, extracted_at, structured_at, suggested_at, widget_posted_at, decided_at, \
     request_posted_at, appointment_replied_at, final_reply_posted_at, failed_at, \
     cleanup_triggered_at, cleanup_completed_at, created_at, updated_at";

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

fn case_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Case> {
    Ok(Case {
        id: parse_column(row, 0)?,
        origin_id: row.get(1)?,
        origin_room_id: row.get(2)?,
        sender_user_id: row.get(3)?,
        document_url: row.get(4)?,
        status: parse_column(row, 5)?,
        extracted_text: row.get(6)?,
        record_number: row.get(7)?,
        structured_data: json_column(row, 8)?,
        summary: row.get(9)?,
        suggestion: json_column(row, 10)?,
        decision: parse_optional_column(row, 11)?,
        support_flag: parse_optional_column(row, 12)?,
        decision_reason: row.get(13)?,
        decided_by: row.get(14)?,
        appointment_status: row.get(15)?,
        appointment_at: row.get(16)?,
        appointment_location: row.get(17)?,
        appointment_instructions: row.get(18)?,
        appointment_reason: row.get(19)?,
        milestones: Milestones {
            ack_posted_at: row.get(20)?,
            extracted_at: row.get(21)?,
            structured_at: row.get(22)?,
            suggested_at: row.get(23)?,
            widget_posted_at: row.get(24)?,
            decided_at: row.get(25)?,
            request_posted_at: row.get(26)?,
            appointment_replied_at: row.get(27)?,
            final_reply_posted_at: row.get(28)?,
            failed_at: row.get(29)?,
            cleanup_triggered_at: row.get(30)?,
            cleanup_completed_at: row.get(31)?,
        },
        created_at: row.get(32)?,
        updated_at: row.get(33)?,
    })
}

/// Insert a case in `NEW`.
///
/// Returns `false` when another case already owns the `origin_id`. The
/// transaction stays usable after the constraint failure.
pub fn insert(conn: &rusqlite::Connection, case: &NewCase) -> rusqlite::Result<bool> {
    let result = conn.execute(
        "INSERT INTO cases (id, origin_id, origin_room_id, sender_user_id, document_url, status)
         VALUES (?1, ?2, ?3, ?4, ?5, 'NEW')",
        params![
            case.id.to_string(),
            case.origin_id,
            case.origin_room_id,
            case.sender_user_id,
            case.document_url
        ],
    );
    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn get(conn: &rusqlite::Connection, id: CaseId) -> rusqlite::Result<Option<Case>> {
    conn.query_row(
        &format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1"),
        params![id.to_string()],
        case_from_row,
    )
    .optional()
}

pub fn find_by_origin(conn: &rusqlite::Connection, origin_id: &str) -> rusqlite::Result<Option<Case>> {
    conn.query_row(
        &format!("SELECT {CASE_COLUMNS} FROM cases WHERE origin_id = ?1"),
        params![origin_id],
        case_from_row,
    )
    .optional()
}

/// Current status only.
pub fn status(conn: &rusqlite::Connection, id: CaseId) -> rusqlite::Result<Option<CaseStatus>> {
    conn.query_row(
        "SELECT status FROM cases WHERE id = ?1",
        params![id.to_string()],
        |row| parse_column(row, 0),
    )
    .optional()
}

/// Move `id` from `from` to `to`. Returns whether the row was in `from`.
///
/// `from == to` is a valid self-loop: it only bumps `updated_at`.
pub fn transition(
    conn: &rusqlite::Connection,
    id: CaseId,
    from: CaseStatus,
    to: CaseStatus,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        &format!("UPDATE cases SET status = ?1, updated_at = {NOW} WHERE id = ?2 AND status = ?3"),
        params![to.as_ref(), id.to_string(), from.as_ref()],
    )?;
    Ok(changed == 1)
}

/// Stamp a milestone with the current time.
pub fn mark_milestone(
    conn: &rusqlite::Connection,
    id: CaseId,
    milestone: Milestone,
) -> rusqlite::Result<()> {
    let column = milestone.column();
    conn.execute(
        &format!("UPDATE cases SET {column} = {NOW}, updated_at = {NOW} WHERE id = ?1"),
        params![id.to_string()],
    )?;
    Ok(())
}

pub fn store_extraction(
    conn: &rusqlite::Connection,
    id: CaseId,
    text: &str,
    record_number: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "UPDATE cases SET extracted_text = ?1, record_number = ?2,
                 extracted_at = {NOW}, updated_at = {NOW}
             WHERE id = ?3"
        ),
        params![text, record_number, id.to_string()],
    )?;
    Ok(())
}

pub fn store_structure(
    conn: &rusqlite::Connection,
    id: CaseId,
    data: &serde_json::Value,
    summary: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "UPDATE cases SET structured_data = ?1, summary = ?2,
                 structured_at = {NOW}, updated_at = {NOW}
             WHERE id = ?3"
        ),
        params![data.to_string(), summary, id.to_string()],
    )?;
    Ok(())
}

pub fn store_suggestion(
    conn: &rusqlite::Connection,
    id: CaseId,
    suggestion: &serde_json::Value,
) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "UPDATE cases SET suggestion = ?1, suggested_at = {NOW}, updated_at = {NOW}
             WHERE id = ?2"
        ),
        params![suggestion.to_string(), id.to_string()],
    )?;
    Ok(())
}

/// Record a human decision and move to its outcome status in one write.
///
/// Applies only while the case is `WAIT_DOCTOR` with no decision stored.
pub fn record_decision(
    conn: &rusqlite::Connection,
    id: CaseId,
    decision: Decision,
    support_flag: SupportFlag,
    reason: Option<&str>,
    decided_by: &str,
    to: CaseStatus,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        &format!(
            "UPDATE cases SET decision = ?1, support_flag = ?2, decision_reason = ?3,
                 decided_by = ?4, status = ?5, decided_at = {NOW}, updated_at = {NOW}
             WHERE id = ?6 AND status = 'WAIT_DOCTOR' AND decision IS NULL"
        ),
        params![
            decision.as_ref(),
            support_flag.as_ref(),
            reason,
            decided_by,
            to.as_ref(),
            id.to_string()
        ],
    )?;
    Ok(changed == 1)
}

/// Appointment outcome parsed from a scheduling reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentFields<'a> {
    Confirmed {
        at: &'a str,
        location: &'a str,
        instructions: &'a str,
    },
    Denied {
        reason: Option<&'a str>,
    },
}

/// Record the scheduling outcome and move out of `WAIT_APPT` in one write.
pub fn record_appointment(
    conn: &rusqlite::Connection,
    id: CaseId,
    fields: &AppointmentFields<'_>,
    to: CaseStatus,
) -> rusqlite::Result<bool> {
    let (status, at, location, instructions, reason) = match fields {
        AppointmentFields::Confirmed {
            at,
            location,
            instructions,
        } => ("confirmed", Some(*at), Some(*location), Some(*instructions), None),
        AppointmentFields::Denied { reason } => ("denied", None, None, None, *reason),
    };
    let changed = conn.execute(
        &format!(
            "UPDATE cases SET appointment_status = ?1, appointment_at = ?2,
                 appointment_location = ?3, appointment_instructions = ?4,
                 appointment_reason = ?5, status = ?6,
                 appointment_replied_at = {NOW}, updated_at = {NOW}
             WHERE id = ?7 AND status = 'WAIT_APPT'"
        ),
        params![
            status,
            at,
            location,
            instructions,
            reason,
            to.as_ref(),
            id.to_string()
        ],
    )?;
    Ok(changed == 1)
}

/// Set-if-null cleanup trigger.
///
/// Exactly one caller can see `true` for a case: the update matches only
/// while `cleanup_triggered_at` is NULL and the case waits for the reaction.
pub fn trigger_cleanup(conn: &rusqlite::Connection, id: CaseId) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        &format!(
            "UPDATE cases SET cleanup_triggered_at = {NOW}, status = 'CLEANUP_RUNNING',
                 updated_at = {NOW}
             WHERE id = ?1 AND cleanup_triggered_at IS NULL
                 AND status = 'WAIT_R1_CLEANUP_THUMBS'"
        ),
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}

/// Cases boot recovery has to look at: everything not `CLEANED`, oldest first.
///
/// `FAILED` is included because a failed case may still owe its failure notice.
pub fn list_recoverable(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<Case>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CASE_COLUMNS} FROM cases
         WHERE status <> 'CLEANED'
         ORDER BY created_at, id"
    ))?;
    let rows = stmt.query_map([], case_from_row)?;
    rows.collect()
}

/// Most recently created cases, optionally filtered by status.
pub fn list_recent(
    conn: &rusqlite::Connection,
    status: Option<CaseStatus>,
    limit: usize,
) -> rusqlite::Result<Vec<Case>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&format!(
        "SELECT {CASE_COLUMNS} FROM cases
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(
        params![status.map(|s| s.as_ref().to_string()), limit],
        case_from_row,
    )?;
    rows.collect()
}
