// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-side model types.
//!
//! The persisted record types live in `casework-core::records` so they can
//! cross crate boundaries; this module re-exports them and adds the insert
//! descriptors and write outcomes used by the query modules.

use std::str::FromStr;

pub use casework_core::records::{Case, CaseEvent, CaseMessage, Job, Milestones};
use casework_core::{CaseEventKind, CaseId, CaseStatus, EventActor, JobStatus};

/// Fields required to create a case.
#[derive(Debug, Clone)]
pub struct NewCase {
    pub id: CaseId,
    pub origin_id: String,
    pub origin_room_id: String,
    pub sender_user_id: String,
    pub document_url: String,
}

/// An audit entry to append.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub case_id: CaseId,
    pub actor: EventActor,
    pub kind: CaseEventKind,
    pub from_status: Option<CaseStatus>,
    pub to_status: Option<CaseStatus>,
    pub payload: serde_json::Value,
}

impl NewEvent {
    /// A system-authored entry with an empty payload.
    pub fn system(case_id: CaseId, kind: CaseEventKind) -> Self {
        Self {
            case_id,
            actor: EventActor::System,
            kind,
            from_status: None,
            to_status: None,
            payload: serde_json::json!({}),
        }
    }

    /// A human-authored entry with an empty payload.
    pub fn human(case_id: CaseId, kind: CaseEventKind) -> Self {
        Self {
            actor: EventActor::Human,
            ..Self::system(case_id, kind)
        }
    }

    pub fn transition(mut self, from: CaseStatus, to: CaseStatus) -> Self {
        self.from_status = Some(from);
        self.to_status = Some(to);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Milestone timestamp columns on the `cases` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    AckPosted,
    Extracted,
    Structured,
    Suggested,
    WidgetPosted,
    Decided,
    RequestPosted,
    AppointmentReplied,
    FinalReplyPosted,
    Failed,
    CleanupTriggered,
    CleanupCompleted,
}

impl Milestone {
    pub(crate) fn column(self) -> &'static str {
        match self {
            Milestone::AckPosted => "ack_posted_at",
            Milestone::Extracted => "extracted_at",
            Milestone::Structured => "structured_at",
            Milestone::Suggested => "suggested_at",
            Milestone::WidgetPosted => "widget_posted_at",
            Milestone::Decided => "decided_at",
            Milestone::RequestPosted => "request_posted_at",
            Milestone::AppointmentReplied => "appointment_replied_at",
            Milestone::FinalReplyPosted => "final_reply_posted_at",
            Milestone::Failed => "failed_at",
            Milestone::CleanupTriggered => "cleanup_triggered_at",
            Milestone::CleanupCompleted => "cleanup_completed_at",
        }
    }
}

/// Result of moving a job to `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteOutcome {
    Completed,
    /// The job was already done; nothing changed.
    AlreadyDone,
    WrongStatus(JobStatus),
    Missing,
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOutcome {
    /// Requeued for another attempt at `run_after`.
    Retrying { attempts: u32, run_after: String },
    /// Attempts exhausted or the failure was permanent.
    Dead { attempts: u32 },
    WrongStatus(JobStatus),
    Missing,
}

/// Parse a TEXT column into a type with a `FromStr` impl.
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a nullable TEXT column.
pub(crate) fn parse_optional_column<T>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

/// Parse a nullable JSON TEXT column.
pub(crate) fn json_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}
