// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted record types.
//!
//! These mirror the rows of the `cases`, `case_events`, `case_messages`, and
//! `jobs` tables. Timestamps are kept as the stored UTC text
//! (`YYYY-MM-DDTHH:MM:SS.mmmZ`), which orders lexicographically.

use serde::{Deserialize, Serialize};

use crate::types::{
    CaseEventKind, CaseId, CaseStatus, Decision, EventActor, JobId, JobStatus, JobType,
    MessageRole, ReactionKind, SupportFlag,
};

/// Milestone timestamps recorded as a case moves through the workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    pub ack_posted_at: Option<String>,
    pub extracted_at: Option<String>,
    pub structured_at: Option<String>,
    pub suggested_at: Option<String>,
    pub widget_posted_at: Option<String>,
    pub decided_at: Option<String>,
    pub request_posted_at: Option<String>,
    pub appointment_replied_at: Option<String>,
    pub final_reply_posted_at: Option<String>,
    pub failed_at: Option<String>,
    pub cleanup_triggered_at: Option<String>,
    pub cleanup_completed_at: Option<String>,
}

/// A case moving through the triage workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    /// Protocol event id of the intake message. Unique across cases.
    pub origin_id: String,
    pub origin_room_id: String,
    pub sender_user_id: String,
    pub document_url: String,
    pub status: CaseStatus,

    pub extracted_text: Option<String>,
    pub record_number: Option<String>,
    pub structured_data: Option<serde_json::Value>,
    pub summary: Option<String>,
    pub suggestion: Option<serde_json::Value>,

    pub decision: Option<Decision>,
    pub support_flag: Option<SupportFlag>,
    pub decision_reason: Option<String>,
    pub decided_by: Option<String>,

    pub appointment_status: Option<String>,
    pub appointment_at: Option<String>,
    pub appointment_location: Option<String>,
    pub appointment_instructions: Option<String>,
    pub appointment_reason: Option<String>,

    pub milestones: Milestones,
    pub created_at: String,
    pub updated_at: String,
}

/// An immutable audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseEvent {
    pub id: i64,
    pub case_id: CaseId,
    pub actor: EventActor,
    pub kind: CaseEventKind,
    pub from_status: Option<CaseStatus>,
    pub to_status: Option<CaseStatus>,
    pub payload: serde_json::Value,
    pub created_at: String,
}

/// A chat message the workflow posted or received for a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseMessage {
    pub id: i64,
    pub case_id: CaseId,
    pub room_id: String,
    /// Protocol event id. Unique across messages.
    pub event_id: String,
    pub role: MessageRole,
    pub reaction_kind: Option<ReactionKind>,
    pub reacted_by: Option<String>,
    pub reacted_at: Option<String>,
    pub created_at: String,
}

/// A unit of asynchronous work bound to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub case_id: CaseId,
    pub job_type: JobType,
    /// JSON text tagged with the job type. See [`crate::JobPayload`].
    pub payload: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub run_after: String,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
