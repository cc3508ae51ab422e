// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inputs and results of the workflow operations.

use casework_core::{
    CaseId, Decision, JobId, JobType, MessageRole, ReactionKind, StructuredCase, SupportFlag,
};
use serde::Serialize;
use strum::{AsRefStr, Display};

/// Machine-readable class of a refused event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    NotFound,
    WrongState,
    Conflict,
    Invalid,
}

/// An external event that was refused. The case is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub code: RejectionCode,
    pub detail: String,
}

impl Rejection {
    pub fn new(code: RejectionCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

/// A document posted to the intake room.
#[derive(Debug, Clone)]
pub struct Intake {
    pub origin_id: String,
    pub origin_room_id: String,
    pub sender_user_id: String,
    pub document_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    Created { case_id: CaseId, job_id: JobId },
    /// The origin event already produced a case.
    Duplicate { case_id: CaseId },
}

/// A doctor's decision on a case.
#[derive(Debug, Clone)]
pub struct DecisionInput {
    pub case_id: CaseId,
    pub decision: Decision,
    pub support_flag: SupportFlag,
    pub reason: Option<String>,
    pub decided_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    Accepted { job_id: JobId },
    Denied { job_id: JobId },
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingOutcome {
    Confirmed { job_id: JobId },
    Denied { job_id: JobId },
    /// The reply did not follow the template; the desk is asked again.
    Reprompted { reason: String, job_id: JobId },
    Rejected(Rejection),
}

/// A reaction observed on a tracked message.
#[derive(Debug, Clone)]
pub struct Reaction {
    pub case_id: CaseId,
    pub message_role: MessageRole,
    pub reaction_kind: ReactionKind,
    pub reacted_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    CleanupTriggered { job_id: JobId },
    AlreadyTriggered,
    /// Not the trigger combination; audited only.
    Ignored,
    Rejected(Rejection),
}

/// What a successful handler produced. Each job type yields exactly one kind.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    /// A message was posted; `event_id` is its protocol id.
    Posted { room_id: String, event_id: String },
    Extracted {
        text: String,
        record_number: Option<String>,
    },
    Structured(StructuredCase),
    Suggested { suggestion: serde_json::Value },
    Cleaned {
        redacted: Vec<String>,
        /// `(event_id, error)` for every redaction that failed.
        failed: Vec<(String, String)>,
    },
}

impl StepOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            StepOutput::Posted { .. } => "posted",
            StepOutput::Extracted { .. } => "extracted",
            StepOutput::Structured(_) => "structured",
            StepOutput::Suggested { .. } => "suggested",
            StepOutput::Cleaned { .. } => "cleaned",
        }
    }

    /// Whether this output is the kind `job_type` produces.
    pub fn fits(&self, job_type: JobType) -> bool {
        match job_type {
            JobType::ExtractDocument => matches!(self, StepOutput::Extracted { .. }),
            JobType::StructureCase => matches!(self, StepOutput::Structured(_)),
            JobType::SuggestAction => matches!(self, StepOutput::Suggested { .. }),
            JobType::ExecuteCleanup => matches!(self, StepOutput::Cleaned { .. }),
            JobType::AckIntake
            | JobType::PostDecisionWidget
            | JobType::PostSchedulingRequest
            | JobType::RepromptScheduling
            | JobType::PostFinalDenial
            | JobType::PostFinalAppointment
            | JobType::PostFinalAppointmentDenied
            | JobType::PostFinalFailure => matches!(self, StepOutput::Posted { .. }),
        }
    }
}

/// Role under which a posting step's message is tracked.
pub fn posted_role(job_type: JobType) -> Option<MessageRole> {
    match job_type {
        JobType::AckIntake => Some(MessageRole::Ack),
        JobType::PostDecisionWidget => Some(MessageRole::DecisionWidget),
        JobType::PostSchedulingRequest => Some(MessageRole::SchedulingRequest),
        JobType::RepromptScheduling => Some(MessageRole::SchedulingReprompt),
        JobType::PostFinalDenial
        | JobType::PostFinalAppointment
        | JobType::PostFinalAppointmentDenied => Some(MessageRole::FinalReply),
        JobType::PostFinalFailure => Some(MessageRole::FailureNotice),
        JobType::ExtractDocument
        | JobType::StructureCase
        | JobType::SuggestAction
        | JobType::ExecuteCleanup => None,
    }
}
