// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers and closed enumerations shared across the workspace.
//!
//! Every enum here is persisted as text. The string forms are part of the
//! database schema (CHECK constraints in the migrations) and must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

/// Unique identifier for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseId(pub Uuid);

impl CaseId {
    /// Generate a fresh random case id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CaseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Queue-assigned identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Workflow status of a case.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
pub enum CaseStatus {
    #[strum(serialize = "NEW")]
    #[serde(rename = "NEW")]
    New,
    #[strum(serialize = "R1_ACK_PROCESSING")]
    #[serde(rename = "R1_ACK_PROCESSING")]
    R1AckProcessing,
    #[strum(serialize = "EXTRACTING")]
    #[serde(rename = "EXTRACTING")]
    Extracting,
    #[strum(serialize = "LLM_STRUCT")]
    #[serde(rename = "LLM_STRUCT")]
    LlmStruct,
    #[strum(serialize = "LLM_SUGGEST")]
    #[serde(rename = "LLM_SUGGEST")]
    LlmSuggest,
    #[strum(serialize = "R2_POST_WIDGET")]
    #[serde(rename = "R2_POST_WIDGET")]
    R2PostWidget,
    #[strum(serialize = "WAIT_DOCTOR")]
    #[serde(rename = "WAIT_DOCTOR")]
    WaitDoctor,
    #[strum(serialize = "DOCTOR_DENIED")]
    #[serde(rename = "DOCTOR_DENIED")]
    DoctorDenied,
    #[strum(serialize = "DOCTOR_ACCEPTED")]
    #[serde(rename = "DOCTOR_ACCEPTED")]
    DoctorAccepted,
    #[strum(serialize = "R3_POST_REQUEST")]
    #[serde(rename = "R3_POST_REQUEST")]
    R3PostRequest,
    #[strum(serialize = "WAIT_APPT")]
    #[serde(rename = "WAIT_APPT")]
    WaitAppt,
    #[strum(serialize = "APPT_CONFIRMED")]
    #[serde(rename = "APPT_CONFIRMED")]
    ApptConfirmed,
    #[strum(serialize = "APPT_DENIED")]
    #[serde(rename = "APPT_DENIED")]
    ApptDenied,
    #[strum(serialize = "FAILED")]
    #[serde(rename = "FAILED")]
    Failed,
    #[strum(serialize = "WAIT_R1_CLEANUP_THUMBS")]
    #[serde(rename = "WAIT_R1_CLEANUP_THUMBS")]
    WaitR1CleanupThumbs,
    #[strum(serialize = "CLEANUP_RUNNING")]
    #[serde(rename = "CLEANUP_RUNNING")]
    CleanupRunning,
    #[strum(serialize = "CLEANED")]
    #[serde(rename = "CLEANED")]
    Cleaned,
}

impl CaseStatus {
    /// Terminal statuses never leave their state and get no recovery work.
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseStatus::Failed | CaseStatus::Cleaned)
    }

    /// All statuses in declaration order.
    pub fn all() -> impl Iterator<Item = CaseStatus> {
        CaseStatus::iter()
    }
}

/// Lifecycle status of a queued job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    /// Accepted by the schema; no queue operation produces it.
    Failed,
    Dead,
}

impl JobStatus {
    /// Queued or running jobs still represent pending work for their case.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

/// The closed set of automated workflow steps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    AckIntake,
    ExtractDocument,
    StructureCase,
    SuggestAction,
    PostDecisionWidget,
    PostSchedulingRequest,
    RepromptScheduling,
    PostFinalDenial,
    PostFinalAppointment,
    PostFinalAppointmentDenied,
    PostFinalFailure,
    ExecuteCleanup,
}

impl JobType {
    /// All job types in declaration order.
    pub fn all() -> impl Iterator<Item = JobType> {
        JobType::iter()
    }
}

/// Semantic role of a tracked chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The intake message that created the case.
    Origin,
    Ack,
    DecisionWidget,
    SchedulingRequest,
    SchedulingReprompt,
    FinalReply,
    FailureNotice,
}

/// Normalized reaction kinds observed on tracked messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    ThumbsUp,
    ThumbsDown,
    Other,
}

impl ReactionKind {
    /// Normalize a protocol reaction key (emoji or shortcode).
    pub fn from_key(key: &str) -> Self {
        // Strip variation selectors and skin-tone modifiers.
        let base: String = key
            .trim()
            .chars()
            .filter(|c| !matches!(*c, '\u{FE0F}' | '\u{1F3FB}'..='\u{1F3FF}'))
            .collect();
        match base.as_str() {
            "\u{1F44D}" | "+1" | ":+1:" | ":thumbsup:" | "thumbs_up" => ReactionKind::ThumbsUp,
            "\u{1F44E}" | "-1" | ":-1:" | ":thumbsdown:" | "thumbs_down" => {
                ReactionKind::ThumbsDown
            }
            _ => ReactionKind::Other,
        }
    }
}

/// Human decision recorded on a case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Deny,
}

/// Support requirement attached to a decision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SupportFlag {
    None,
    Anesthesist,
    AnesthesistIcu,
}

/// Who caused an audited fact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventActor {
    System,
    Human,
}

/// Kind of fact recorded in the append-only case audit log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseEventKind {
    CaseCreated,
    IntakeDuplicate,
    StatusChanged,
    JobEnqueued,
    JobCompleted,
    JobRetryScheduled,
    JobDeadLettered,
    StepSkippedStale,
    ArtifactStored,
    MessagePosted,
    EventRejected,
    DecisionRecorded,
    SchedulingReplyRecorded,
    SchedulingReplyInvalid,
    ReactionObserved,
    CleanupTriggered,
    MessageRedacted,
    MessageRedactionFailed,
    CleanupCompleted,
    CaseFailed,
    RecoveryJobEnqueued,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of external collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Chat,
    Llm,
    Extractor,
}
