// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed job payloads.
//!
//! Every job row stores its payload as JSON tagged with the job type. A
//! payload whose tag disagrees with the row's `job_type` column is rejected at
//! decode time so the worker can dead-letter it without invoking a handler.

use serde::{Deserialize, Serialize};

use crate::error::CaseworkError;
use crate::types::JobType;

/// Payload carried by a job. The variant determines the job type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobPayload {
    AckIntake,
    ExtractDocument,
    StructureCase,
    SuggestAction,
    PostDecisionWidget,
    PostSchedulingRequest,
    /// Ask the scheduling room again after an unparseable reply.
    RepromptScheduling { reason: String },
    PostFinalDenial,
    PostFinalAppointment,
    PostFinalAppointmentDenied,
    /// Notify the intake room that the case could not be completed.
    PostFinalFailure {
        cause: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    ExecuteCleanup,
}

impl JobPayload {
    /// The job type this payload belongs to.
    pub fn job_type(&self) -> JobType {
        match self {
            JobPayload::AckIntake => JobType::AckIntake,
            JobPayload::ExtractDocument => JobType::ExtractDocument,
            JobPayload::StructureCase => JobType::StructureCase,
            JobPayload::SuggestAction => JobType::SuggestAction,
            JobPayload::PostDecisionWidget => JobType::PostDecisionWidget,
            JobPayload::PostSchedulingRequest => JobType::PostSchedulingRequest,
            JobPayload::RepromptScheduling { .. } => JobType::RepromptScheduling,
            JobPayload::PostFinalDenial => JobType::PostFinalDenial,
            JobPayload::PostFinalAppointment => JobType::PostFinalAppointment,
            JobPayload::PostFinalAppointmentDenied => JobType::PostFinalAppointmentDenied,
            JobPayload::PostFinalFailure { .. } => JobType::PostFinalFailure,
            JobPayload::ExecuteCleanup => JobType::ExecuteCleanup,
        }
    }

    /// The payload for job types that carry no data.
    ///
    /// Returns `None` for `reprompt_scheduling` and `post_final_failure`,
    /// which must be constructed with their fields.
    pub fn unit(job_type: JobType) -> Option<Self> {
        let payload = match job_type {
            JobType::AckIntake => JobPayload::AckIntake,
            JobType::ExtractDocument => JobPayload::ExtractDocument,
            JobType::StructureCase => JobPayload::StructureCase,
            JobType::SuggestAction => JobPayload::SuggestAction,
            JobType::PostDecisionWidget => JobPayload::PostDecisionWidget,
            JobType::PostSchedulingRequest => JobPayload::PostSchedulingRequest,
            JobType::PostFinalDenial => JobPayload::PostFinalDenial,
            JobType::PostFinalAppointment => JobPayload::PostFinalAppointment,
            JobType::PostFinalAppointmentDenied => JobPayload::PostFinalAppointmentDenied,
            JobType::ExecuteCleanup => JobPayload::ExecuteCleanup,
            JobType::RepromptScheduling | JobType::PostFinalFailure => return None,
        };
        Some(payload)
    }

    /// Serialize to the JSON text stored in the `payload` column.
    pub fn encode(&self) -> Result<String, CaseworkError> {
        serde_json::to_string(self).map_err(|e| CaseworkError::InvalidPayload {
            job_type: self.job_type().to_string(),
            message: e.to_string(),
        })
    }

    /// Decode a stored payload and check it against the row's job type.
    pub fn decode(job_type: JobType, raw: &str) -> Result<Self, CaseworkError> {
        let payload: JobPayload =
            serde_json::from_str(raw).map_err(|e| CaseworkError::InvalidPayload {
                job_type: job_type.to_string(),
                message: e.to_string(),
            })?;
        if payload.job_type() != job_type {
            return Err(CaseworkError::InvalidPayload {
                job_type: job_type.to_string(),
                message: format!("payload is tagged {}", payload.job_type()),
            });
        }
        Ok(payload)
    }
}
