// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The case status graph and the automated step table.
//!
//! Pure functions only. The engine consults these tables inside its
//! transactions; nothing here touches storage.

use casework_core::{CaseStatus, JobType};

/// Whether `from -> to` is an edge of the status graph.
pub fn is_legal_edge(from: CaseStatus, to: CaseStatus) -> bool {
    use CaseStatus::*;

    if to == Failed {
        return fails_to_terminal(from);
    }
    matches!(
        (from, to),
        (New, R1AckProcessing)
            | (R1AckProcessing, Extracting)
            | (Extracting, LlmStruct)
            | (LlmStruct, LlmSuggest)
            | (LlmSuggest, R2PostWidget)
            | (R2PostWidget, WaitDoctor)
            | (WaitDoctor, DoctorDenied)
            | (WaitDoctor, DoctorAccepted)
            | (DoctorAccepted, R3PostRequest)
            | (R3PostRequest, WaitAppt)
            | (WaitAppt, ApptConfirmed)
            | (WaitAppt, ApptDenied)
            | (WaitAppt, WaitAppt)
            | (DoctorDenied, WaitR1CleanupThumbs)
            | (ApptConfirmed, WaitR1CleanupThumbs)
            | (ApptDenied, WaitR1CleanupThumbs)
            | (WaitR1CleanupThumbs, CleanupRunning)
            | (CleanupRunning, Cleaned)
    )
}

/// Statuses with an outgoing edge to `FAILED`: the "runs in" status of
/// every required step.
fn fails_to_terminal(from: CaseStatus) -> bool {
    JobType::all().any(|job_type| {
        let spec = step(job_type);
        spec.required && spec.runs_in == from
    })
}

/// Static description of one automated step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSpec {
    pub job_type: JobType,
    /// The case must be in this status for the step to apply.
    pub runs_in: CaseStatus,
    /// Statuses entered, in order, when the step succeeds.
    pub on_success: &'static [CaseStatus],
    /// Job enqueued after the last transition.
    pub follow_up: Option<JobType>,
    /// Dead-lettering a required step fails the case.
    pub required: bool,
}

/// The step table.
pub fn step(job_type: JobType) -> StepSpec {
    use CaseStatus::*;

    let (runs_in, on_success, follow_up, required): (_, &'static [CaseStatus], _, _) =
        match job_type {
            JobType::AckIntake => (
                New,
                &[R1AckProcessing, Extracting],
                Some(JobType::ExtractDocument),
                true,
            ),
            JobType::ExtractDocument => {
                (Extracting, &[LlmStruct], Some(JobType::StructureCase), true)
            }
            JobType::StructureCase => {
                (LlmStruct, &[LlmSuggest], Some(JobType::SuggestAction), true)
            }
            JobType::SuggestAction => (
                LlmSuggest,
                &[R2PostWidget],
                Some(JobType::PostDecisionWidget),
                true,
            ),
            JobType::PostDecisionWidget => (R2PostWidget, &[WaitDoctor], None, true),
            JobType::PostSchedulingRequest => (R3PostRequest, &[WaitAppt], None, true),
            JobType::RepromptScheduling => (WaitAppt, &[], None, false),
            JobType::PostFinalDenial => (DoctorDenied, &[WaitR1CleanupThumbs], None, true),
            JobType::PostFinalAppointment => (ApptConfirmed, &[WaitR1CleanupThumbs], None, true),
            JobType::PostFinalAppointmentDenied => {
                (ApptDenied, &[WaitR1CleanupThumbs], None, true)
            }
            JobType::PostFinalFailure => (Failed, &[], None, false),
            JobType::ExecuteCleanup => (CleanupRunning, &[Cleaned], None, true),
        };
    StepSpec {
        job_type,
        runs_in,
        on_success,
        follow_up,
        required,
    }
}

/// What boot recovery does for a case that has no active job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Waiting on a human, or nothing left to do.
    Nothing,
    /// Re-enqueue the step that runs in the current status.
    Enqueue(JobType),
    /// Move through a pass-through status, then enqueue.
    Advance { to: CaseStatus, job_type: JobType },
    /// Enqueue the failure notice unless one was ever enqueued.
    FailureNotice,
}

/// Recovery plan for a case in `status` with no queued or running job.
pub fn resume_plan(status: CaseStatus, cleanup_triggered: bool) -> ResumePlan {
    use CaseStatus::*;

    match status {
        R1AckProcessing => ResumePlan::Advance {
            to: Extracting,
            job_type: JobType::ExtractDocument,
        },
        DoctorAccepted => ResumePlan::Advance {
            to: R3PostRequest,
            job_type: JobType::PostSchedulingRequest,
        },
        WaitR1CleanupThumbs if cleanup_triggered => ResumePlan::Advance {
            to: CleanupRunning,
            job_type: JobType::ExecuteCleanup,
        },
        WaitDoctor | WaitAppt | WaitR1CleanupThumbs | Cleaned => ResumePlan::Nothing,
        Failed => ResumePlan::FailureNotice,
        other => JobType::all()
            .map(step)
            .find(|spec| spec.required && spec.runs_in == other)
            .map(|spec| ResumePlan::Enqueue(spec.job_type))
            .unwrap_or(ResumePlan::Nothing),
    }
}
