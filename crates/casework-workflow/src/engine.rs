// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event application for the case state machine.
//!
//! Every operation here runs in one IMMEDIATE transaction: the guard check,
//! the case write, the audit entries, and any follow-up job commit together or
//! not at all. Guards are conditional writes; there are no in-process locks,
//! so the same rules hold across worker processes sharing the database.

use casework_core::{
    Case, CaseEvent, CaseEventKind, CaseId, CaseMessage, CaseStatus, CaseworkError, Decision, Job,
    JobId, JobPayload, JobStatus, JobType, MessageRole, ReactionKind, RetryPolicy, SupportFlag,
};
use casework_storage::queries::{cases, events, jobs, messages};
use casework_storage::{AppointmentFields, Database, FailOutcome, Milestone, NewCase, NewEvent};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::decision::parse_decision_reply;
use crate::failure::FailureCause;
use crate::machine::{self, ResumePlan};
use crate::outcome::{
    DecisionInput, DecisionOutcome, Intake, IntakeOutcome, Reaction, ReactionOutcome, Rejection,
    RejectionCode, SchedulingOutcome, StepOutput, posted_role,
};
use crate::queue::{JobQueue, enqueue_in};
use crate::scheduling::{APPOINTMENT_AT_FORMAT, ParsedScheduling, parse_scheduling_reply};

/// Longest error excerpt carried into the failure notice.
const FAILURE_DETAILS_MAX_CHARS: usize = 300;

/// Result of applying a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCompletion {
    Advanced {
        status: CaseStatus,
        follow_up: Option<JobId>,
    },
    /// The case had moved on; the job was completed without effect.
    SkippedStale { status: CaseStatus },
}

/// Result of recording a failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub outcome: FailOutcome,
    /// Set when the dead job failed its case; the failure notice job.
    pub failure_notice: Option<JobId>,
}

/// A job recovery re-enqueued for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resumed {
    pub job_type: JobType,
    pub job_id: JobId,
}

/// Write-closure results that map to errors once the transaction is over.
enum Guarded<T> {
    Done(T),
    CaseMissing,
    JobMissing,
    JobState(JobStatus),
}

impl<T> Guarded<T> {
    fn into_result(self, case_id: CaseId, job_id: JobId) -> Result<T, CaseworkError> {
        match self {
            Guarded::Done(value) => Ok(value),
            Guarded::CaseMissing => Err(CaseworkError::NotFound {
                entity: "case",
                id: case_id.to_string(),
            }),
            Guarded::JobMissing => Err(CaseworkError::NotFound {
                entity: "job",
                id: job_id.to_string(),
            }),
            Guarded::JobState(status) => Err(CaseworkError::InvalidJobState {
                job_id: job_id.0,
                status: status.to_string(),
            }),
        }
    }
}

/// The workflow engine: store handle plus queue policy.
#[derive(Clone)]
pub struct Workflow {
    db: Database,
    queue: JobQueue,
}

impl Workflow {
    pub fn new(db: Database, policy: RetryPolicy) -> Self {
        let queue = JobQueue::new(db.clone(), policy);
        Self { db, queue }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    fn max_attempts(&self) -> u32 {
        self.queue.policy().max_attempts
    }

    // --- external events ---

    /// Create a case for a new intake document, or report the existing one.
    pub async fn intake(&self, intake: Intake) -> Result<IntakeOutcome, CaseworkError> {
        let max_attempts = self.max_attempts();
        let new_case = NewCase {
            id: CaseId::new(),
            origin_id: intake.origin_id,
            origin_room_id: intake.origin_room_id,
            sender_user_id: intake.sender_user_id,
            document_url: intake.document_url,
        };
        let outcome = self
            .db
            .write(move |tx| {
                if !cases::insert(tx, &new_case)? {
                    let existing = cases::find_by_origin(tx, &new_case.origin_id)?
                        .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
                    events::append(
                        tx,
                        &NewEvent::system(existing.id, CaseEventKind::IntakeDuplicate)
                            .with_payload(json!({ "origin_id": new_case.origin_id })),
                    )?;
                    return Ok(IntakeOutcome::Duplicate {
                        case_id: existing.id,
                    });
                }

                let case_id = new_case.id;
                events::append(
                    tx,
                    &NewEvent::system(case_id, CaseEventKind::CaseCreated).with_payload(json!({
                            "origin_id": new_case.origin_id,
                            "origin_room_id": new_case.origin_room_id,
                            "sender_user_id": new_case.sender_user_id,
                            "document_url": new_case.document_url,
                        })),
                )?;
                messages::insert(
                    tx,
                    case_id,
                    &new_case.origin_room_id,
                    &new_case.origin_id,
                    MessageRole::Origin,
                )?;
                let job_id = enqueue_in(tx, case_id, &JobPayload::AckIntake, max_attempts, None)?;
                Ok(IntakeOutcome::Created { case_id, job_id })
            })
            .await?;

        match outcome {
            IntakeOutcome::Created { case_id, job_id } => {
                info!(case_id = %case_id, job_id = %job_id, "case created");
            }
            IntakeOutcome::Duplicate { case_id } => {
                info!(case_id = %case_id, "duplicate intake ignored");
            }
        }
        Ok(outcome)
    }

    /// Apply a doctor's decision to a case waiting for one.
    pub async fn decide(&self, input: DecisionInput) -> Result<DecisionOutcome, CaseworkError> {
        let max_attempts = self.max_attempts();
        let case_id = input.case_id;
        let outcome = self
            .db
            .write(move |tx| {
                let Some(case) = cases::get(tx, input.case_id)? else {
                    return Ok(DecisionOutcome::Rejected(not_found(input.case_id)));
                };

                let refusal = if input.decision == Decision::Deny
                    && input.support_flag != SupportFlag::None
                {
                    Some(Rejection::new(
                        RejectionCode::Invalid,
                        "invalid_support_flag_for_decision",
                    ))
                } else if case.decision.is_some() {
                    Some(Rejection::new(RejectionCode::Conflict, "decision already recorded"))
                } else if case.status != CaseStatus::WaitDoctor {
                    Some(wrong_state(case.status))
                } else {
                    None
                };
                if let Some(rejection) = refusal {
                    return reject(tx, &case, "decision", rejection).map(DecisionOutcome::Rejected);
                }

                let target = match input.decision {
                    Decision::Accept => CaseStatus::DoctorAccepted,
                    Decision::Deny => CaseStatus::DoctorDenied,
                };
                if !cases::record_decision(
                    tx,
                    case.id,
                    input.decision,
                    input.support_flag,
                    input.reason.as_deref(),
                    &input.decided_by,
                    target,
                )? {
                    let rejection =
                        Rejection::new(RejectionCode::Conflict, "decision already recorded");
                    return reject(tx, &case, "decision", rejection).map(DecisionOutcome::Rejected);
                }
                events::append(
                    tx,
                    &NewEvent::human(case.id, CaseEventKind::DecisionRecorded)
                        .transition(CaseStatus::WaitDoctor, target)
                        .with_payload(json!({
                            "decision": input.decision.as_ref(),
                            "support_flag": input.support_flag.as_ref(),
                            "reason": input.reason,
                            "decided_by": input.decided_by,
                        })),
                )?;

                match input.decision {
                    Decision::Accept => {
                        advance(tx, case.id, target, CaseStatus::R3PostRequest)?;
                        let job_id = enqueue_in(
                            tx,
                            case.id,
                            &JobPayload::PostSchedulingRequest,
                            max_attempts,
                            None,
                        )?;
                        Ok(DecisionOutcome::Accepted { job_id })
                    }
                    Decision::Deny => {
                        let job_id =
                            enqueue_in(tx, case.id, &JobPayload::PostFinalDenial, max_attempts, None)?;
                        Ok(DecisionOutcome::Denied { job_id })
                    }
                }
            })
            .await?;

        match &outcome {
            DecisionOutcome::Rejected(rejection) => {
                warn!(case_id = %case_id, %rejection, "decision rejected");
            }
            other => info!(case_id = %case_id, outcome = ?other, "decision recorded"),
        }
        Ok(outcome)
    }

    /// Parse a decision reply posted in the decision room and apply it.
    pub async fn decide_from_reply(
        &self,
        case_id: CaseId,
        body: &str,
        decided_by: &str,
    ) -> Result<DecisionOutcome, CaseworkError> {
        match parse_decision_reply(body, Some(case_id)) {
            Ok(parsed) => {
                self.decide(DecisionInput {
                    case_id,
                    decision: parsed.decision,
                    support_flag: parsed.support_flag,
                    reason: parsed.reason,
                    decided_by: decided_by.to_string(),
                })
                .await
            }
            Err(err) => {
                let code = err.code();
                debug!(case_id = %case_id, code, "decision reply did not parse");
                let rejection = self
                    .db
                    .write(move |tx| {
                        let Some(case) = cases::get(tx, case_id)? else {
                            return Ok(not_found(case_id));
                        };
                        reject(tx, &case, "decision", Rejection::new(RejectionCode::Invalid, code))
                    })
                    .await?;
                Ok(DecisionOutcome::Rejected(rejection))
            }
        }
    }

    /// Apply the scheduling desk's reply to a case waiting for an appointment.
    ///
    /// A reply that does not follow the template keeps the case in
    /// `WAIT_APPT` and enqueues a re-prompt carrying the parse error code.
    pub async fn scheduling_reply(
        &self,
        case_id: CaseId,
        body: &str,
    ) -> Result<SchedulingOutcome, CaseworkError> {
        let max_attempts = self.max_attempts();
        let parsed = parse_scheduling_reply(body, case_id);
        let outcome = self
            .db
            .write(move |tx| {
                let Some(case) = cases::get(tx, case_id)? else {
                    return Ok(SchedulingOutcome::Rejected(not_found(case_id)));
                };
                if case.status != CaseStatus::WaitAppt {
                    return reject(tx, &case, "scheduling_reply", wrong_state(case.status))
                        .map(SchedulingOutcome::Rejected);
                }

                let parsed = match parsed {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        let reason = err.code().to_string();
                        cases::transition(tx, case_id, CaseStatus::WaitAppt, CaseStatus::WaitAppt)?;
                        events::append(
                            tx,
                            &NewEvent::human(case_id, CaseEventKind::SchedulingReplyInvalid)
                                .transition(CaseStatus::WaitAppt, CaseStatus::WaitAppt)
                                .with_payload(json!({ "reason": reason })),
                        )?;
                        let job_id = enqueue_in(
                            tx,
                            case_id,
                            &JobPayload::RepromptScheduling {
                                reason: reason.clone(),
                            },
                            max_attempts,
                            None,
                        )?;
                        return Ok(SchedulingOutcome::Reprompted { reason, job_id });
                    }
                };

                let at = match &parsed {
                    ParsedScheduling::Confirmed { at, .. } => {
                        at.format(APPOINTMENT_AT_FORMAT).to_string()
                    }
                    ParsedScheduling::Denied { .. } => String::new(),
                };
                let (target, fields, payload, next) = match &parsed {
                    ParsedScheduling::Confirmed {
                        location,
                        instructions,
                        ..
                    } => (
                        CaseStatus::ApptConfirmed,
                        AppointmentFields::Confirmed {
                            at: &at,
                            location,
                            instructions,
                        },
                        json!({
                            "appointment_status": "confirmed",
                            "appointment_at": at,
                            "location": location,
                            "instructions": instructions,
                        }),
                        JobPayload::PostFinalAppointment,
                    ),
                    ParsedScheduling::Denied { reason, .. } => (
                        CaseStatus::ApptDenied,
                        AppointmentFields::Denied {
                            reason: reason.as_deref(),
                        },
                        json!({ "appointment_status": "denied", "reason": reason }),
                        JobPayload::PostFinalAppointmentDenied,
                    ),
                };
                if !cases::record_appointment(tx, case_id, &fields, target)? {
                    return reject(tx, &case, "scheduling_reply", wrong_state(case.status))
                        .map(SchedulingOutcome::Rejected);
                }
                events::append(
                    tx,
                    &NewEvent::human(case_id, CaseEventKind::SchedulingReplyRecorded)
                        .transition(CaseStatus::WaitAppt, target)
                        .with_payload(payload),
                )?;
                let job_id = enqueue_in(tx, case_id, &next, max_attempts, None)?;
                Ok(match target {
                    CaseStatus::ApptConfirmed => SchedulingOutcome::Confirmed { job_id },
                    _ => SchedulingOutcome::Denied { job_id },
                })
            })
            .await?;

        match &outcome {
            SchedulingOutcome::Rejected(rejection) => {
                warn!(case_id = %case_id, %rejection, "scheduling reply rejected");
            }
            SchedulingOutcome::Reprompted { reason, .. } => {
                info!(case_id = %case_id, reason = %reason, "scheduling reply invalid, re-prompting");
            }
            other => info!(case_id = %case_id, outcome = ?other, "scheduling reply recorded"),
        }
        Ok(outcome)
    }

    /// Observe a reaction on a tracked message.
    ///
    /// A thumbs-up on the final reply triggers cleanup exactly once per case;
    /// every other reaction is audited and otherwise ignored.
    pub async fn reaction(&self, reaction: Reaction) -> Result<ReactionOutcome, CaseworkError> {
        let max_attempts = self.max_attempts();
        let case_id = reaction.case_id;
        let outcome = self
            .db
            .write(move |tx| {
                let Some(case) = cases::get(tx, reaction.case_id)? else {
                    return Ok(ReactionOutcome::Rejected(not_found(reaction.case_id)));
                };
                events::append(
                    tx,
                    &NewEvent::human(case.id, CaseEventKind::ReactionObserved).with_payload(json!({
                        "message_role": reaction.message_role.as_ref(),
                        "reaction_kind": reaction.reaction_kind.as_ref(),
                        "reacted_by": reaction.reacted_by,
                    })),
                )?;
                if reaction.message_role != MessageRole::FinalReply
                    || reaction.reaction_kind != ReactionKind::ThumbsUp
                {
                    return Ok(ReactionOutcome::Ignored);
                }

                if !cases::trigger_cleanup(tx, case.id)? {
                    if case.milestones.cleanup_triggered_at.is_some() {
                        return Ok(ReactionOutcome::AlreadyTriggered);
                    }
                    return reject(tx, &case, "reaction", wrong_state(case.status))
                        .map(ReactionOutcome::Rejected);
                }

                if let Some(message) =
                    messages::latest_with_role(tx, case.id, MessageRole::FinalReply)?
                {
                    messages::record_reaction(
                        tx,
                        message.id,
                        reaction.reaction_kind,
                        &reaction.reacted_by,
                    )?;
                }
                events::append(
                    tx,
                    &NewEvent::human(case.id, CaseEventKind::CleanupTriggered)
                        .transition(CaseStatus::WaitR1CleanupThumbs, CaseStatus::CleanupRunning)
                        .with_payload(json!({ "reacted_by": reaction.reacted_by })),
                )?;
                let job_id =
                    enqueue_in(tx, case.id, &JobPayload::ExecuteCleanup, max_attempts, None)?;
                Ok(ReactionOutcome::CleanupTriggered { job_id })
            })
            .await?;

        match &outcome {
            ReactionOutcome::CleanupTriggered { job_id } => {
                info!(case_id = %case_id, job_id = %job_id, "cleanup triggered");
            }
            ReactionOutcome::Rejected(rejection) => {
                warn!(case_id = %case_id, %rejection, "reaction rejected");
            }
            other => debug!(case_id = %case_id, outcome = ?other, "reaction observed"),
        }
        Ok(outcome)
    }

    // --- job results ---

    /// Apply a successful handler result.
    ///
    /// Stores the artifact or posted message, completes the job, walks the
    /// step's success transitions, and enqueues its follow-up. A case that has
    /// left the step's status turns this into a stale skip.
    pub async fn complete_step(
        &self,
        job: &Job,
        output: StepOutput,
    ) -> Result<StepCompletion, CaseworkError> {
        if !output.fits(job.job_type) {
            return Err(CaseworkError::Validation(format!(
                "{} cannot produce a `{}` result",
                job.job_type,
                output.kind()
            )));
        }
        let max_attempts = self.max_attempts();
        let (job_id, case_id, job_type) = (job.id, job.case_id, job.job_type);
        let spec = machine::step(job_type);

        let guarded = self
            .db
            .write(move |tx| {
                let Some(job) = jobs::get(tx, job_id)? else {
                    return Ok(Guarded::JobMissing);
                };
                if job.status != JobStatus::Running {
                    return Ok(Guarded::JobState(job.status));
                }
                let Some(status) = cases::status(tx, case_id)? else {
                    return Ok(Guarded::CaseMissing);
                };
                if status != spec.runs_in {
                    complete_stale(tx, &job, status)?;
                    return Ok(Guarded::Done(StepCompletion::SkippedStale { status }));
                }

                store_output(tx, &job, output)?;
                jobs::complete(tx, job_id)?;
                events::append(
                    tx,
                    &NewEvent::system(case_id, CaseEventKind::JobCompleted).with_payload(json!({
                        "job_id": job_id.0,
                        "job_type": job_type.as_ref(),
                        "attempts": job.attempts,
                    })),
                )?;

                let mut current = status;
                for next in spec.on_success {
                    if !advance(tx, case_id, current, *next)? {
                        // The status was read in this transaction.
                        return Err(rusqlite::Error::StatementChangedRows(0));
                    }
                    current = *next;
                }

                let follow_up = match spec.follow_up.and_then(JobPayload::unit) {
                    Some(payload) => Some(enqueue_in(tx, case_id, &payload, max_attempts, None)?),
                    None => None,
                };
                Ok(Guarded::Done(StepCompletion::Advanced {
                    status: current,
                    follow_up,
                }))
            })
            .await?;

        let completion = guarded.into_result(case_id, job_id)?;
        match completion {
            StepCompletion::Advanced { status, follow_up } => info!(
                case_id = %case_id,
                job_id = %job_id,
                job_type = %job_type,
                status = %status,
                follow_up = ?follow_up.map(|id| id.0),
                "step completed"
            ),
            StepCompletion::SkippedStale { status } => warn!(
                case_id = %case_id,
                job_id = %job_id,
                job_type = %job_type,
                status = %status,
                "stale step skipped"
            ),
        }
        Ok(completion)
    }

    /// Record a failed handler attempt.
    ///
    /// A dead-lettered required step fails its case (when the case is still
    /// in the step's status) and enqueues the failure notice.
    pub async fn fail_step(
        &self,
        job: &Job,
        error: &str,
        retriable: bool,
    ) -> Result<StepFailure, CaseworkError> {
        let policy = *self.queue.policy();
        let (job_id, case_id, job_type) = (job.id, job.case_id, job.job_type);
        let error = error.to_string();

        let guarded = self
            .db
            .write(move |tx| {
                let outcome = jobs::fail(tx, job_id, &error, retriable, &policy)?;
                let dead_after = match &outcome {
                    FailOutcome::Missing => return Ok(Guarded::JobMissing),
                    FailOutcome::WrongStatus(status) => return Ok(Guarded::JobState(*status)),
                    FailOutcome::Retrying {
                        attempts,
                        run_after,
                    } => {
                        events::append(
                            tx,
                            &NewEvent::system(case_id, CaseEventKind::JobRetryScheduled)
                                .with_payload(json!({
                                    "job_id": job_id.0,
                                    "job_type": job_type.as_ref(),
                                    "attempts": attempts,
                                    "run_after": run_after,
                                    "error": error,
                                })),
                        )?;
                        None
                    }
                    FailOutcome::Dead { attempts } => Some(*attempts),
                };
                let Some(attempts) = dead_after else {
                    return Ok(Guarded::Done(StepFailure {
                        outcome,
                        failure_notice: None,
                    }));
                };

                events::append(
                    tx,
                    &NewEvent::system(case_id, CaseEventKind::JobDeadLettered).with_payload(json!({
                        "job_id": job_id.0,
                        "job_type": job_type.as_ref(),
                        "attempts": attempts,
                        "retriable": retriable,
                        "error": error,
                    })),
                )?;

                let spec = machine::step(job_type);
                let failure_notice = if spec.required {
                    fail_case(tx, case_id, spec.runs_in, job_type, &error, policy.max_attempts)?
                } else {
                    None
                };
                Ok(Guarded::Done(StepFailure {
                    outcome,
                    failure_notice,
                }))
            })
            .await?;

        let failure = guarded.into_result(case_id, job_id)?;
        match &failure.outcome {
            FailOutcome::Retrying {
                attempts,
                run_after,
            } => info!(
                case_id = %case_id,
                job_id = %job_id,
                job_type = %job_type,
                attempts,
                run_after = %run_after,
                "step failed, retry scheduled"
            ),
            _ => warn!(
                case_id = %case_id,
                job_id = %job_id,
                job_type = %job_type,
                case_failed = failure.failure_notice.is_some(),
                "step dead-lettered"
            ),
        }
        Ok(failure)
    }

    /// Complete a claimed job whose case left the step's status, without
    /// running it.
    pub async fn skip_stale(&self, job: &Job) -> Result<CaseStatus, CaseworkError> {
        let (job_id, case_id) = (job.id, job.case_id);
        let guarded = self
            .db
            .write(move |tx| {
                let Some(job) = jobs::get(tx, job_id)? else {
                    return Ok(Guarded::JobMissing);
                };
                if job.status != JobStatus::Running {
                    return Ok(Guarded::JobState(job.status));
                }
                let Some(status) = cases::status(tx, case_id)? else {
                    return Ok(Guarded::CaseMissing);
                };
                complete_stale(tx, &job, status)?;
                Ok(Guarded::Done(status))
            })
            .await?;
        let status = guarded.into_result(case_id, job_id)?;
        warn!(case_id = %case_id, job_id = %job_id, status = %status, "stale step skipped");
        Ok(status)
    }

    // --- recovery ---

    /// Re-enqueue the work a case is owed after a crash.
    ///
    /// Returns `None` when the case has an active job, waits on a human, or
    /// is finished.
    pub async fn resume_case(&self, case_id: CaseId) -> Result<Option<Resumed>, CaseworkError> {
        let max_attempts = self.max_attempts();
        let resumed = self
            .db
            .write(move |tx| {
                let Some(case) = cases::get(tx, case_id)? else {
                    return Ok(None);
                };
                if case.status == CaseStatus::Cleaned || jobs::has_active(tx, case_id)? {
                    return Ok(None);
                }

                let plan = machine::resume_plan(
                    case.status,
                    case.milestones.cleanup_triggered_at.is_some(),
                );
                let payload = match plan {
                    ResumePlan::Nothing => return Ok(None),
                    ResumePlan::Enqueue(job_type) => JobPayload::unit(job_type),
                    ResumePlan::Advance { to, job_type } => {
                        if !advance(tx, case_id, case.status, to)? {
                            return Ok(None);
                        }
                        JobPayload::unit(job_type)
                    }
                    ResumePlan::FailureNotice => {
                        if jobs::exists_for_case(tx, case_id, JobType::PostFinalFailure)? {
                            return Ok(None);
                        }
                        Some(failure_notice_payload(tx, case_id)?)
                    }
                };
                let Some(payload) = payload else {
                    return Ok(None);
                };

                let job_type = payload.job_type();
                let job_id = enqueue_in(tx, case_id, &payload, max_attempts, None)?;
                events::append(
                    tx,
                    &NewEvent::system(case_id, CaseEventKind::RecoveryJobEnqueued).with_payload(
                        json!({
                            "job_id": job_id.0,
                            "job_type": job_type.as_ref(),
                            "status": case.status.as_ref(),
                        }),
                    ),
                )?;
                Ok(Some(Resumed { job_type, job_id }))
            })
            .await?;

        if let Some(resumed) = resumed {
            info!(
                case_id = %case_id,
                job_id = %resumed.job_id,
                job_type = %resumed.job_type,
                "case resumed"
            );
        }
        Ok(resumed)
    }

    /// Ids of every case recovery has to look at, oldest first.
    pub async fn recoverable_cases(&self) -> Result<Vec<CaseId>, CaseworkError> {
        let cases = self.db.read(cases::list_recoverable).await?;
        Ok(cases.into_iter().map(|case| case.id).collect())
    }

    // --- reads ---

    pub async fn case(&self, case_id: CaseId) -> Result<Option<Case>, CaseworkError> {
        self.db.read(move |c| cases::get(c, case_id)).await
    }

    pub async fn recent_cases(
        &self,
        status: Option<CaseStatus>,
        limit: usize,
    ) -> Result<Vec<Case>, CaseworkError> {
        self.db.read(move |c| cases::list_recent(c, status, limit)).await
    }

    /// Audit log of a case in insertion order.
    pub async fn events(&self, case_id: CaseId) -> Result<Vec<CaseEvent>, CaseworkError> {
        self.db.read(move |c| events::list_for_case(c, case_id)).await
    }

    pub async fn messages(&self, case_id: CaseId) -> Result<Vec<CaseMessage>, CaseworkError> {
        self.db.read(move |c| messages::list_for_case(c, case_id)).await
    }

    pub async fn jobs(&self, case_id: CaseId) -> Result<Vec<Job>, CaseworkError> {
        self.queue.list_for_case(case_id).await
    }
}

/// Transition along a graph edge and audit it. Returns whether it applied.
fn advance(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    from: CaseStatus,
    to: CaseStatus,
) -> rusqlite::Result<bool> {
    if !machine::is_legal_edge(from, to) {
        warn!(case_id = %case_id, from = %from, to = %to, "refusing illegal transition");
        return Ok(false);
    }
    if !cases::transition(conn, case_id, from, to)? {
        return Ok(false);
    }
    events::append(
        conn,
        &NewEvent::system(case_id, CaseEventKind::StatusChanged).transition(from, to),
    )?;
    Ok(true)
}

/// Audit a refused event and build its rejection.
fn reject(
    conn: &rusqlite::Connection,
    case: &Case,
    event: &str,
    rejection: Rejection,
) -> rusqlite::Result<Rejection> {
    events::append(
        conn,
        &NewEvent::human(case.id, CaseEventKind::EventRejected).with_payload(json!({
            "event": event,
            "code": rejection.code,
            "detail": rejection.detail,
            "status": case.status.as_ref(),
        })),
    )?;
    Ok(rejection)
}

fn not_found(case_id: CaseId) -> Rejection {
    Rejection::new(RejectionCode::NotFound, format!("case {case_id}"))
}

fn wrong_state(status: CaseStatus) -> Rejection {
    Rejection::new(RejectionCode::WrongState, format!("case is {status}"))
}

fn complete_stale(
    conn: &rusqlite::Connection,
    job: &Job,
    status: CaseStatus,
) -> rusqlite::Result<()> {
    jobs::complete(conn, job.id)?;
    events::append(
        conn,
        &NewEvent::system(job.case_id, CaseEventKind::StepSkippedStale).with_payload(json!({
            "job_id": job.id.0,
            "job_type": job.job_type.as_ref(),
            "expected_status": machine::step(job.job_type).runs_in.as_ref(),
            "actual_status": status.as_ref(),
        })),
    )?;
    Ok(())
}

fn posted_milestone(job_type: JobType) -> Option<Milestone> {
    match job_type {
        JobType::AckIntake => Some(Milestone::AckPosted),
        JobType::PostDecisionWidget => Some(Milestone::WidgetPosted),
        JobType::PostSchedulingRequest => Some(Milestone::RequestPosted),
        JobType::PostFinalDenial
        | JobType::PostFinalAppointment
        | JobType::PostFinalAppointmentDenied => Some(Milestone::FinalReplyPosted),
        _ => None,
    }
}

/// Persist what a step produced.
fn store_output(conn: &rusqlite::Connection, job: &Job, output: StepOutput) -> rusqlite::Result<()> {
    let case_id = job.case_id;
    match output {
        StepOutput::Posted { room_id, event_id } => {
            if let Some(role) = posted_role(job.job_type) {
                if messages::insert(conn, case_id, &room_id, &event_id, role)?.is_none() {
                    debug!(case_id = %case_id, event_id = %event_id, "message already tracked");
                }
                events::append(
                    conn,
                    &NewEvent::system(case_id, CaseEventKind::MessagePosted).with_payload(json!({
                        "job_id": job.id.0,
                        "role": role.as_ref(),
                        "room_id": room_id,
                        "event_id": event_id,
                    })),
                )?;
            }
            if let Some(milestone) = posted_milestone(job.job_type) {
                cases::mark_milestone(conn, case_id, milestone)?;
            }
        }
        StepOutput::Extracted {
            text,
            record_number,
        } => {
            cases::store_extraction(conn, case_id, &text, record_number.as_deref())?;
            artifact_stored(
                conn,
                case_id,
                json!({
                    "artifact": "extracted_text",
                    "chars": text.chars().count(),
                    "record_number": record_number,
                }),
            )?;
        }
        StepOutput::Structured(structured) => {
            cases::store_structure(conn, case_id, &structured.data, &structured.summary)?;
            artifact_stored(conn, case_id, json!({ "artifact": "structured_data" }))?;
        }
        StepOutput::Suggested { suggestion } => {
            cases::store_suggestion(conn, case_id, &suggestion)?;
            artifact_stored(conn, case_id, json!({ "artifact": "suggestion" }))?;
        }
        StepOutput::Cleaned { redacted, failed } => {
            for event_id in &redacted {
                events::append(
                    conn,
                    &NewEvent::system(case_id, CaseEventKind::MessageRedacted)
                        .with_payload(json!({ "event_id": event_id })),
                )?;
            }
            for (event_id, error) in &failed {
                events::append(
                    conn,
                    &NewEvent::system(case_id, CaseEventKind::MessageRedactionFailed)
                        .with_payload(json!({ "event_id": event_id, "error": error })),
                )?;
            }
            cases::mark_milestone(conn, case_id, Milestone::CleanupCompleted)?;
            events::append(
                conn,
                &NewEvent::system(case_id, CaseEventKind::CleanupCompleted).with_payload(json!({
                    "redacted": redacted.len(),
                    "failed": failed.len(),
                })),
            )?;
        }
    }
    Ok(())
}

fn artifact_stored(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    payload: serde_json::Value,
) -> rusqlite::Result<()> {
    events::append(
        conn,
        &NewEvent::system(case_id, CaseEventKind::ArtifactStored).with_payload(payload),
    )?;
    Ok(())
}

/// Move a case to `FAILED` after its required step died, and enqueue the
/// failure notice. Does nothing when the case already left `runs_in`.
fn fail_case(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    runs_in: CaseStatus,
    job_type: JobType,
    error: &str,
    max_attempts: u32,
) -> rusqlite::Result<Option<JobId>> {
    if !advance(conn, case_id, runs_in, CaseStatus::Failed)? {
        return Ok(None);
    }
    cases::mark_milestone(conn, case_id, Milestone::Failed)?;
    let cause = FailureCause::categorize(job_type, error);
    events::append(
        conn,
        &NewEvent::system(case_id, CaseEventKind::CaseFailed)
            .transition(runs_in, CaseStatus::Failed)
            .with_payload(json!({
                "cause": cause.as_ref(),
                "job_type": job_type.as_ref(),
                "error": error,
            })),
    )?;
    let payload = JobPayload::PostFinalFailure {
        cause: cause.to_string(),
        details: Some(error.chars().take(FAILURE_DETAILS_MAX_CHARS).collect()),
    };
    enqueue_in(conn, case_id, &payload, max_attempts, None).map(Some)
}

/// Rebuild the failure notice from the last `CASE_FAILED` audit entry.
fn failure_notice_payload(
    conn: &rusqlite::Connection,
    case_id: CaseId,
) -> rusqlite::Result<JobPayload> {
    let failed = events::list_for_case(conn, case_id)?
        .into_iter()
        .rev()
        .find(|event| event.kind == CaseEventKind::CaseFailed);
    let (cause, details) = match failed {
        Some(event) => (
            event.payload["cause"].as_str().unwrap_or("other").to_string(),
            event.payload["error"].as_str().map(str::to_string),
        ),
        None => (FailureCause::Other.to_string(), None),
    };
    Ok(JobPayload::PostFinalFailure { cause, details })
}
