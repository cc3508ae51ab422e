// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable job queue.
//!
//! [`JobQueue`] wraps the storage job queries with the configured retry
//! policy and turns guard outcomes into errors. [`enqueue_in`] is the
//! transaction-scoped form used by the engine so a transition and its
//! follow-up job commit together.

use std::time::Duration;

use casework_core::{
    CaseEventKind, CaseId, CaseworkError, Job, JobId, JobPayload, JobStatus, RetryPolicy,
};
use casework_storage::queries::{events, jobs};
use casework_storage::{CompleteOutcome, Database, FailOutcome, NewEvent};
use tracing::{debug, info, warn};

/// Serialize a payload inside a write closure.
pub(crate) fn encode_payload(payload: &JobPayload) -> rusqlite::Result<String> {
    serde_json::to_string(payload).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Insert a job and audit `JOB_ENQUEUED` on the current transaction.
pub fn enqueue_in(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    payload: &JobPayload,
    max_attempts: u32,
    delay: Option<Duration>,
) -> rusqlite::Result<JobId> {
    let job_type = payload.job_type();
    let encoded = encode_payload(payload)?;
    let job_id = jobs::insert(conn, case_id, job_type, &encoded, max_attempts, delay)?;
    events::append(
        conn,
        &NewEvent::system(case_id, CaseEventKind::JobEnqueued).with_payload(serde_json::json!({
            "job_id": job_id.0,
            "job_type": job_type.as_ref(),
        })),
    )?;
    debug!(case_id = %case_id, job_id = %job_id, job_type = %job_type, "job enqueued");
    Ok(job_id)
}

/// Queue handle: a store handle plus the retry policy.
#[derive(Clone)]
pub struct JobQueue {
    db: Database,
    policy: RetryPolicy,
}

impl JobQueue {
    pub fn new(db: Database, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Enqueue a job due now, or after `delay`.
    pub async fn enqueue(
        &self,
        case_id: CaseId,
        payload: JobPayload,
        delay: Option<Duration>,
    ) -> Result<JobId, CaseworkError> {
        let max_attempts = self.policy.max_attempts;
        self.db
            .write(move |tx| enqueue_in(tx, case_id, &payload, max_attempts, delay))
            .await
    }

    /// Claim the next due job, if any, and mark it `running`.
    pub async fn claim_next_due(&self) -> Result<Option<Job>, CaseworkError> {
        self.db.write(|tx| jobs::claim_next_due(tx)).await
    }

    /// Move a `running` job to `done`. Completing a `done` job is a no-op.
    pub async fn complete(&self, job_id: JobId) -> Result<(), CaseworkError> {
        let outcome = self.db.write(move |tx| jobs::complete(tx, job_id)).await?;
        match outcome {
            CompleteOutcome::Completed => Ok(()),
            CompleteOutcome::AlreadyDone => {
                debug!(job_id = %job_id, "job already done");
                Ok(())
            }
            CompleteOutcome::WrongStatus(status) => Err(invalid_state(job_id, status)),
            CompleteOutcome::Missing => Err(missing(job_id)),
        }
    }

    /// Record a failed attempt of a `running` job.
    ///
    /// Returns [`FailOutcome::Retrying`] or [`FailOutcome::Dead`]; the other
    /// variants surface as errors.
    pub async fn fail(
        &self,
        job_id: JobId,
        error: &str,
        retriable: bool,
    ) -> Result<FailOutcome, CaseworkError> {
        let error = error.to_string();
        let policy = self.policy;
        let outcome = self
            .db
            .write(move |tx| jobs::fail(tx, job_id, &error, retriable, &policy))
            .await?;
        match &outcome {
            FailOutcome::WrongStatus(status) => return Err(invalid_state(job_id, *status)),
            FailOutcome::Missing => return Err(missing(job_id)),
            FailOutcome::Retrying {
                attempts,
                run_after,
            } => info!(job_id = %job_id, attempts, run_after = %run_after, "job scheduled for retry"),
            FailOutcome::Dead { attempts } => warn!(job_id = %job_id, attempts, "job dead-lettered"),
        }
        Ok(outcome)
    }

    /// Return every `running` job to `queued`. Returns the number reset.
    pub async fn reset_orphaned(&self) -> Result<usize, CaseworkError> {
        self.db.write(|tx| jobs::reset_orphaned(tx)).await
    }

    /// Return a `running` job to `queued` with its attempt count unchanged.
    /// Returns false when the job was no longer running.
    pub async fn requeue(&self, job_id: JobId) -> Result<bool, CaseworkError> {
        self.db.write(move |tx| jobs::requeue(tx, job_id)).await
    }

    pub async fn has_active_job(&self, case_id: CaseId) -> Result<bool, CaseworkError> {
        self.db.read(move |c| jobs::has_active(c, case_id)).await
    }

    pub async fn get(&self, job_id: JobId) -> Result<Option<Job>, CaseworkError> {
        self.db.read(move |c| jobs::get(c, job_id)).await
    }

    pub async fn list_for_case(&self, case_id: CaseId) -> Result<Vec<Job>, CaseworkError> {
        self.db.read(move |c| jobs::list_for_case(c, case_id)).await
    }

    /// Most recent jobs, optionally filtered by status (e.g. `dead`).
    pub async fn list_by_status(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<Job>, CaseworkError> {
        self.db
            .read(move |c| jobs::list_by_status(c, status, limit))
            .await
    }

    pub async fn counts_by_status(&self) -> Result<Vec<(JobStatus, u64)>, CaseworkError> {
        self.db.read(jobs::counts_by_status).await
    }
}

fn invalid_state(job_id: JobId, status: JobStatus) -> CaseworkError {
    CaseworkError::InvalidJobState {
        job_id: job_id.0,
        status: status.to_string(),
    }
}

fn missing(job_id: JobId) -> CaseworkError {
    CaseworkError::NotFound {
        entity: "job",
        id: job_id.to_string(),
    }
}
