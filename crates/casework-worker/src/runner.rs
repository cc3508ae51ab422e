// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker loop.
//!
//! Each tick claims at most one due job, runs its handler inline, and hands
//! the result to the workflow. The loop sleeps only when the queue is idle or
//! the store is unavailable, and never exits because of a job.
//!
//! Only handler outcomes count against a job's attempts. When the store fails
//! after a claim the job is put back in the queue as it was; if even that
//! write fails, the job id is kept and requeued before the next claim.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use casework_core::{CaseworkError, Job, JobId, JobPayload, JobType};
use casework_storage::FailOutcome;
use casework_workflow::{StepCompletion, Workflow, step};
use futures::FutureExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::HandlerContext;
use crate::handler::HandlerError;
use crate::registry::HandlerRegistry;

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No job was due.
    Idle,
    Completed { job_id: JobId, job_type: JobType },
    /// The case had left the job's status; the job was completed unrun.
    SkippedStale { job_id: JobId, job_type: JobType },
    /// The attempt failed. `dead` is false when a retry was scheduled.
    Failed {
        job_id: JobId,
        job_type: JobType,
        dead: bool,
    },
}

pub struct WorkerLoop {
    workflow: Workflow,
    registry: HandlerRegistry,
    ctx: HandlerContext,
    poll_interval: Duration,
    /// Claimed jobs whose requeue could not be written yet.
    stranded: Mutex<Vec<JobId>>,
}

impl WorkerLoop {
    pub fn new(
        workflow: Workflow,
        registry: HandlerRegistry,
        ctx: HandlerContext,
        poll_interval: Duration,
    ) -> Self {
        Self {
            workflow,
            registry,
            ctx,
            poll_interval,
            stranded: Mutex::new(Vec::new()),
        }
    }

    /// Poll until `cancel` fires. The job in flight finishes first.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "worker loop started"
        );
        while !cancel.is_cancelled() {
            let pause = match self.tick().await {
                Ok(TickOutcome::Idle) => true,
                Ok(_) => false,
                Err(e) => {
                    warn!(error = %e, "worker tick failed, pausing until next poll");
                    true
                }
            };
            if pause {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        info!("worker loop stopped");
    }

    /// Run ticks until no job is due. Returns every non-idle outcome.
    pub async fn run_until_idle(&self) -> Result<Vec<TickOutcome>, CaseworkError> {
        let mut outcomes = Vec::new();
        loop {
            match self.tick().await? {
                TickOutcome::Idle => return Ok(outcomes),
                outcome => outcomes.push(outcome),
            }
        }
    }

    /// Claim and process at most one due job.
    ///
    /// Errors are store failures; the caller should pause before the next
    /// tick. A store failure after the claim requeues the job without
    /// charging an attempt and is still returned as an error.
    pub async fn tick(&self) -> Result<TickOutcome, CaseworkError> {
        self.requeue_stranded().await?;

        let Some(job) = self.workflow.queue().claim_next_due().await? else {
            return Ok(TickOutcome::Idle);
        };
        debug!(
            job_id = %job.id,
            case_id = %job.case_id,
            job_type = %job.job_type,
            attempt = job.attempts + 1,
            "job claimed"
        );

        match self.process(&job).await {
            Ok(outcome) => Ok(outcome),
            Err(e @ CaseworkError::Storage { .. }) => {
                error!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    error = %e,
                    "store failed after claim"
                );
                self.requeue(job.id).await;
                Err(e)
            }
            Err(e) => {
                error!(
                    job_id = %job.id,
                    job_type = %job.job_type,
                    error = %e,
                    "job processing failed"
                );
                match self.fail(&job, &e.to_string(), true).await {
                    Ok(outcome) => Ok(outcome),
                    Err(fail_err) => {
                        error!(job_id = %job.id, error = %fail_err, "could not record failure");
                        self.requeue(job.id).await;
                        Err(e)
                    }
                }
            }
        }
    }

    /// Requeue a claimed job, or remember it when the store is still down.
    async fn requeue(&self, job_id: JobId) {
        match self.workflow.queue().requeue(job_id).await {
            Ok(_) => warn!(job_id = %job_id, "job requeued without charging an attempt"),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "requeue failed, retrying next tick");
                self.stranded.lock().await.push(job_id);
            }
        }
    }

    async fn requeue_stranded(&self) -> Result<(), CaseworkError> {
        let mut stranded = self.stranded.lock().await;
        while let Some(job_id) = stranded.last().copied() {
            self.workflow.queue().requeue(job_id).await?;
            stranded.pop();
            info!(job_id = %job_id, "stranded job requeued");
        }
        Ok(())
    }

    async fn process(&self, job: &Job) -> Result<TickOutcome, CaseworkError> {
        let payload = match JobPayload::decode(job.job_type, &job.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "payload does not match job type");
                return self.fail(job, &e.to_string(), false).await;
            }
        };

        let Some(case) = self.workflow.case(job.case_id).await? else {
            return self
                .fail(job, &format!("case {} not found", job.case_id), false)
                .await;
        };
        if case.status != step(job.job_type).runs_in {
            self.workflow.skip_stale(job).await?;
            return Ok(TickOutcome::SkippedStale {
                job_id: job.id,
                job_type: job.job_type,
            });
        }

        let handler = self.registry.get(job.job_type);
        let result = match AssertUnwindSafe(handler.handle(&self.ctx, &case, &payload))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(job_id = %job.id, job_type = %job.job_type, panic = %message, "handler panicked");
                Err(HandlerError::Permanent(format!("handler panicked: {message}")))
            }
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => return self.fail(job, e.message(), e.is_retriable()).await,
        };
        match self.workflow.complete_step(job, output).await {
            Ok(StepCompletion::Advanced { .. }) => Ok(TickOutcome::Completed {
                job_id: job.id,
                job_type: job.job_type,
            }),
            Ok(StepCompletion::SkippedStale { .. }) => Ok(TickOutcome::SkippedStale {
                job_id: job.id,
                job_type: job.job_type,
            }),
            Err(CaseworkError::Validation(message)) => self.fail(job, &message, false).await,
            Err(e) => Err(e),
        }
    }

    async fn fail(
        &self,
        job: &Job,
        error: &str,
        retriable: bool,
    ) -> Result<TickOutcome, CaseworkError> {
        let failure = self.workflow.fail_step(job, error, retriable).await?;
        Ok(TickOutcome::Failed {
            job_id: job.id,
            job_type: job.job_type,
            dead: matches!(failure.outcome, FailOutcome::Dead { .. }),
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
