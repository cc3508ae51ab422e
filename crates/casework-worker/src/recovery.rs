// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boot-time reconciliation of the store.
//!
//! A worker that dies mid-job leaves the job `running`, and a crash between a
//! human event and its follow-up can leave a case with nothing queued. Boot
//! recovery resets the former and re-enqueues work for the latter before the
//! loop starts polling.

use casework_core::{CaseId, CaseworkError, JobId, JobType};
use casework_workflow::Workflow;
use serde::Serialize;
use tracing::{info, warn};

/// What a recovery pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Jobs returned from `running` to `queued`.
    pub orphaned_reset: usize,
    pub scanned_cases: usize,
    pub resumed: Vec<ResumedCase>,
    /// Cases whose resume failed; retried on the next boot.
    pub failed_cases: Vec<CaseId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumedCase {
    pub case_id: CaseId,
    pub job_type: JobType,
    pub job_id: JobId,
}

pub struct BootRecovery {
    workflow: Workflow,
}

impl BootRecovery {
    pub fn new(workflow: Workflow) -> Self {
        Self { workflow }
    }

    /// Run once, before the worker loop polls.
    ///
    /// Only safe while no other worker is executing jobs on the same store:
    /// their `running` jobs would be reset too.
    pub async fn run(&self) -> Result<RecoveryReport, CaseworkError> {
        let orphaned_reset = self.workflow.queue().reset_orphaned().await?;
        if orphaned_reset > 0 {
            warn!(count = orphaned_reset, "orphaned running jobs reset to queued");
        }

        let case_ids = self.workflow.recoverable_cases().await?;
        let mut report = RecoveryReport {
            orphaned_reset,
            scanned_cases: case_ids.len(),
            ..Default::default()
        };

        for case_id in case_ids {
            match self.workflow.resume_case(case_id).await {
                Ok(Some(resumed)) => report.resumed.push(ResumedCase {
                    case_id,
                    job_type: resumed.job_type,
                    job_id: resumed.job_id,
                }),
                Ok(None) => {}
                Err(e) => {
                    warn!(case_id = %case_id, error = %e, "case recovery failed");
                    report.failed_cases.push(case_id);
                }
            }
        }

        info!(
            orphaned_reset = report.orphaned_reset,
            scanned = report.scanned_cases,
            resumed = report.resumed.len(),
            failed = report.failed_cases.len(),
            "boot recovery finished"
        );
        Ok(report)
    }
}
