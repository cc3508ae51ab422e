// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the workflow, the worker loop, and mock
//! collaborators over a temp SQLite database. Tests feed external events
//! through [`TestHarness::workflow`] and drive the queue with
//! [`TestHarness::run_until_idle`].

use std::sync::Arc;
use std::time::Duration;

use casework_config::model::RoomsConfig;
use casework_core::{CaseId, CaseStatus, CaseworkError, RetryPolicy};
use casework_storage::Database;
use casework_worker::{
    BootRecovery, HandlerContext, HandlerRegistry, RecoveryReport, RedactionRetry, TickOutcome,
    WorkerLoop,
};
use casework_workflow::{Intake, IntakeOutcome, Workflow};

use crate::mock_chat::MockChat;
use crate::mock_extractor::MockExtractor;
use crate::mock_llm::MockLlm;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    policy: RetryPolicy,
    redaction_retry: RedactionRetry,
    extractor: MockExtractor,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            // Retries are due immediately so `run_until_idle` drains them.
            policy: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::ZERO,
                factor: 2,
                max_delay: Duration::ZERO,
            },
            // Rate-limit waits stay in the low milliseconds.
            redaction_retry: RedactionRetry {
                max_attempts: 5,
                min_delay: Duration::from_millis(1),
            },
            extractor: MockExtractor::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_redaction_retry(mut self, retry: RedactionRetry) -> Self {
        self.redaction_retry = retry;
        self
    }

    pub fn with_extractor(mut self, extractor: MockExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Build the test harness, creating the temp store and all subsystems.
    pub async fn build(self) -> Result<TestHarness, CaseworkError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| CaseworkError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("casework.db");
        let db = Database::open(&db_path.to_string_lossy()).await?;
        let workflow = Workflow::new(db, self.policy);

        let chat = Arc::new(MockChat::new());
        let llm = Arc::new(MockLlm::new());
        let extractor = Arc::new(self.extractor);
        let rooms = RoomsConfig::default();

        let ctx = HandlerContext::new(
            chat.clone(),
            llm.clone(),
            extractor.clone(),
            rooms.clone(),
            workflow.clone(),
        )
        .with_redaction_retry(self.redaction_retry);
        let worker = WorkerLoop::new(
            workflow.clone(),
            HandlerRegistry::new(),
            ctx,
            Duration::from_millis(10),
        );

        Ok(TestHarness {
            workflow,
            worker,
            chat,
            llm,
            extractor,
            rooms,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock collaborators and temp storage.
pub struct TestHarness {
    pub workflow: Workflow,
    pub worker: WorkerLoop,
    pub chat: Arc<MockChat>,
    pub llm: Arc<MockLlm>,
    pub extractor: Arc<MockExtractor>,
    pub rooms: RoomsConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Tick the worker until no job is due.
    pub async fn run_until_idle(&self) -> Result<Vec<TickOutcome>, CaseworkError> {
        self.worker.run_until_idle().await
    }

    /// Run boot recovery against the harness store.
    pub async fn recover(&self) -> Result<RecoveryReport, CaseworkError> {
        BootRecovery::new(self.workflow.clone()).run().await
    }

    /// Submit a document to the intake room.
    pub async fn intake(&self, origin_id: &str) -> Result<IntakeOutcome, CaseworkError> {
        self.workflow
            .intake(Intake {
                origin_id: origin_id.to_string(),
                origin_room_id: self.rooms.intake_room_id.clone(),
                sender_user_id: "@nurse:localhost".to_string(),
                document_url: format!("mxc://localhost/{origin_id}"),
            })
            .await
    }

    /// Intake a document and return the new case id.
    pub async fn create_case(&self, origin_id: &str) -> Result<CaseId, CaseworkError> {
        match self.intake(origin_id).await? {
            IntakeOutcome::Created { case_id, .. } | IntakeOutcome::Duplicate { case_id } => {
                Ok(case_id)
            }
        }
    }

    pub async fn status(&self, case_id: CaseId) -> Result<CaseStatus, CaseworkError> {
        self.workflow
            .case(case_id)
            .await?
            .map(|case| case.status)
            .ok_or_else(|| CaseworkError::NotFound {
                entity: "case",
                id: case_id.to_string(),
            })
    }

    /// The underlying store, for raw assertions.
    pub fn database(&self) -> &Database {
        self.workflow.database()
    }
}
