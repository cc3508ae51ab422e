// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborators shared by every handler.

use std::sync::Arc;

use casework_config::model::RoomsConfig;
use casework_core::{ChatAdapter, DocumentExtractor, LlmAdapter};
use casework_workflow::Workflow;

use crate::handlers::RedactionRetry;

/// Everything a handler may call. Created once at startup.
#[derive(Clone)]
pub struct HandlerContext {
    pub chat: Arc<dyn ChatAdapter + Send + Sync>,
    pub llm: Arc<dyn LlmAdapter + Send + Sync>,
    pub extractor: Arc<dyn DocumentExtractor + Send + Sync>,
    pub rooms: RoomsConfig,
    pub workflow: Workflow,
    pub redaction_retry: RedactionRetry,
}

impl HandlerContext {
    pub fn new(
        chat: Arc<dyn ChatAdapter + Send + Sync>,
        llm: Arc<dyn LlmAdapter + Send + Sync>,
        extractor: Arc<dyn DocumentExtractor + Send + Sync>,
        rooms: RoomsConfig,
        workflow: Workflow,
    ) -> Self {
        Self {
            chat,
            llm,
            extractor,
            rooms,
            workflow,
            redaction_retry: RedactionRetry::default(),
        }
    }

    pub fn with_redaction_retry(mut self, retry: RedactionRetry) -> Self {
        self.redaction_retry = retry;
        self
    }
}
