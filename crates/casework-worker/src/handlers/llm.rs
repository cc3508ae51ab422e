// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language model steps.

use async_trait::async_trait;
use casework_core::{Case, JobPayload};
use casework_workflow::StepOutput;

use crate::context::HandlerContext;
use crate::handler::{HandlerError, JobHandler};

pub struct StructureCase;

#[async_trait]
impl JobHandler for StructureCase {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        let text = case
            .extracted_text
            .as_deref()
            .ok_or_else(|| HandlerError::permanent("case has no extracted text"))?;
        let structured = ctx.llm.structure(text).await?;
        Ok(StepOutput::Structured(structured))
    }
}

pub struct SuggestAction;

#[async_trait]
impl JobHandler for SuggestAction {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        let (Some(data), Some(summary)) = (&case.structured_data, &case.summary) else {
            return Err(HandlerError::permanent("case has no structured data"));
        };
        let suggestion = ctx.llm.suggest(data, summary).await?;
        Ok(StepOutput::Suggested { suggestion })
    }
}
