// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intake room acknowledgement and document extraction.

use async_trait::async_trait;
use casework_core::{Case, JobPayload};
use casework_workflow::StepOutput;
use tracing::{debug, warn};

use crate::context::HandlerContext;
use crate::handler::{HandlerError, JobHandler};
use crate::record_number;
use crate::templates;

/// Replies to the intake message so the sender knows the case exists.
pub struct AckIntake;

#[async_trait]
impl JobHandler for AckIntake {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        let event_id = ctx
            .chat
            .reply_to(&case.origin_room_id, &case.origin_id, &templates::ack(case))
            .await?;
        Ok(StepOutput::Posted {
            room_id: case.origin_room_id.clone(),
            event_id,
        })
    }
}

/// Downloads the referral document and extracts its text.
pub struct ExtractDocument;

#[async_trait]
impl JobHandler for ExtractDocument {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        let document = ctx
            .chat
            .download_media(&case.document_url)
            .await
            .map_err(|e| HandlerError::from(e).during("download"))?;
        debug!(case_id = %case.id, bytes = document.len(), "document downloaded");

        let text = ctx
            .extractor
            .extract_text(&document)
            .await
            .map_err(|e| HandlerError::from(e).during("extract"))?;
        if text.trim().is_empty() {
            return Err(
                HandlerError::permanent("document contains no extractable text").during("extract"),
            );
        }

        let Some(watermark) = record_number::extract_and_strip(&text) else {
            warn!(case_id = %case.id, "no record number watermark found");
            return Err(HandlerError::permanent("no 5-digit record number in document")
                .during("record_extract"));
        };
        Ok(StepOutput::Extracted {
            text: watermark.cleaned_text,
            record_number: Some(watermark.record_number),
        })
    }
}
