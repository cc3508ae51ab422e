// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Steps that post a rendered message and nothing else.

use async_trait::async_trait;
use casework_core::{Case, JobPayload, MessageRole};
use casework_workflow::StepOutput;

use super::unexpected;
use crate::context::HandlerContext;
use crate::handler::{HandlerError, JobHandler};
use crate::templates;

/// Post a new message to `room_id`.
async fn post(ctx: &HandlerContext, room_id: &str, body: &str) -> Result<StepOutput, HandlerError> {
    let event_id = ctx.chat.post_message(room_id, body).await?;
    Ok(StepOutput::Posted {
        room_id: room_id.to_string(),
        event_id,
    })
}

/// Reply in the intake room, threaded under the original document.
async fn reply_to_origin(
    ctx: &HandlerContext,
    case: &Case,
    body: &str,
) -> Result<StepOutput, HandlerError> {
    let event_id = ctx
        .chat
        .reply_to(&case.origin_room_id, &case.origin_id, body)
        .await?;
    Ok(StepOutput::Posted {
        room_id: case.origin_room_id.clone(),
        event_id,
    })
}

pub struct PostDecisionWidget;

#[async_trait]
impl JobHandler for PostDecisionWidget {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        if case.suggestion.is_none() {
            return Err(HandlerError::permanent("case has no suggestion"));
        }
        post(ctx, &ctx.rooms.decision_room_id, &templates::decision_widget(case)).await
    }
}

pub struct PostSchedulingRequest;

#[async_trait]
impl JobHandler for PostSchedulingRequest {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        post(
            ctx,
            &ctx.rooms.scheduling_room_id,
            &templates::scheduling_request(case),
        )
        .await
    }
}

/// Asks the scheduling room again, threaded under the last request when one
/// is tracked.
pub struct RepromptScheduling;

#[async_trait]
impl JobHandler for RepromptScheduling {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        let JobPayload::RepromptScheduling { reason } = payload else {
            return Err(unexpected(payload));
        };
        let body = templates::scheduling_reprompt(case, reason);
        let room_id = &ctx.rooms.scheduling_room_id;

        let request = ctx
            .workflow
            .messages(case.id)
            .await?
            .into_iter()
            .rev()
            .find(|m| m.role == MessageRole::SchedulingRequest && &m.room_id == room_id);
        match request {
            Some(request) => {
                let event_id = ctx.chat.reply_to(room_id, &request.event_id, &body).await?;
                Ok(StepOutput::Posted {
                    room_id: room_id.clone(),
                    event_id,
                })
            }
            None => post(ctx, room_id, &body).await,
        }
    }
}

pub struct PostFinalDenial;

#[async_trait]
impl JobHandler for PostFinalDenial {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        reply_to_origin(ctx, case, &templates::final_denial(case)).await
    }
}

pub struct PostFinalAppointment;

#[async_trait]
impl JobHandler for PostFinalAppointment {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        reply_to_origin(ctx, case, &templates::final_appointment(case)).await
    }
}

pub struct PostFinalAppointmentDenied;

#[async_trait]
impl JobHandler for PostFinalAppointmentDenied {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        reply_to_origin(ctx, case, &templates::final_appointment_denied(case)).await
    }
}

pub struct PostFinalFailure;

#[async_trait]
impl JobHandler for PostFinalFailure {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        let JobPayload::PostFinalFailure { cause, details } = payload else {
            return Err(unexpected(payload));
        };
        let body = templates::failure_notice(case, cause, details.as_deref());
        reply_to_origin(ctx, case, &body).await
    }
}
