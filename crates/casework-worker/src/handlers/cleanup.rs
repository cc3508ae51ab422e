// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redaction of every message tracked for a case.

use std::time::Duration;

use async_trait::async_trait;
use casework_core::{Case, CaseMessage, CaseworkError, JobPayload};
use casework_workflow::StepOutput;
use tracing::{info, warn};

use crate::context::HandlerContext;
use crate::handler::{HandlerError, JobHandler};

/// How a single redaction is retried when the chat server rate-limits it.
///
/// Only [`CaseworkError::RateLimited`] is retried; other errors fail the
/// message on the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedactionRetry {
    /// Attempts per message, including the first.
    pub max_attempts: u32,
    /// Floor for the server-provided delay.
    pub min_delay: Duration,
}

impl Default for RedactionRetry {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_delay: Duration::from_millis(200),
        }
    }
}

impl RedactionRetry {
    /// Delay before retrying after `err`, or `None` when it is not worth
    /// another attempt.
    pub fn delay_after(&self, err: &CaseworkError, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match err {
            CaseworkError::RateLimited { retry_after_ms } => {
                Some(Duration::from_millis(*retry_after_ms).max(self.min_delay))
            }
            _ => None,
        }
    }
}

/// Redacts the case's messages one by one. A failed redaction is reported in
/// the output and does not fail the job.
pub struct ExecuteCleanup;

#[async_trait]
impl JobHandler for ExecuteCleanup {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        _payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError> {
        let messages = ctx.workflow.messages(case.id).await?;
        info!(case_id = %case.id, messages = messages.len(), "cleanup started");

        let mut redacted = Vec::new();
        let mut failed = Vec::new();
        for message in messages {
            match redact(ctx, case, &message).await {
                Ok(()) => redacted.push(message.event_id),
                Err(e) => {
                    warn!(
                        case_id = %case.id,
                        event_id = %message.event_id,
                        error = %e,
                        "redaction failed"
                    );
                    failed.push((message.event_id, e.to_string()));
                }
            }
        }
        Ok(StepOutput::Cleaned { redacted, failed })
    }
}

async fn redact(
    ctx: &HandlerContext,
    case: &Case,
    message: &CaseMessage,
) -> Result<(), CaseworkError> {
    let mut attempt = 1;
    loop {
        let err = match ctx.chat.redact(&message.room_id, &message.event_id).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        let Some(delay) = ctx.redaction_retry.delay_after(&err, attempt) else {
            return Err(err);
        };
        warn!(
            case_id = %case.id,
            event_id = %message.event_id,
            attempt,
            max_attempts = ctx.redaction_retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "redaction rate limited, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_are_retried_with_a_floor() {
        let retry = RedactionRetry::default();
        let limited = CaseworkError::RateLimited { retry_after_ms: 0 };
        assert_eq!(
            retry.delay_after(&limited, 1),
            Some(Duration::from_millis(200))
        );
        let slow = CaseworkError::RateLimited {
            retry_after_ms: 1500,
        };
        assert_eq!(retry.delay_after(&slow, 4), Some(Duration::from_millis(1500)));
        assert_eq!(retry.delay_after(&slow, 5), None);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let retry = RedactionRetry::default();
        let forbidden = CaseworkError::Chat {
            message: "403".into(),
            source: None,
        };
        assert_eq!(retry.delay_after(&forbidden, 1), None);
    }
}
