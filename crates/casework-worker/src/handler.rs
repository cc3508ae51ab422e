// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The job handler trait and its failure classification.

use async_trait::async_trait;
use casework_core::{Case, CaseworkError, JobPayload};
use casework_workflow::StepOutput;
use thiserror::Error;

use crate::context::HandlerContext;

/// Why a handler did not produce a result.
///
/// The worker retries [`HandlerError::Retriable`] failures with backoff and
/// dead-letters [`HandlerError::Permanent`] ones on the spot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Retriable(String),

    #[error("{0}")]
    Permanent(String),
}

impl HandlerError {
    pub fn permanent(message: impl Into<String>) -> Self {
        HandlerError::Permanent(message.into())
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, HandlerError::Retriable(_))
    }

    /// Prefix the message with the sub-step that failed, keeping the class.
    pub fn during(self, step: &str) -> Self {
        match self {
            HandlerError::Retriable(m) => HandlerError::Retriable(format!("{step}: {m}")),
            HandlerError::Permanent(m) => HandlerError::Permanent(format!("{step}: {m}")),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HandlerError::Retriable(message) | HandlerError::Permanent(message) => message,
        }
    }
}

impl From<CaseworkError> for HandlerError {
    fn from(err: CaseworkError) -> Self {
        if err.is_transient() {
            HandlerError::Retriable(err.to_string())
        } else {
            HandlerError::Permanent(err.to_string())
        }
    }
}

/// Executes one job type against a case.
///
/// Handlers only talk to collaborators and read the store; every write goes
/// through [`casework_workflow::Workflow::complete_step`] with the returned
/// [`StepOutput`].
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &HandlerContext,
        case: &Case,
        payload: &JobPayload,
    ) -> Result<StepOutput, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_errors_classify_by_transience() {
        let chat: HandlerError = CaseworkError::Chat {
            message: "502 from homeserver".into(),
            source: None,
        }
        .into();
        assert!(chat.is_retriable());
        assert_eq!(chat.message(), "chat error: 502 from homeserver");

        let extraction: HandlerError = CaseworkError::Extraction {
            message: "not a pdf".into(),
        }
        .into();
        assert!(!extraction.is_retriable());
    }

    #[test]
    fn during_keeps_the_classification() {
        let err = HandlerError::Retriable("chat error: 502".into()).during("download");
        assert_eq!(err, HandlerError::Retriable("download: chat error: 502".into()));
        let err = HandlerError::permanent("bad bytes").during("extract");
        assert_eq!(err.message(), "extract: bad bytes");
        assert!(!err.is_retriable());
    }
}
