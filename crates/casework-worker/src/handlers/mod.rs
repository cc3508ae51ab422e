// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One handler per job type.

mod cleanup;
mod intake;
mod llm;
mod post;

pub use cleanup::{ExecuteCleanup, RedactionRetry};
pub use intake::{AckIntake, ExtractDocument};
pub use llm::{StructureCase, SuggestAction};
pub use post::{
    PostDecisionWidget, PostFinalAppointment, PostFinalAppointmentDenied, PostFinalDenial,
    PostFinalFailure, PostSchedulingRequest, RepromptScheduling,
};

use casework_core::JobPayload;

use crate::handler::HandlerError;

/// A payload the handler was not written for. The runner decodes payloads
/// against the row's job type first, so this only fires on a wiring bug.
fn unexpected(payload: &JobPayload) -> HandlerError {
    HandlerError::permanent(format!(
        "handler received a `{}` payload",
        payload.job_type()
    ))
}
