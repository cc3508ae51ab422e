// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job type to handler dispatch.

use casework_core::JobType;

use crate::handler::JobHandler;
use crate::handlers::{
    AckIntake, ExecuteCleanup, ExtractDocument, PostDecisionWidget, PostFinalAppointment,
    PostFinalAppointmentDenied, PostFinalDenial, PostFinalFailure, PostSchedulingRequest,
    RepromptScheduling, StructureCase, SuggestAction,
};

/// Maps every [`JobType`] to its handler. Adding a job type without a
/// handler does not compile.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlerRegistry;

impl HandlerRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn get(&self, job_type: JobType) -> &'static dyn JobHandler {
        match job_type {
            JobType::AckIntake => &AckIntake,
            JobType::ExtractDocument => &ExtractDocument,
            JobType::StructureCase => &StructureCase,
            JobType::SuggestAction => &SuggestAction,
            JobType::PostDecisionWidget => &PostDecisionWidget,
            JobType::PostSchedulingRequest => &PostSchedulingRequest,
            JobType::RepromptScheduling => &RepromptScheduling,
            JobType::PostFinalDenial => &PostFinalDenial,
            JobType::PostFinalAppointment => &PostFinalAppointment,
            JobType::PostFinalAppointmentDenied => &PostFinalAppointmentDenied,
            JobType::PostFinalFailure => &PostFinalFailure,
            JobType::ExecuteCleanup => &ExecuteCleanup,
        }
    }
}
