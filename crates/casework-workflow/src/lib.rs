// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case workflow engine for Casework.
//!
//! Holds the status graph and step table ([`machine`]), the reply template
//! parsers, the durable [`JobQueue`], and the [`Workflow`] engine that applies
//! external events and step results to cases with idempotency guards.

pub mod decision;
pub mod engine;
pub mod failure;
pub mod machine;
pub mod outcome;
pub mod queue;
pub mod scheduling;

pub use decision::{DecisionParseError, ParsedDecision, parse_decision_reply};
pub use engine::{Resumed, StepCompletion, StepFailure, Workflow};
pub use failure::FailureCause;
pub use machine::{ResumePlan, StepSpec, is_legal_edge, resume_plan, step};
pub use outcome::{
    DecisionInput, DecisionOutcome, Intake, IntakeOutcome, Reaction, ReactionOutcome, Rejection,
    RejectionCode, SchedulingOutcome, StepOutput,
};
pub use queue::{JobQueue, enqueue_in};
pub use scheduling::{ParsedScheduling, SchedulingParseError, parse_scheduling_reply};
