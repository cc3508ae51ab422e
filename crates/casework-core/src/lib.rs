// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Casework workflow engine.
//!
//! This crate holds the vocabulary shared by every other crate in the
//! workspace: the case and job status enumerations, persisted record types,
//! typed job payloads, the retry policy, the error taxonomy, and the traits
//! that external collaborators (chat protocol, LLM provider, document
//! extraction) implement.

pub mod error;
pub mod payload;
pub mod records;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::CaseworkError;
pub use payload::JobPayload;
pub use records::{Case, CaseEvent, CaseMessage, Job, Milestones};
pub use retry::RetryPolicy;
pub use types::{
    AdapterType, CaseEventKind, CaseId, CaseStatus, Decision, EventActor, HealthStatus, JobId,
    JobStatus, JobType, MessageRole, ReactionKind, SupportFlag,
};

pub use traits::{ChatAdapter, DocumentExtractor, LlmAdapter, PluginAdapter, StructuredCase};
