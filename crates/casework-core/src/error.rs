// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Casework workflow engine.

use thiserror::Error;

/// The primary error type used across storage, workflow, and adapter boundaries.
#[derive(Debug, Error)]
pub enum CaseworkError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (connection, query failure, lock timeout).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat protocol errors (post, reply, redact, media download).
    #[error("chat error: {message}")]
    Chat {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The chat server refused a request with a rate limit (HTTP 429).
    /// `retry_after_ms` is zero when the server named no delay.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// LLM provider errors (API failure, rate limiting, unparseable output).
    #[error("llm error: {message}")]
    Llm {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Document extraction failed on the supplied bytes.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// A business rule was violated; retrying cannot succeed.
    #[error("validation error: {0}")]
    Validation(String),

    /// A stored job payload does not match its declared job type.
    #[error("invalid payload for {job_type}: {message}")]
    InvalidPayload { job_type: String, message: String },

    /// A referenced case, job, or message does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A queue operation was attempted on a job in the wrong status.
    #[error("job {job_id} is {status}, operation not allowed")]
    InvalidJobState { job_id: i64, status: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CaseworkError {
    /// Whether a job that failed with this error may succeed on a later attempt.
    ///
    /// Network-facing collaborators and the store are treated as recoverable;
    /// malformed input, missing records, and rule violations are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CaseworkError::Storage { .. }
                | CaseworkError::Chat { .. }
                | CaseworkError::RateLimited { .. }
                | CaseworkError::Llm { .. }
                | CaseworkError::Timeout { .. }
        )
    }
}
