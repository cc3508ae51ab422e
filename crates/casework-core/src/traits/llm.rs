// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM provider adapter trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CaseworkError;
use crate::traits::adapter::PluginAdapter;

/// Result of structuring extracted document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCase {
    pub data: serde_json::Value,
    pub summary: String,
}

/// Adapter for the language model used to structure cases and suggest actions.
#[async_trait]
pub trait LlmAdapter: PluginAdapter {
    /// Turns extracted document text into structured case data and a summary.
    async fn structure(&self, text: &str) -> Result<StructuredCase, CaseworkError>;

    /// Produces a suggested action for the decision room.
    async fn suggest(
        &self,
        data: &serde_json::Value,
        summary: &str,
    ) -> Result<serde_json::Value, CaseworkError>;
}
