// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the external collaborators of the workflow.

pub mod adapter;
pub mod chat;
pub mod extractor;
pub mod llm;

pub use adapter::PluginAdapter;
pub use chat::ChatAdapter;
pub use extractor::DocumentExtractor;
pub use llm::{LlmAdapter, StructuredCase};
