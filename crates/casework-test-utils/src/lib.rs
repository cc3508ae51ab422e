// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Casework integration tests.
//!
//! Provides mock collaborators and a harness that wires them to a temp SQLite
//! store, so the whole workflow runs deterministically without a chat server
//! or a language model.
//!
//! # Components
//!
//! - [`MockChat`] - Captures posts, replies, and redactions; can inject failures
//! - [`MockLlm`] - Canned structuring and suggestion results; can fail or panic
//! - [`MockExtractor`] - Canned document text
//! - [`TestHarness`] - Temp store, workflow, and worker loop in one value

pub mod harness;
pub mod mock_chat;
pub mod mock_extractor;
pub mod mock_llm;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_chat::{MockChat, SentMessage};
pub use mock_extractor::MockExtractor;
pub use mock_llm::MockLlm;
