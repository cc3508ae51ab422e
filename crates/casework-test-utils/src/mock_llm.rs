// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM adapter for deterministic testing.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use casework_core::traits::{LlmAdapter, PluginAdapter, StructuredCase};
use casework_core::{AdapterType, CaseworkError, HealthStatus};

/// How the next `structure` call behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Answer,
    /// Fail with a transient provider error this many more times.
    Fail(u32),
    Panic,
}

/// A mock language model returning canned results.
pub struct MockLlm {
    structured: StructuredCase,
    suggestion: serde_json::Value,
    mode: Arc<Mutex<Mode>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            structured: StructuredCase {
                data: json!({
                    "patient": {"name": "Maria Souza", "age": 61},
                    "procedure": "upper endoscopy",
                }),
                summary: "61-year-old referred for upper endoscopy.".to_string(),
            },
            suggestion: json!({"suggestion": "accept", "support_flag": "none"}),
            mode: Arc::new(Mutex::new(Mode::Answer)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make the next `count` structuring calls fail with a transient error.
    pub async fn fail_next(&self, count: u32) {
        *self.mode.lock().await = Mode::Fail(count);
    }

    /// Make every structuring call panic.
    pub async fn panic_on_structure(&self) {
        *self.mode.lock().await = Mode::Panic;
    }

    /// Inputs passed to `structure`, in call order.
    pub async fn structure_inputs(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockLlm {
    fn name(&self) -> &str {
        "mock-llm"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Llm
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseworkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CaseworkError> {
        Ok(())
    }
}

#[async_trait]
impl LlmAdapter for MockLlm {
    async fn structure(&self, text: &str) -> Result<StructuredCase, CaseworkError> {
        self.calls.lock().await.push(text.to_string());
        let mode = {
            let mut mode = self.mode.lock().await;
            let current = *mode;
            if let Mode::Fail(remaining) = current {
                *mode = if remaining > 1 {
                    Mode::Fail(remaining - 1)
                } else {
                    Mode::Answer
                };
            }
            current
        };
        match mode {
            Mode::Answer => Ok(self.structured.clone()),
            Mode::Fail(_) => Err(CaseworkError::Llm {
                message: "mock provider overloaded".to_string(),
                source: None,
            }),
            Mode::Panic => panic!("mock llm panicked while structuring"),
        }
    }

    async fn suggest(
        &self,
        _data: &serde_json::Value,
        _summary: &str,
    ) -> Result<serde_json::Value, CaseworkError> {
        Ok(self.suggestion.clone())
    }
}
