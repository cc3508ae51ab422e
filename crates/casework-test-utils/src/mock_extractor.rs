// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock document extractor returning canned text.

use async_trait::async_trait;
use tokio::sync::Mutex;

use casework_core::traits::{DocumentExtractor, PluginAdapter};
use casework_core::{AdapterType, CaseworkError, HealthStatus};

/// Referral text carrying the record number watermark `48213`.
pub const SAMPLE_REFERRAL: &str = "48213 Referral form 48213\n\
    Patient: Maria Souza, 61\n\
    Requested: upper endoscopy 48213\n\
    Contact 11111";

pub struct MockExtractor {
    result: Mutex<Result<String, String>>,
}

impl MockExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            result: Mutex::new(Ok(text.into())),
        }
    }

    /// An extractor that rejects every document.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Mutex::new(Err(message.into())),
        }
    }

    pub async fn set_text(&self, text: impl Into<String>) {
        *self.result.lock().await = Ok(text.into());
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new(SAMPLE_REFERRAL)
    }
}

#[async_trait]
impl PluginAdapter for MockExtractor {
    fn name(&self) -> &str {
        "mock-extractor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseworkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CaseworkError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentExtractor for MockExtractor {
    async fn extract_text(&self, _document: &[u8]) -> Result<String, CaseworkError> {
        self.result
            .lock()
            .await
            .clone()
            .map_err(|message| CaseworkError::Extraction { message })
    }
}
