// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dry-run collaborators for the `worker` subcommand.
//!
//! Posts and redactions are logged instead of sent. Documents are read from
//! `file://` URLs and their bytes taken as UTF-8 text. The language model
//! steps return a digest of the text instead of a model answer.

use async_trait::async_trait;
use casework_core::{
    AdapterType, CaseworkError, ChatAdapter, DocumentExtractor, HealthStatus, LlmAdapter,
    PluginAdapter, StructuredCase,
};
use serde_json::json;
use tracing::info;

const EXCERPT_CHARS: usize = 280;

#[derive(Default)]
pub struct DryRunChat;

impl DryRunChat {
    pub fn new() -> Self {
        Self
    }

    fn event_id() -> String {
        format!("$dry-run-{}", uuid::Uuid::new_v4().simple())
    }
}

macro_rules! dry_run_adapter {
    ($adapter:ty, $name:literal, $kind:expr) => {
        #[async_trait]
        impl PluginAdapter for $adapter {
            fn name(&self) -> &str {
                $name
            }

            fn version(&self) -> semver::Version {
                semver::Version::new(0, 1, 0)
            }

            fn adapter_type(&self) -> AdapterType {
                $kind
            }

            async fn health_check(&self) -> Result<HealthStatus, CaseworkError> {
                Ok(HealthStatus::Degraded("dry run".to_string()))
            }

            async fn shutdown(&self) -> Result<(), CaseworkError> {
                Ok(())
            }
        }
    };
}

dry_run_adapter!(DryRunChat, "dry-run-chat", AdapterType::Chat);
dry_run_adapter!(DryRunLlm, "dry-run-llm", AdapterType::Llm);
dry_run_adapter!(DryRunExtractor, "dry-run-extractor", AdapterType::Extractor);

#[async_trait]
impl ChatAdapter for DryRunChat {
    async fn post_message(&self, room_id: &str, body: &str) -> Result<String, CaseworkError> {
        let event_id = Self::event_id();
        info!(room_id, event_id = %event_id, body, "dry run: post");
        Ok(event_id)
    }

    async fn reply_to(
        &self,
        room_id: &str,
        in_reply_to: &str,
        body: &str,
    ) -> Result<String, CaseworkError> {
        let event_id = Self::event_id();
        info!(room_id, in_reply_to, event_id = %event_id, body, "dry run: reply");
        Ok(event_id)
    }

    async fn redact(&self, room_id: &str, event_id: &str) -> Result<(), CaseworkError> {
        info!(room_id, event_id, "dry run: redact");
        Ok(())
    }

    async fn download_media(&self, url: &str) -> Result<Vec<u8>, CaseworkError> {
        let Some(path) = url.strip_prefix("file://") else {
            return Err(CaseworkError::Validation(format!(
                "dry run can only read file:// documents, got {url}"
            )));
        };
        tokio::fs::read(path).await.map_err(|e| CaseworkError::Chat {
            message: format!("cannot read {path}: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

pub struct DryRunExtractor;

#[async_trait]
impl DocumentExtractor for DryRunExtractor {
    async fn extract_text(&self, document: &[u8]) -> Result<String, CaseworkError> {
        std::str::from_utf8(document)
            .map(str::to_string)
            .map_err(|e| CaseworkError::Extraction {
                message: format!("document is not UTF-8 text: {e}"),
            })
    }
}

pub struct DryRunLlm;

#[async_trait]
impl LlmAdapter for DryRunLlm {
    async fn structure(&self, text: &str) -> Result<StructuredCase, CaseworkError> {
        let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
        Ok(StructuredCase {
            data: json!({
                "source": "dry-run",
                "chars": text.chars().count(),
                "words": text.split_whitespace().count(),
            }),
            summary: excerpt,
        })
    }

    async fn suggest(
        &self,
        _data: &serde_json::Value,
        _summary: &str,
    ) -> Result<serde_json::Value, CaseworkError> {
        Ok(json!({ "suggestion": "review", "source": "dry-run" }))
    }
}
