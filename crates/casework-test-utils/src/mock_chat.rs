// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat adapter for deterministic testing.
//!
//! `MockChat` implements `ChatAdapter` by capturing every outbound post and
//! redaction for assertion in tests. Failures can be injected per call kind.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use casework_core::traits::{ChatAdapter, PluginAdapter};
use casework_core::{AdapterType, CaseworkError, HealthStatus};

/// A message posted through the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub room_id: String,
    pub in_reply_to: Option<String>,
    pub body: String,
    pub event_id: String,
}

/// A mock chat protocol client for testing.
pub struct MockChat {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    redacted: Arc<Mutex<Vec<(String, String)>>>,
    failing_posts: Arc<Mutex<u32>>,
    failing_redactions: Arc<Mutex<HashSet<String>>>,
    /// event id -> (remaining 429 responses, retry_after_ms)
    rate_limited_redactions: Arc<Mutex<HashMap<String, (u32, u64)>>>,
    redaction_calls: Arc<Mutex<Vec<String>>>,
    media: Arc<Mutex<Vec<u8>>>,
    next_event: AtomicU64,
}

impl MockChat {
    /// Create a mock that accepts every call and serves a small PDF stub.
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            redacted: Arc::new(Mutex::new(Vec::new())),
            failing_posts: Arc::new(Mutex::new(0)),
            failing_redactions: Arc::new(Mutex::new(HashSet::new())),
            rate_limited_redactions: Arc::new(Mutex::new(HashMap::new())),
            redaction_calls: Arc::new(Mutex::new(Vec::new())),
            media: Arc::new(Mutex::new(b"%PDF-1.4 mock".to_vec())),
            next_event: AtomicU64::new(1),
        }
    }

    /// Make the next `count` posts and replies fail with a transient error.
    pub async fn fail_next_posts(&self, count: u32) {
        *self.failing_posts.lock().await = count;
    }

    /// Make redaction of `event_id` fail.
    pub async fn fail_redaction_of(&self, event_id: &str) {
        self.failing_redactions
            .lock()
            .await
            .insert(event_id.to_string());
    }

    /// Answer the next `times` redactions of `event_id` with a rate limit.
    pub async fn rate_limit_redaction_of(&self, event_id: &str, times: u32, retry_after_ms: u64) {
        self.rate_limited_redactions
            .lock()
            .await
            .insert(event_id.to_string(), (times, retry_after_ms));
    }

    /// Event ids of every redaction attempt, successful or not.
    pub async fn redaction_attempts(&self) -> Vec<String> {
        self.redaction_calls.lock().await.clone()
    }

    /// Get all messages posted or replied through the mock.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Messages posted to one room, in order.
    pub async fn sent_to(&self, room_id: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect()
    }

    /// `(room_id, event_id)` of every successful redaction.
    pub async fn redactions(&self) -> Vec<(String, String)> {
        self.redacted.lock().await.clone()
    }

    async fn record(
        &self,
        room_id: &str,
        in_reply_to: Option<&str>,
        body: &str,
    ) -> Result<String, CaseworkError> {
        {
            let mut failing = self.failing_posts.lock().await;
            if *failing > 0 {
                *failing -= 1;
                return Err(CaseworkError::Chat {
                    message: "mock homeserver unavailable".to_string(),
                    source: None,
                });
            }
        }
        let event_id = format!("$mock-{}", self.next_event.fetch_add(1, Ordering::Relaxed));
        self.sent.lock().await.push(SentMessage {
            room_id: room_id.to_string(),
            in_reply_to: in_reply_to.map(str::to_string),
            body: body.to_string(),
            event_id: event_id.clone(),
        });
        Ok(event_id)
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockChat {
    fn name(&self) -> &str {
        "mock-chat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Chat
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseworkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CaseworkError> {
        Ok(())
    }
}

#[async_trait]
impl ChatAdapter for MockChat {
    async fn post_message(&self, room_id: &str, body: &str) -> Result<String, CaseworkError> {
        self.record(room_id, None, body).await
    }

    async fn reply_to(
        &self,
        room_id: &str,
        in_reply_to: &str,
        body: &str,
    ) -> Result<String, CaseworkError> {
        self.record(room_id, Some(in_reply_to), body).await
    }

    async fn redact(&self, room_id: &str, event_id: &str) -> Result<(), CaseworkError> {
        self.redaction_calls.lock().await.push(event_id.to_string());
        if let Some((remaining, retry_after_ms)) =
            self.rate_limited_redactions.lock().await.get_mut(event_id)
        {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CaseworkError::RateLimited {
                    retry_after_ms: *retry_after_ms,
                });
            }
        }
        if self.failing_redactions.lock().await.contains(event_id) {
            return Err(CaseworkError::Chat {
                message: format!("redaction of {event_id} forbidden"),
                source: None,
            });
        }
        self.redacted
            .lock()
            .await
            .push((room_id.to_string(), event_id.to_string()));
        Ok(())
    }

    async fn download_media(&self, _url: &str) -> Result<Vec<u8>, CaseworkError> {
        Ok(self.media.lock().await.clone())
    }
}
