// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat protocol adapter trait.

use async_trait::async_trait;

use crate::error::CaseworkError;
use crate::traits::adapter::PluginAdapter;

/// Outbound side of the chat-room protocol.
///
/// Every method that creates a message returns the protocol event id of the
/// posted message so it can be tracked as a case message.
#[async_trait]
pub trait ChatAdapter: PluginAdapter {
    /// Posts a new top-level message to a room.
    async fn post_message(&self, room_id: &str, body: &str) -> Result<String, CaseworkError>;

    /// Posts a reply to an existing message.
    async fn reply_to(
        &self,
        room_id: &str,
        in_reply_to: &str,
        body: &str,
    ) -> Result<String, CaseworkError>;

    /// Redacts (removes) a previously posted message.
    async fn redact(&self, room_id: &str, event_id: &str) -> Result<(), CaseworkError>;

    /// Downloads the media referenced by a message.
    async fn download_media(&self, url: &str) -> Result<Vec<u8>, CaseworkError>;
}
