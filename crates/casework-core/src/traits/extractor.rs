// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document text extraction trait.

use async_trait::async_trait;

use crate::error::CaseworkError;
use crate::traits::adapter::PluginAdapter;

/// Extracts plain text from a downloaded document.
#[async_trait]
pub trait DocumentExtractor: PluginAdapter {
    async fn extract_text(&self, document: &[u8]) -> Result<String, CaseworkError>;
}
