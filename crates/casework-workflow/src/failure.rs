// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coarse cause reported to the intake room when a case fails.

use casework_core::JobType;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    Download,
    Extract,
    RecordExtract,
    #[strum(serialize = "llm1")]
    #[serde(rename = "llm1")]
    Llm1,
    #[strum(serialize = "llm2")]
    #[serde(rename = "llm2")]
    Llm2,
    Other,
}

impl FailureCause {
    /// Classify the step that died and its last error.
    ///
    /// Extraction errors carry the failing sub-step as a prefix
    /// (`download: ...`, `record_extract: ...`).
    pub fn categorize(job_type: JobType, error: &str) -> Self {
        match job_type {
            JobType::StructureCase => FailureCause::Llm1,
            JobType::SuggestAction => FailureCause::Llm2,
            JobType::ExtractDocument => {
                let error = error.to_lowercase();
                if error.starts_with("download") {
                    FailureCause::Download
                } else if error.starts_with("record_extract") || error.contains("record number") {
                    FailureCause::RecordExtract
                } else {
                    FailureCause::Extract
                }
            }
            _ => FailureCause::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_errors_split_by_sub_step() {
        let cause = |error| FailureCause::categorize(JobType::ExtractDocument, error);
        assert_eq!(cause("download: chat error: 404"), FailureCause::Download);
        assert_eq!(
            cause("record_extract: no 5-digit record number in document"),
            FailureCause::RecordExtract
        );
        assert_eq!(cause("extract: not a PDF"), FailureCause::Extract);
        assert_eq!(cause("timed out"), FailureCause::Extract);
    }

    #[test]
    fn model_steps_and_the_rest() {
        assert_eq!(
            FailureCause::categorize(JobType::StructureCase, "llm error: 500"),
            FailureCause::Llm1
        );
        assert_eq!(
            FailureCause::categorize(JobType::SuggestAction, "invalid JSON"),
            FailureCause::Llm2
        );
        assert_eq!(
            FailureCause::categorize(JobType::AckIntake, "download refused"),
            FailureCause::Other
        );
    }

    #[test]
    fn names_match_the_notice_vocabulary() {
        assert_eq!(FailureCause::RecordExtract.to_string(), "record_extract");
        assert_eq!(FailureCause::Llm1.to_string(), "llm1");
        assert_eq!(FailureCause::Llm2.as_ref(), "llm2");
        assert_eq!(
            serde_json::to_value(FailureCause::Download).unwrap(),
            serde_json::json!("download")
        );
    }
}
