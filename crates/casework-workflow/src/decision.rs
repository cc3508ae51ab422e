// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strict parser for the doctor's decision reply template.
//!
//! The template is four `key: value` lines in any order. Keys and values
//! accept Portuguese aliases. Blank lines and code-fence lines are ignored.

use casework_core::{CaseId, Decision, SupportFlag};
use thiserror::Error;

/// A decision reply that passed every template rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDecision {
    pub case_id: CaseId,
    pub decision: Decision,
    pub support_flag: SupportFlag,
    pub reason: Option<String>,
}

/// Why a decision reply was refused. [`code`](Self::code) is the
/// machine-readable reason echoed back to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecisionParseError {
    #[error("reply is empty")]
    EmptyMessage,
    #[error("every line must be `key: value`")]
    InvalidLineFormat,
    #[error("unknown field")]
    UnknownField,
    #[error("field given twice")]
    DuplicateField,
    #[error("missing `{}` line", .0.key())]
    MissingLine(Field),
    #[error("decision must be accept or deny")]
    InvalidDecisionValue,
    #[error("support flag must be none, anesthesist or anesthesist_icu")]
    InvalidSupportFlagValue,
    #[error("a denial cannot request support")]
    InvalidSupportFlagForDecision,
    #[error("case id is not a UUID")]
    InvalidCaseLine,
    #[error("case id does not match the case")]
    CaseIdMismatch,
}

impl DecisionParseError {
    pub fn code(self) -> &'static str {
        match self {
            Self::EmptyMessage => "empty_message",
            Self::InvalidLineFormat => "invalid_line_format",
            Self::UnknownField => "unknown_field",
            Self::DuplicateField => "duplicate_field",
            Self::MissingLine(Field::Decision) => "missing_decision_line",
            Self::MissingLine(Field::SupportFlag) => "missing_support_flag_line",
            Self::MissingLine(Field::Reason) => "missing_reason_line",
            Self::MissingLine(Field::CaseId) => "missing_case_id_line",
            Self::InvalidDecisionValue => "invalid_decision_value",
            Self::InvalidSupportFlagValue => "invalid_support_flag_value",
            Self::InvalidSupportFlagForDecision => "invalid_support_flag_for_decision",
            Self::InvalidCaseLine => "invalid_case_line",
            Self::CaseIdMismatch => "case_id_mismatch",
        }
    }
}

/// Canonical template keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Decision,
    SupportFlag,
    Reason,
    CaseId,
}

impl Field {
    const ALL: [Field; 4] = [
        Field::Decision,
        Field::SupportFlag,
        Field::Reason,
        Field::CaseId,
    ];

    fn key(self) -> &'static str {
        match self {
            Field::Decision => "decision",
            Field::SupportFlag => "support_flag",
            Field::Reason => "reason",
            Field::CaseId => "case_id",
        }
    }

    fn from_alias(raw: &str) -> Option<Self> {
        match raw {
            "decision" | "decisao" | "decisão" => Some(Field::Decision),
            "support_flag" | "suporte" => Some(Field::SupportFlag),
            "reason" | "motivo" => Some(Field::Reason),
            "case_id" | "caso" => Some(Field::CaseId),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Field::Decision => 0,
            Field::SupportFlag => 1,
            Field::Reason => 2,
            Field::CaseId => 3,
        }
    }
}

fn decision_from_alias(raw: &str) -> Option<Decision> {
    match raw {
        "accept" | "aceitar" | "aceito" | "aceita" => Some(Decision::Accept),
        "deny" | "negar" | "negado" | "negar." => Some(Decision::Deny),
        _ => None,
    }
}

fn support_from_alias(raw: &str) -> Option<SupportFlag> {
    match raw {
        "none" | "nenhum" => Some(SupportFlag::None),
        "anesthesist" | "anestesista" => Some(SupportFlag::Anesthesist),
        "anesthesist_icu" | "anestesista_uti" | "anestesista_icu" => {
            Some(SupportFlag::AnesthesistIcu)
        }
        _ => None,
    }
}

const EMPTY_REASON_MARKERS: &[&str] = &[
    "",
    "(opcional)",
    "opcional",
    "(vazio)",
    "vazio",
    "-",
    "n/a",
    "na",
];

/// Parse a decision reply. When `expected` is given the `case_id` line must
/// name that case.
pub fn parse_decision_reply(
    body: &str,
    expected: Option<CaseId>,
) -> Result<ParsedDecision, DecisionParseError> {
    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .collect();
    if lines.is_empty() {
        return Err(DecisionParseError::EmptyMessage);
    }

    let mut values: [Option<String>; 4] = Default::default();
    for line in lines {
        let line = line.replace('：', ":");
        let (key, value) = line
            .split_once(':')
            .ok_or(DecisionParseError::InvalidLineFormat)?;
        let field = Field::from_alias(&key.trim().to_lowercase())
            .ok_or(DecisionParseError::UnknownField)?;
        let slot = &mut values[field.index()];
        if slot.is_some() {
            return Err(DecisionParseError::DuplicateField);
        }
        *slot = Some(value.trim().to_string());
    }

    for field in Field::ALL {
        if values[field.index()].is_none() {
            return Err(DecisionParseError::MissingLine(field));
        }
    }
    let [decision, support, reason, case] = values.map(Option::unwrap_or_default);

    let decision = decision_from_alias(&decision.to_lowercase())
        .ok_or(DecisionParseError::InvalidDecisionValue)?;
    let support_flag = support_from_alias(&support.to_lowercase())
        .ok_or(DecisionParseError::InvalidSupportFlagValue)?;
    if decision == Decision::Deny && support_flag != SupportFlag::None {
        return Err(DecisionParseError::InvalidSupportFlagForDecision);
    }

    let case_id: CaseId = case
        .parse()
        .map_err(|_| DecisionParseError::InvalidCaseLine)?;
    if let Some(expected) = expected {
        if case_id != expected {
            return Err(DecisionParseError::CaseIdMismatch);
        }
    }

    let reason = reason.trim();
    let reason = (!EMPTY_REASON_MARKERS.contains(&reason.to_lowercase().as_str()))
        .then(|| reason.to_string());

    Ok(ParsedDecision {
        case_id,
        decision,
        support_flag,
        reason,
    })
}
