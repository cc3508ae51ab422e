// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strict parser for the scheduling desk's reply template.
//!
//! Confirmed:
//!
//! ```text
//! 16-02-2026 14:30 BRT
//! location: Unit 2, room 4
//! instructions: fasting 8h
//! case: <uuid>
//! ```
//!
//! Denied: first line `denied`, an optional `reason:` line and the `case:` line.

use casework_core::CaseId;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Wall-clock suffix accepted on the date line.
const BRT_SUFFIX: &str = " BRT";
const BRT_OFFSET_SECS: i32 = 3 * 3600;

/// Storage format of a confirmed appointment time.
pub const APPOINTMENT_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedScheduling {
    Confirmed {
        case_id: CaseId,
        at: DateTime<FixedOffset>,
        location: String,
        instructions: String,
    },
    Denied {
        case_id: CaseId,
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulingParseError {
    #[error("reply is empty")]
    EmptyMessage,
    #[error("missing `case:` line")]
    MissingCaseLine,
    #[error("case id is not a UUID")]
    InvalidCaseLine,
    #[error("case id does not match the case")]
    CaseIdMismatch,
    #[error("first line must be `DD-MM-YYYY HH:MM BRT` or `denied`")]
    InvalidConfirmedDatetime,
    #[error("missing `location:` line")]
    MissingLocationLine,
    #[error("missing `instructions:` line")]
    MissingInstructionsLine,
}

impl SchedulingParseError {
    pub fn code(self) -> &'static str {
        match self {
            Self::EmptyMessage => "empty_message",
            Self::MissingCaseLine => "missing_case_line",
            Self::InvalidCaseLine => "invalid_case_line",
            Self::CaseIdMismatch => "case_id_mismatch",
            Self::InvalidConfirmedDatetime => "invalid_confirmed_datetime",
            Self::MissingLocationLine => "missing_location_line",
            Self::MissingInstructionsLine => "missing_instructions_line",
        }
    }
}

/// Parse a scheduling reply addressed to `expected`.
pub fn parse_scheduling_reply(
    body: &str,
    expected: CaseId,
) -> Result<ParsedScheduling, SchedulingParseError> {
    let lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let Some(first) = lines.first() else {
        return Err(SchedulingParseError::EmptyMessage);
    };

    let case_id: CaseId = required_value(&lines, "case", SchedulingParseError::MissingCaseLine)?
        .parse()
        .map_err(|_| SchedulingParseError::InvalidCaseLine)?;
    if case_id != expected {
        return Err(SchedulingParseError::CaseIdMismatch);
    }

    if first.eq_ignore_ascii_case("denied") {
        let reason = value_of(&lines, "reason")
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        return Ok(ParsedScheduling::Denied { case_id, reason });
    }

    let at = parse_brt_datetime(first)?;
    let location = required_value(&lines, "location", SchedulingParseError::MissingLocationLine)?;
    let instructions = required_value(
        &lines,
        "instructions",
        SchedulingParseError::MissingInstructionsLine,
    )?;
    Ok(ParsedScheduling::Confirmed {
        case_id,
        at,
        location: location.to_string(),
        instructions: instructions.to_string(),
    })
}

/// Value of the first line starting with `key:` (case-insensitive).
fn value_of<'a>(lines: &[&'a str], key: &str) -> Option<&'a str> {
    let prefix_len = key.len() + 1;
    lines.iter().find_map(|line| {
        let head = line.get(..prefix_len)?;
        let matches = head.ends_with(':') && head[..key.len()].eq_ignore_ascii_case(key);
        matches.then(|| line[prefix_len..].trim())
    })
}

fn required_value<'a>(
    lines: &[&'a str],
    key: &str,
    missing: SchedulingParseError,
) -> Result<&'a str, SchedulingParseError> {
    value_of(lines, key)
        .filter(|v| !v.is_empty())
        .ok_or(missing)
}

fn parse_brt_datetime(line: &str) -> Result<DateTime<FixedOffset>, SchedulingParseError> {
    let raw = line
        .strip_suffix(BRT_SUFFIX)
        .ok_or(SchedulingParseError::InvalidConfirmedDatetime)?;
    let naive = NaiveDateTime::parse_from_str(raw, "%d-%m-%Y %H:%M")
        .map_err(|_| SchedulingParseError::InvalidConfirmedDatetime)?;
    let offset = FixedOffset::west_opt(BRT_OFFSET_SECS)
        .ok_or(SchedulingParseError::InvalidConfirmedDatetime)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or(SchedulingParseError::InvalidConfirmedDatetime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_confirmed_reply() {
        let id = CaseId::new();
        let body = format!(
            "16-02-2026 14:30 BRT\nlocation: Unit 2, room 4\nInstructions: fasting 8h\ncase: {id}\n"
        );
        let ParsedScheduling::Confirmed {
            case_id,
            at,
            location,
            instructions,
        } = parse_scheduling_reply(&body, id).unwrap()
        else {
            panic!("expected confirmed");
        };
        assert_eq!(case_id, id);
        assert_eq!(at.format(APPOINTMENT_AT_FORMAT).to_string(), "2026-02-16T14:30:00-03:00");
        assert_eq!(location, "Unit 2, room 4");
        assert_eq!(instructions, "fasting 8h");
    }

    #[test]
    fn parses_denied_reply_with_and_without_reason() {
        let id = CaseId::new();
        let parsed = parse_scheduling_reply(&format!("DENIED\nreason: no slots\ncase: {id}"), id).unwrap();
        assert_eq!(
            parsed,
            ParsedScheduling::Denied {
                case_id: id,
                reason: Some("no slots".into())
            }
        );
        let parsed = parse_scheduling_reply(&format!("denied\ncase: {id}"), id).unwrap();
        assert_eq!(
            parsed,
            ParsedScheduling::Denied {
                case_id: id,
                reason: None
            }
        );
    }

    #[test]
    fn reports_machine_readable_codes() {
        let id = CaseId::new();
        let other = CaseId::new();
        let cases = [
            ("\n  \n".to_string(), "empty_message"),
            ("denied".to_string(), "missing_case_line"),
            ("denied\ncase: nope".to_string(), "invalid_case_line"),
            (format!("denied\ncase: {other}"), "case_id_mismatch"),
            (format!("tomorrow\ncase: {id}"), "invalid_confirmed_datetime"),
            (format!("16-02-2026 14:30\ncase: {id}"), "invalid_confirmed_datetime"),
            (format!("31-02-2026 14:30 BRT\ncase: {id}"), "invalid_confirmed_datetime"),
            (format!("16-02-2026 14:30 BRT\ncase: {id}"), "missing_location_line"),
            (
                format!("16-02-2026 14:30 BRT\nlocation: A\ninstructions:\ncase: {id}"),
                "missing_instructions_line",
            ),
        ];
        for (body, code) in cases {
            assert_eq!(parse_scheduling_reply(&body, id).unwrap_err().code(), code, "{body}");
        }
    }
}
