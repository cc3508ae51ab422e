// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message bodies posted by the workflow.
//!
//! The reply instructions embedded in the widget and scheduling messages are
//! the templates [`casework_workflow::parse_decision_reply`] and
//! [`casework_workflow::parse_scheduling_reply`] accept.

use casework_core::{Case, CaseId};
use casework_workflow::scheduling::APPOINTMENT_AT_FORMAT;
use chrono::DateTime;
use serde_json::Value;

const UNKNOWN: &str = "unknown";

pub fn ack(case: &Case) -> String {
    format!(
        "Referral received and queued for triage.\ncase: {}",
        case.id
    )
}

/// Decision room post: summary, suggestion, and the reply template.
pub fn decision_widget(case: &Case) -> String {
    let mut body = format!(
        "Triage request\ncase: {}\nrecord: {}\n",
        case.id,
        case.record_number.as_deref().unwrap_or(UNKNOWN)
    );
    if let Some(patient) = patient_line(case.structured_data.as_ref()) {
        body.push_str(&format!("patient: {patient}\n"));
    }
    if let Some(summary) = &case.summary {
        body.push_str(&format!("\n{summary}\n"));
    }
    if let Some(suggestion) = &case.suggestion {
        let rendered =
            serde_json::to_string_pretty(suggestion).unwrap_or_else(|_| suggestion.to_string());
        body.push_str(&format!("\nSuggestion:\n```json\n{rendered}\n```\n"));
    }
    body.push_str(&format!(
        "\nReply with:\n\
         decision: accept | deny\n\
         support_flag: none | anesthesist | anesthesist_icu\n\
         reason: <optional>\n\
         case_id: {}",
        case.id
    ));
    body
}

/// Scheduling room post for an accepted case.
pub fn scheduling_request(case: &Case) -> String {
    let mut body = format!(
        "Scheduling request\ncase: {}\nrecord: {}\n",
        case.id,
        case.record_number.as_deref().unwrap_or(UNKNOWN)
    );
    if let Some(patient) = patient_line(case.structured_data.as_ref()) {
        body.push_str(&format!("patient: {patient}\n"));
    }
    if let Some(flag) = case.support_flag {
        body.push_str(&format!("support: {flag}\n"));
    }
    body.push('\n');
    body.push_str(&scheduling_instructions(case.id));
    body
}

/// Scheduling room post after a reply that did not follow the template.
pub fn scheduling_reprompt(case: &Case, reason: &str) -> String {
    format!(
        "The scheduling reply for case {} could not be read ({reason}).\n\n{}",
        case.id,
        scheduling_instructions(case.id)
    )
}

fn scheduling_instructions(case_id: CaseId) -> String {
    format!(
        "Reply with:\n\
         DD-MM-YYYY HH:MM BRT\n\
         location: <where>\n\
         instructions: <preparation>\n\
         case: {case_id}\n\n\
         or:\n\
         denied\n\
         reason: <optional>\n\
         case: {case_id}"
    )
}

pub fn final_denial(case: &Case) -> String {
    format!(
        "Case {}: the referral was not accepted.\nreason: {}\n\n{}",
        case.id,
        case.decision_reason.as_deref().unwrap_or("-"),
        CLEANUP_HINT
    )
}

pub fn final_appointment(case: &Case) -> String {
    let at = case
        .appointment_at
        .as_deref()
        .map(display_appointment_at)
        .unwrap_or_else(|| UNKNOWN.to_string());
    format!(
        "Case {}: appointment confirmed.\ndate: {at}\nlocation: {}\ninstructions: {}\n\n{}",
        case.id,
        case.appointment_location.as_deref().unwrap_or("-"),
        case.appointment_instructions.as_deref().unwrap_or("-"),
        CLEANUP_HINT
    )
}

pub fn final_appointment_denied(case: &Case) -> String {
    format!(
        "Case {}: the appointment could not be scheduled.\nreason: {}\n\n{}",
        case.id,
        case.appointment_reason.as_deref().unwrap_or("-"),
        CLEANUP_HINT
    )
}

pub fn failure_notice(case: &Case, cause: &str, details: Option<&str>) -> String {
    let mut body = format!(
        "Case {} could not be completed automatically.\ncause: {cause}",
        case.id
    );
    if let Some(details) = details {
        body.push_str(&format!("\ndetails: {details}"));
    }
    body
}

const CLEANUP_HINT: &str = "React with \u{1F44D} once handled to clear this case's messages.";

/// Render a stored appointment time the way the desk wrote it.
fn display_appointment_at(stored: &str) -> String {
    match DateTime::parse_from_str(stored, APPOINTMENT_AT_FORMAT) {
        Ok(at) => at.format("%d-%m-%Y %H:%M BRT").to_string(),
        Err(_) => stored.to_string(),
    }
}

/// `name (age)` from the structured case data, when present.
fn patient_line(data: Option<&Value>) -> Option<String> {
    let patient = data?;
    let patient = patient
        .get("patient")
        .filter(|p| p.is_object())
        .or_else(|| patient.get("paciente").filter(|p| p.is_object()))?;

    let name = text_field(patient, &["name", "nome"]);
    let age = text_field(patient, &["age", "idade"]);
    match (name, age) {
        (Some(name), Some(age)) => Some(format!("{name} ({age})")),
        (Some(name), None) => Some(name),
        (None, Some(age)) => Some(format!("age {age}")),
        (None, None) => None,
    }
}

fn text_field(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
