// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only subcommands: `jobs`, `case`, `cases`.

use casework_core::{Case, CaseId, CaseworkError, Job, JobStatus};
use casework_workflow::Workflow;
use serde::Serialize;

/// Structured output of `casework case --json`.
#[derive(Debug, Serialize)]
struct CaseReport {
    case: Case,
    jobs: Vec<Job>,
    messages: Vec<casework_core::CaseMessage>,
    events: Vec<casework_core::CaseEvent>,
}

pub async fn jobs(
    workflow: &Workflow,
    status: Option<JobStatus>,
    limit: usize,
    json: bool,
) -> Result<(), CaseworkError> {
    let jobs = workflow.queue().list_by_status(status, limit).await?;
    if json {
        println!("{}", to_json(&jobs)?);
        return Ok(());
    }

    let counts = workflow.queue().counts_by_status().await?;
    let summary: Vec<String> = counts
        .iter()
        .map(|(status, count)| format!("{status}={count}"))
        .collect();
    println!("jobs: {}", summary.join(" "));
    for job in &jobs {
        print_job(job);
    }
    Ok(())
}

pub async fn case(workflow: &Workflow, case_id: CaseId, json: bool) -> Result<(), CaseworkError> {
    let case = workflow
        .case(case_id)
        .await?
        .ok_or_else(|| CaseworkError::NotFound {
            entity: "case",
            id: case_id.to_string(),
        })?;
    let report = CaseReport {
        jobs: workflow.jobs(case_id).await?,
        messages: workflow.messages(case_id).await?,
        events: workflow.events(case_id).await?,
        case,
    };
    if json {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    let case = &report.case;
    println!("case {}  {}", case.id, case.status);
    println!("  origin    {} in {}", case.origin_id, case.origin_room_id);
    println!("  document  {}", case.document_url);
    if let Some(record) = &case.record_number {
        println!("  record    {record}");
    }
    if let Some(decision) = case.decision {
        println!(
            "  decision  {decision} ({}) by {}",
            case.support_flag.map(|f| f.to_string()).unwrap_or_default(),
            case.decided_by.as_deref().unwrap_or("-")
        );
    }
    if let Some(appointment) = &case.appointment_status {
        println!(
            "  appointment {appointment} {}",
            case.appointment_at.as_deref().unwrap_or("")
        );
    }

    println!("jobs:");
    for job in &report.jobs {
        print_job(job);
    }
    println!("messages:");
    for message in &report.messages {
        println!(
            "  {:<20} {} {}",
            message.role.as_ref(),
            message.room_id,
            message.event_id
        );
    }
    println!("events:");
    for event in &report.events {
        let transition = match (event.from_status, event.to_status) {
            (Some(from), Some(to)) => format!(" {from} -> {to}"),
            _ => String::new(),
        };
        println!(
            "  {} {:<6} {}{transition} {}",
            event.created_at,
            event.actor.as_ref(),
            event.kind,
            event.payload
        );
    }
    Ok(())
}

pub async fn cases(workflow: &Workflow, limit: usize) -> Result<(), CaseworkError> {
    for case in workflow.recent_cases(None, limit).await? {
        println!("{}  {:<24} {}", case.id, case.status.as_ref(), case.updated_at);
    }
    Ok(())
}

fn print_job(job: &Job) {
    println!(
        "  #{:<5} {:<30} {:<8} {}/{} due {}{}",
        job.id.to_string(),
        job.job_type.as_ref(),
        job.status.as_ref(),
        job.attempts,
        job.max_attempts,
        job.run_after,
        job.last_error
            .as_deref()
            .map(|e| format!("  last error: {e}"))
            .unwrap_or_default()
    );
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CaseworkError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CaseworkError::Internal(format!("failed to render JSON: {e}")))
}
