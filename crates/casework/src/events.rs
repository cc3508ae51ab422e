// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event subcommands: stand-ins for the inbound side of the chat protocol.

use casework_core::{CaseId, CaseworkError, Decision, MessageRole, ReactionKind, SupportFlag};
use casework_workflow::{
    DecisionInput, DecisionOutcome, Intake, IntakeOutcome, Reaction, ReactionOutcome,
    SchedulingOutcome, Workflow,
};

pub async fn intake(
    workflow: &Workflow,
    origin_id: String,
    origin_room_id: String,
    sender_user_id: String,
    document_url: String,
) -> Result<(), CaseworkError> {
    let outcome = workflow
        .intake(Intake {
            origin_id,
            origin_room_id,
            sender_user_id,
            document_url,
        })
        .await?;
    match outcome {
        IntakeOutcome::Created { case_id, job_id } => {
            println!("created case {case_id} (job {job_id})")
        }
        IntakeOutcome::Duplicate { case_id } => println!("duplicate of case {case_id}"),
    }
    Ok(())
}

pub async fn decide(
    workflow: &Workflow,
    case_id: CaseId,
    decision: Decision,
    support_flag: SupportFlag,
    reason: Option<String>,
    decided_by: String,
) -> Result<(), CaseworkError> {
    let outcome = workflow
        .decide(DecisionInput {
            case_id,
            decision,
            support_flag,
            reason,
            decided_by,
        })
        .await?;
    print_decision(outcome)
}

pub async fn decide_from_reply(
    workflow: &Workflow,
    case_id: CaseId,
    text: &str,
    decided_by: &str,
) -> Result<(), CaseworkError> {
    let outcome = workflow
        .decide_from_reply(case_id, &unescape(text), decided_by)
        .await?;
    print_decision(outcome)
}

fn print_decision(outcome: DecisionOutcome) -> Result<(), CaseworkError> {
    match outcome {
        DecisionOutcome::Accepted { job_id } => println!("accepted (job {job_id})"),
        DecisionOutcome::Denied { job_id } => println!("denied (job {job_id})"),
        DecisionOutcome::Rejected(rejection) => return Err(rejected(rejection)),
    }
    Ok(())
}

pub async fn reply(workflow: &Workflow, case_id: CaseId, text: &str) -> Result<(), CaseworkError> {
    match workflow.scheduling_reply(case_id, &unescape(text)).await? {
        SchedulingOutcome::Confirmed { job_id } => println!("appointment confirmed (job {job_id})"),
        SchedulingOutcome::Denied { job_id } => println!("appointment denied (job {job_id})"),
        SchedulingOutcome::Reprompted { reason, job_id } => {
            println!("reply not understood: {reason} (reprompt job {job_id})")
        }
        SchedulingOutcome::Rejected(rejection) => return Err(rejected(rejection)),
    }
    Ok(())
}

pub async fn react(
    workflow: &Workflow,
    case_id: CaseId,
    message_role: MessageRole,
    key: &str,
    reacted_by: String,
) -> Result<(), CaseworkError> {
    let outcome = workflow
        .reaction(Reaction {
            case_id,
            message_role,
            reaction_kind: ReactionKind::from_key(key),
            reacted_by,
        })
        .await?;
    match outcome {
        ReactionOutcome::CleanupTriggered { job_id } => println!("cleanup triggered (job {job_id})"),
        ReactionOutcome::AlreadyTriggered => println!("cleanup already triggered"),
        ReactionOutcome::Ignored => println!("reaction recorded"),
        ReactionOutcome::Rejected(rejection) => return Err(rejected(rejection)),
    }
    Ok(())
}

fn rejected(rejection: casework_workflow::Rejection) -> CaseworkError {
    CaseworkError::Validation(format!("event rejected: {rejection}"))
}

/// Shells make multi-line arguments awkward; accept `\n` escapes.
fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}
