// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the worker loop against mock collaborators.

use std::time::Duration;

use casework_core::{
    CaseEventKind, CaseId, CaseStatus, CaseworkError, JobStatus, JobType, MessageRole,
    ReactionKind, RetryPolicy,
};
use casework_test_utils::{MockExtractor, TestHarness};
use casework_worker::{RedactionRetry, TickOutcome};
use casework_workflow::{DecisionOutcome, Reaction, ReactionOutcome, SchedulingOutcome};
use tokio_util::sync::CancellationToken;

fn job_types(outcomes: &[TickOutcome]) -> Vec<JobType> {
    outcomes
        .iter()
        .map(|outcome| match outcome {
            TickOutcome::Completed { job_type, .. }
            | TickOutcome::SkippedStale { job_type, .. }
            | TickOutcome::Failed { job_type, .. } => *job_type,
            TickOutcome::Idle => panic!("idle ticks are not collected"),
        })
        .collect()
}

fn decision_reply(case_id: CaseId) -> String {
    format!("decision: accept\nsupport_flag: none\nreason: ok\ncase_id: {case_id}")
}

fn scheduling_reply(case_id: CaseId) -> String {
    format!("16-02-2026 14:30 BRT\nlocation: Unit 2, room 4\ninstructions: fasting 8h\ncase: {case_id}")
}

async fn to_wait_appt(h: &TestHarness, origin: &str) -> CaseId {
    let case_id = h.create_case(origin).await.unwrap();
    h.run_until_idle().await.unwrap();
    let outcome = h
        .workflow
        .decide_from_reply(case_id, &decision_reply(case_id), "@doctor:localhost")
        .await
        .unwrap();
    assert!(matches!(outcome, DecisionOutcome::Accepted { .. }));
    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitAppt);
    case_id
}

async fn to_wait_cleanup(h: &TestHarness, origin: &str) -> CaseId {
    let case_id = to_wait_appt(h, origin).await;
    let outcome = h
        .workflow
        .scheduling_reply(case_id, &scheduling_reply(case_id))
        .await
        .unwrap();
    assert!(matches!(outcome, SchedulingOutcome::Confirmed { .. }));
    h.run_until_idle().await.unwrap();
    assert_eq!(
        h.status(case_id).await.unwrap(),
        CaseStatus::WaitR1CleanupThumbs
    );
    case_id
}

fn thumbs_up(case_id: CaseId) -> Reaction {
    Reaction {
        case_id,
        message_role: MessageRole::FinalReply,
        reaction_kind: ReactionKind::ThumbsUp,
        reacted_by: "@nurse:localhost".into(),
    }
}

#[tokio::test]
async fn e1_runs_through_the_worker_to_cleaned() {
    let h = TestHarness::builder().build().await.unwrap();
    let case_id = h.create_case("$E1").await.unwrap();

    let outcomes = h.run_until_idle().await.unwrap();
    assert_eq!(
        job_types(&outcomes),
        vec![
            JobType::AckIntake,
            JobType::ExtractDocument,
            JobType::StructureCase,
            JobType::SuggestAction,
            JobType::PostDecisionWidget,
        ]
    );
    assert!(
        outcomes
            .iter()
            .all(|o| matches!(o, TickOutcome::Completed { .. }))
    );
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitDoctor);

    let ack = &h.chat.sent_to(&h.rooms.intake_room_id).await[0];
    assert_eq!(ack.in_reply_to.as_deref(), Some("$E1"));
    assert!(ack.body.contains(&case_id.to_string()));

    assert_eq!(
        h.llm.structure_inputs().await,
        vec![
            "Referral form Patient: Maria Souza, 61 Requested: upper endoscopy Contact 11111"
                .to_string()
        ]
    );
    let case = h.workflow.case(case_id).await.unwrap().unwrap();
    assert_eq!(case.record_number.as_deref(), Some("48213"));

    let widget = h.chat.sent_to(&h.rooms.decision_room_id).await;
    assert_eq!(widget.len(), 1);
    assert!(widget[0].body.contains("record: 48213"));
    assert!(widget[0].body.contains("patient: Maria Souza (61)"));

    let outcome = h
        .workflow
        .decide_from_reply(case_id, &decision_reply(case_id), "@doctor:localhost")
        .await
        .unwrap();
    assert!(matches!(outcome, DecisionOutcome::Accepted { .. }));
    assert_eq!(
        job_types(&h.run_until_idle().await.unwrap()),
        vec![JobType::PostSchedulingRequest]
    );
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitAppt);
    assert_eq!(h.chat.sent_to(&h.rooms.scheduling_room_id).await.len(), 1);

    let outcome = h
        .workflow
        .scheduling_reply(case_id, &scheduling_reply(case_id))
        .await
        .unwrap();
    assert!(matches!(outcome, SchedulingOutcome::Confirmed { .. }));
    assert_eq!(
        job_types(&h.run_until_idle().await.unwrap()),
        vec![JobType::PostFinalAppointment]
    );
    assert_eq!(
        h.status(case_id).await.unwrap(),
        CaseStatus::WaitR1CleanupThumbs
    );
    let final_reply = h
        .chat
        .sent_to(&h.rooms.intake_room_id)
        .await
        .pop()
        .unwrap();
    assert_eq!(final_reply.in_reply_to.as_deref(), Some("$E1"));
    assert!(final_reply.body.contains("date: 16-02-2026 14:30 BRT"));
    assert!(final_reply.body.contains("location: Unit 2, room 4"));

    let outcome = h.workflow.reaction(thumbs_up(case_id)).await.unwrap();
    assert!(matches!(outcome, ReactionOutcome::CleanupTriggered { .. }));
    assert_eq!(
        job_types(&h.run_until_idle().await.unwrap()),
        vec![JobType::ExecuteCleanup]
    );
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::Cleaned);

    let tracked: Vec<String> = h
        .workflow
        .messages(case_id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.event_id)
        .collect();
    assert_eq!(tracked.len(), 5);
    let redacted: Vec<String> = h
        .chat
        .redactions()
        .await
        .into_iter()
        .map(|(_, event_id)| event_id)
        .collect();
    assert_eq!(redacted, tracked);
}

#[tokio::test]
async fn transient_chat_failures_are_retried() {
    let h = TestHarness::builder().build().await.unwrap();
    h.chat.fail_next_posts(2).await;
    let case_id = h.create_case("$retry").await.unwrap();

    let outcomes = h.run_until_idle().await.unwrap();
    assert!(matches!(
        outcomes[0],
        TickOutcome::Failed {
            job_type: JobType::AckIntake,
            dead: false,
            ..
        }
    ));
    assert!(matches!(
        outcomes[2],
        TickOutcome::Completed {
            job_type: JobType::AckIntake,
            ..
        }
    ));
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitDoctor);

    let ack = h
        .workflow
        .jobs(case_id)
        .await
        .unwrap()
        .into_iter()
        .find(|j| j.job_type == JobType::AckIntake)
        .unwrap();
    assert_eq!(ack.status, JobStatus::Done);
    assert_eq!(ack.attempts, 2);

    let events = h.workflow.events(case_id).await.unwrap();
    let retries = events
        .iter()
        .filter(|e| e.kind == CaseEventKind::JobRetryScheduled)
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn permanent_extraction_failure_fails_the_case() {
    let h = TestHarness::builder()
        .with_extractor(MockExtractor::failing("not a pdf"))
        .build()
        .await
        .unwrap();
    let case_id = h.create_case("$broken").await.unwrap();

    let outcomes = h.run_until_idle().await.unwrap();
    assert_eq!(
        job_types(&outcomes),
        vec![
            JobType::AckIntake,
            JobType::ExtractDocument,
            JobType::PostFinalFailure,
        ]
    );
    assert!(matches!(outcomes[1], TickOutcome::Failed { dead: true, .. }));

    let case = h.workflow.case(case_id).await.unwrap().unwrap();
    assert_eq!(case.status, CaseStatus::Failed);
    assert!(case.milestones.failed_at.is_some());

    let notice = h
        .chat
        .sent_to(&h.rooms.intake_room_id)
        .await
        .pop()
        .unwrap();
    assert_eq!(notice.in_reply_to.as_deref(), Some("$broken"));
    assert!(notice.body.contains("cause: extract\n"));
    assert!(notice.body.contains("details: extract: extraction error: not a pdf"));

    let roles: Vec<MessageRole> = h
        .workflow
        .messages(case_id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.role)
        .collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::Origin,
            MessageRole::Ack,
            MessageRole::FailureNotice
        ]
    );
}

#[tokio::test]
async fn panicking_handler_does_not_stop_the_loop() {
    let h = TestHarness::builder().build().await.unwrap();
    h.llm.panic_on_structure().await;
    let first = h.create_case("$panic-1").await.unwrap();
    let second = h.create_case("$panic-2").await.unwrap();

    h.run_until_idle().await.unwrap();

    for case_id in [first, second] {
        assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::Failed);
        let structure = h
            .workflow
            .jobs(case_id)
            .await
            .unwrap()
            .into_iter()
            .find(|j| j.job_type == JobType::StructureCase)
            .unwrap();
        assert_eq!(structure.status, JobStatus::Dead);
        assert_eq!(structure.attempts, 1);
        assert!(
            structure
                .last_error
                .as_deref()
                .unwrap()
                .starts_with("handler panicked")
        );
    }
    let notices = h
        .chat
        .sent_messages()
        .await
        .into_iter()
        .filter(|m| m.body.contains("could not be completed"))
        .count();
    assert_eq!(notices, 2);
}

#[tokio::test]
async fn mismatched_payload_is_dead_lettered_without_running() {
    let h = TestHarness::builder().build().await.unwrap();
    let case_id = h.create_case("$mismatch").await.unwrap();
    h.database()
        .write(move |tx| {
            tx.execute(
                "UPDATE jobs SET payload = '{\"type\":\"execute_cleanup\"}'
                 WHERE case_id = ?1 AND job_type = 'ack_intake'",
                rusqlite::params![case_id.0.to_string()],
            )
        })
        .await
        .unwrap();

    let outcome = h.worker.tick().await.unwrap();
    assert!(matches!(
        outcome,
        TickOutcome::Failed {
            job_type: JobType::AckIntake,
            dead: true,
            ..
        }
    ));
    assert!(h.chat.sent_messages().await.is_empty());

    let ack = h
        .workflow
        .jobs(case_id)
        .await
        .unwrap()
        .into_iter()
        .find(|j| j.job_type == JobType::AckIntake)
        .unwrap();
    assert_eq!(ack.status, JobStatus::Dead);
    assert!(ack.last_error.unwrap().contains("execute_cleanup"));
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::Failed);
}

#[tokio::test]
async fn crash_mid_job_is_recovered_on_boot() {
    let h = TestHarness::builder().build().await.unwrap();
    let case_id = h.create_case("$crash").await.unwrap();

    // Claimed, then the process "dies" before the handler finishes.
    let claimed = h.workflow.queue().claim_next_due().await.unwrap().unwrap();
    assert_eq!(claimed.status, JobStatus::Running);
    assert!(h.run_until_idle().await.unwrap().is_empty());

    let report = h.recover().await.unwrap();
    assert_eq!(report.orphaned_reset, 1);
    assert!(report.resumed.is_empty());

    let job = h.workflow.queue().get(claimed.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.attempts, 0);

    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitDoctor);
    let acks = h
        .chat
        .sent_messages()
        .await
        .into_iter()
        .filter(|m| m.body.starts_with("Referral received"))
        .count();
    assert_eq!(acks, 1);
}

#[tokio::test]
async fn recovery_leaves_waiting_cases_alone() {
    let h = TestHarness::builder().build().await.unwrap();
    let waiting = h.create_case("$waiting").await.unwrap();
    h.run_until_idle().await.unwrap();

    let report = h.recover().await.unwrap();
    assert_eq!(report.orphaned_reset, 0);
    assert!(report.resumed.is_empty());
    assert!(report.failed_cases.is_empty());
    assert_eq!(h.status(waiting).await.unwrap(), CaseStatus::WaitDoctor);
}

#[tokio::test]
async fn invalid_scheduling_reply_reprompts_under_the_request() {
    let h = TestHarness::builder().build().await.unwrap();
    let case_id = to_wait_appt(&h, "$reprompt").await;

    let outcome = h
        .workflow
        .scheduling_reply(case_id, "next tuesday works")
        .await
        .unwrap();
    let SchedulingOutcome::Reprompted { reason, .. } = outcome else {
        panic!("expected a reprompt, got {outcome:?}");
    };
    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitAppt);

    let posts = h.chat.sent_to(&h.rooms.scheduling_room_id).await;
    assert_eq!(posts.len(), 2);
    assert_eq!(
        posts[1].in_reply_to.as_deref(),
        Some(posts[0].event_id.as_str())
    );
    assert!(posts[1].body.contains(&format!("could not be read ({reason})")));
}

#[tokio::test]
async fn cleanup_survives_failed_redactions() {
    let h = TestHarness::builder().build().await.unwrap();
    let case_id = to_wait_cleanup(&h, "$E2").await;
    h.chat.fail_redaction_of("$E2").await;

    h.workflow.reaction(thumbs_up(case_id)).await.unwrap();
    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::Cleaned);

    let events = h.workflow.events(case_id).await.unwrap();
    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.kind == CaseEventKind::MessageRedactionFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].payload["event_id"], "$E2");
    assert_eq!(h.chat.redactions().await.len(), 4);
}

#[tokio::test]
async fn store_failure_after_claim_requeues_without_an_attempt() {
    let h = TestHarness::builder()
        .with_retry_policy(RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            factor: 2,
            max_delay: Duration::ZERO,
        })
        .build()
        .await
        .unwrap();
    let case_id = h.create_case("$disk").await.unwrap();
    let before = h.status(case_id).await.unwrap();

    h.database()
        .write(|tx| {
            tx.execute_batch(
                "CREATE TRIGGER refuse_completion BEFORE UPDATE OF status ON jobs
                 WHEN NEW.status = 'done'
                 BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
            )
        })
        .await
        .unwrap();

    let err = h.worker.tick().await.unwrap_err();
    assert!(matches!(err, CaseworkError::Storage { .. }));
    assert_eq!(h.chat.sent_to(&h.rooms.intake_room_id).await.len(), 1);
    assert_eq!(h.status(case_id).await.unwrap(), before);

    let jobs = h.workflow.jobs(case_id).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_type, JobType::AckIntake);
    assert_eq!(jobs[0].status, JobStatus::Queued);
    assert_eq!(jobs[0].attempts, 0);
    let events = h.workflow.events(case_id).await.unwrap();
    assert!(!events.iter().any(|e| e.kind == CaseEventKind::CaseFailed));

    h.database()
        .write(|tx| tx.execute_batch("DROP TRIGGER refuse_completion;"))
        .await
        .unwrap();
    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitDoctor);
}

#[tokio::test]
async fn missing_record_number_fails_the_case() {
    let h = TestHarness::builder()
        .with_extractor(MockExtractor::new("Referral form without a watermark"))
        .build()
        .await
        .unwrap();
    let case_id = h.create_case("$nowatermark").await.unwrap();

    let outcomes = h.run_until_idle().await.unwrap();
    assert!(matches!(
        outcomes[1],
        TickOutcome::Failed {
            job_type: JobType::ExtractDocument,
            dead: true,
            ..
        }
    ));
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::Failed);

    let extract = h
        .workflow
        .jobs(case_id)
        .await
        .unwrap()
        .into_iter()
        .find(|j| j.job_type == JobType::ExtractDocument)
        .unwrap();
    assert_eq!(extract.status, JobStatus::Dead);
    assert_eq!(extract.attempts, 1);

    let notice = h
        .chat
        .sent_to(&h.rooms.intake_room_id)
        .await
        .pop()
        .unwrap();
    assert!(notice.body.contains("cause: record_extract"));
}

#[tokio::test]
async fn rate_limited_redaction_is_retried() {
    let h = TestHarness::builder().build().await.unwrap();
    let case_id = to_wait_cleanup(&h, "$E3").await;
    h.chat.rate_limit_redaction_of("$E3", 2, 5).await;

    h.workflow.reaction(thumbs_up(case_id)).await.unwrap();
    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::Cleaned);

    let attempts = h.chat.redaction_attempts().await;
    assert_eq!(attempts.iter().filter(|id| *id == "$E3").count(), 3);
    assert!(h.chat.redactions().await.iter().any(|(_, id)| id == "$E3"));
    let events = h.workflow.events(case_id).await.unwrap();
    assert!(
        !events
            .iter()
            .any(|e| e.kind == CaseEventKind::MessageRedactionFailed)
    );
}

#[tokio::test]
async fn redaction_gives_up_after_the_attempt_limit() {
    let h = TestHarness::builder()
        .with_redaction_retry(RedactionRetry {
            max_attempts: 2,
            min_delay: Duration::from_millis(1),
        })
        .build()
        .await
        .unwrap();
    let case_id = to_wait_cleanup(&h, "$E4").await;
    h.chat.rate_limit_redaction_of("$E4", 5, 0).await;

    h.workflow.reaction(thumbs_up(case_id)).await.unwrap();
    h.run_until_idle().await.unwrap();
    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::Cleaned);

    let attempts = h.chat.redaction_attempts().await;
    assert_eq!(attempts.iter().filter(|id| *id == "$E4").count(), 2);
    let events = h.workflow.events(case_id).await.unwrap();
    let failed: Vec<_> = events
        .iter()
        .filter(|e| e.kind == CaseEventKind::MessageRedactionFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].payload["event_id"], "$E4");
}

#[tokio::test]
async fn run_drains_the_queue_and_stops_on_cancel() {
    let h = TestHarness::builder().build().await.unwrap();
    let case_id = h.create_case("$loop").await.unwrap();
    let cancel = CancellationToken::new();

    let stopper = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        }
    };
    tokio::time::timeout(
        Duration::from_secs(10),
        async { tokio::join!(h.worker.run(cancel.clone()), stopper) },
    )
    .await
    .expect("worker loop did not stop");

    assert_eq!(h.status(case_id).await.unwrap(), CaseStatus::WaitDoctor);
}
