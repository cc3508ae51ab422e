// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job queue operations.
//!
//! These functions must run inside a transaction opened by
//! [`Database::write`](crate::Database::write) when they modify rows, so that a
//! job state change commits together with the case transition it belongs to.

use casework_core::{CaseId, Job, JobId, JobStatus, JobType, RetryPolicy};
use rusqlite::{OptionalExtension, params};

use crate::models::{CompleteOutcome, FailOutcome, parse_column};

const JOB_COLUMNS: &str = "id, case_id, job_type, payload, status, attempts, max_attempts, \
                           run_after, last_error, created_at, updated_at";

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: JobId(row.get(0)?),
        case_id: parse_column(row, 1)?,
        job_type: parse_column(row, 2)?,
        payload: row.get(3)?,
        status: parse_column(row, 4)?,
        attempts: row.get(5)?,
        max_attempts: row.get(6)?,
        run_after: row.get(7)?,
        last_error: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// SQLite modifier for `strftime(..., 'now', ?)` shifting by a duration.
fn offset_modifier(delay: std::time::Duration) -> String {
    format!("+{:.3} seconds", delay.as_secs_f64())
}

/// Insert a `queued` job due now (or after `delay`). Returns the new id.
pub fn insert(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    job_type: JobType,
    payload: &str,
    max_attempts: u32,
    delay: Option<std::time::Duration>,
) -> rusqlite::Result<JobId> {
    let modifier = offset_modifier(delay.unwrap_or_default());
    conn.execute(
        "INSERT INTO jobs (case_id, job_type, payload, max_attempts, run_after)
         VALUES (?1, ?2, ?3, ?4, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?5))",
        params![
            case_id.to_string(),
            job_type.as_ref(),
            payload,
            max_attempts,
            modifier
        ],
    )?;
    Ok(JobId(conn.last_insert_rowid()))
}

/// Atomically claim the next due `queued` job and mark it `running`.
///
/// Ordered by `run_after`, then `created_at`, then id. The inner SELECT and the
/// UPDATE are one statement; with the IMMEDIATE transaction around it no other
/// writer can claim the same row.
pub fn claim_next_due(conn: &rusqlite::Connection) -> rusqlite::Result<Option<Job>> {
    conn.query_row(
        &format!(
            "UPDATE jobs SET status = 'running', updated_at = {NOW}
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE status = 'queued' AND run_after <= {NOW}
                 ORDER BY run_after, created_at, id
                 LIMIT 1
             ) AND status = 'queued'
             RETURNING {JOB_COLUMNS}"
        ),
        [],
        job_from_row,
    )
    .optional()
}

pub fn get(conn: &rusqlite::Connection, id: JobId) -> rusqlite::Result<Option<Job>> {
    conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
        params![id.0],
        job_from_row,
    )
    .optional()
}

fn status_of(conn: &rusqlite::Connection, id: JobId) -> rusqlite::Result<Option<JobStatus>> {
    conn.query_row("SELECT status FROM jobs WHERE id = ?1", params![id.0], |row| {
        parse_column(row, 0)
    })
    .optional()
}

/// Move a `running` job to `done`. Completing a `done` job is a no-op.
pub fn complete(conn: &rusqlite::Connection, id: JobId) -> rusqlite::Result<CompleteOutcome> {
    let outcome = match status_of(conn, id)? {
        None => CompleteOutcome::Missing,
        Some(JobStatus::Done) => CompleteOutcome::AlreadyDone,
        Some(JobStatus::Running) => {
            conn.execute(
                &format!(
                    "UPDATE jobs SET status = 'done', updated_at = {NOW}
                     WHERE id = ?1 AND status = 'running'"
                ),
                params![id.0],
            )?;
            CompleteOutcome::Completed
        }
        Some(other) => CompleteOutcome::WrongStatus(other),
    };
    Ok(outcome)
}

/// Record a failed attempt of a `running` job.
///
/// A retriable failure that leaves attempts below the maximum requeues the
/// job after the policy's backoff; anything else dead-letters it.
pub fn fail(
    conn: &rusqlite::Connection,
    id: JobId,
    error: &str,
    retriable: bool,
    policy: &RetryPolicy,
) -> rusqlite::Result<FailOutcome> {
    let row: Option<(JobStatus, u32, u32)> = conn
        .query_row(
            "SELECT status, attempts, max_attempts FROM jobs WHERE id = ?1",
            params![id.0],
            |row| Ok((parse_column(row, 0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let Some((status, attempts, max_attempts)) = row else {
        return Ok(FailOutcome::Missing);
    };
    if status != JobStatus::Running {
        return Ok(FailOutcome::WrongStatus(status));
    }

    let attempts = (attempts + 1).min(max_attempts);
    if retriable && attempts < max_attempts {
        let modifier = offset_modifier(policy.delay_for(attempts));
        let run_after: String = conn.query_row(
            &format!(
                "UPDATE jobs SET status = 'queued', attempts = ?1, last_error = ?2,
                     run_after = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3),
                     updated_at = {NOW}
                 WHERE id = ?4
                 RETURNING run_after"
            ),
            params![attempts, error, modifier, id.0],
            |row| row.get(0),
        )?;
        Ok(FailOutcome::Retrying {
            attempts,
            run_after,
        })
    } else {
        conn.execute(
            &format!(
                "UPDATE jobs SET status = 'dead', attempts = ?1, last_error = ?2,
                     updated_at = {NOW}
                 WHERE id = ?3"
            ),
            params![attempts, error, id.0],
        )?;
        Ok(FailOutcome::Dead { attempts })
    }
}

/// Return every `running` job to `queued`, keeping attempts.
///
/// `run_after` is pulled back to now when it lies in the future so the job is
/// immediately claimable. Returns the number of jobs reset.
pub fn reset_orphaned(conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    conn.execute(
        &format!(
            "UPDATE jobs SET status = 'queued',
                 run_after = MIN(run_after, {NOW}),
                 updated_at = {NOW}
             WHERE status = 'running'"
        ),
        [],
    )
}

/// Return one `running` job to `queued` without charging an attempt.
///
/// Used when the store failed after the claim. Returns whether the job was
/// still running.
pub fn requeue(conn: &rusqlite::Connection, id: JobId) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        &format!(
            "UPDATE jobs SET status = 'queued',
                 run_after = MIN(run_after, {NOW}),
                 updated_at = {NOW}
             WHERE id = ?1 AND status = 'running'"
        ),
        params![id.0],
    )?;
    Ok(changed == 1)
}

/// Whether the case has a `queued` or `running` job.
pub fn has_active(conn: &rusqlite::Connection, case_id: CaseId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM jobs WHERE case_id = ?1 AND status IN ('queued', 'running'))",
        params![case_id.to_string()],
        |row| row.get(0),
    )
}

/// Whether a job of the given type was ever enqueued for the case.
pub fn exists_for_case(
    conn: &rusqlite::Connection,
    case_id: CaseId,
    job_type: JobType,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM jobs WHERE case_id = ?1 AND job_type = ?2)",
        params![case_id.to_string(), job_type.as_ref()],
        |row| row.get(0),
    )
}

pub fn list_for_case(conn: &rusqlite::Connection, case_id: CaseId) -> rusqlite::Result<Vec<Job>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE case_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![case_id.to_string()], job_from_row)?;
    rows.collect()
}

/// Most recent jobs, optionally filtered by status.
pub fn list_by_status(
    conn: &rusqlite::Connection,
    status: Option<JobStatus>,
    limit: usize,
) -> rusqlite::Result<Vec<Job>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs
         WHERE ?1 IS NULL OR status = ?1
         ORDER BY id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![status.map(|s| s.to_string()), limit], job_from_row)?;
    rows.collect()
}

/// Job counts grouped by status.
pub fn counts_by_status(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<(JobStatus, u64)>> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status ORDER BY status")?;
    let rows = stmt.query_map([], |row| {
        let count: i64 = row.get(1)?;
        Ok((parse_column(row, 0)?, u64::try_from(count).unwrap_or(0)))
    })?;
    rows.collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use casework_core::{CaseId, JobPayload};
    use tempfile::tempdir;

    use super::*;
    use crate::database::Database;
    use crate::models::NewCase;
    use crate::queries::cases;

    async fn setup_db() -> (Database, tempfile::TempDir, CaseId) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("jobs.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let case_id = CaseId::new();
        db.write(move |tx| {
            cases::insert(
                tx,
                &NewCase {
                    id: case_id,
                    origin_id: format!("$origin-{case_id}"),
                    origin_room_id: "!intake:test".into(),
                    sender_user_id: "@nurse:test".into(),
                    document_url: "mxc://test/doc".into(),
                },
            )?;
            Ok(())
        })
        .await
        .unwrap();
        (db, dir, case_id)
    }

    async fn enqueue(db: &Database, case_id: CaseId, job_type: JobType, max: u32) -> JobId {
        let payload = JobPayload::unit(job_type).unwrap().encode().unwrap();
        db.write(move |tx| insert(tx, case_id, job_type, &payload, max, None))
            .await
            .unwrap()
    }

    async fn claim(db: &Database) -> Option<Job> {
        db.write(|tx| claim_next_due(tx)).await.unwrap()
    }

    async fn make_due(db: &Database, id: JobId) {
        db.write(move |tx| {
            tx.execute(
                "UPDATE jobs SET run_after = '2000-01-01T00:00:00.000Z' WHERE id = ?1",
                params![id.0],
            )
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn claim_marks_running_and_empties_queue() {
        let (db, _dir, case_id) = setup_db().await;
        let id = enqueue(&db, case_id, JobType::AckIntake, 5).await;

        let job = claim(&db).await.expect("job should be due");
        assert_eq!(job.id, id);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.job_type, JobType::AckIntake);
        assert_eq!(job.attempts, 0);

        assert!(claim(&db).await.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_respects_run_after_and_fifo() {
        let (db, _dir, case_id) = setup_db().await;
        let later = db
            .write(move |tx| {
                insert(
                    tx,
                    case_id,
                    JobType::AckIntake,
                    r#"{"type":"ack_intake"}"#,
                    5,
                    Some(Duration::from_secs(3600)),
                )
            })
            .await
            .unwrap();
        let first = enqueue(&db, case_id, JobType::ExtractDocument, 5).await;
        let second = enqueue(&db, case_id, JobType::StructureCase, 5).await;

        assert_eq!(claim(&db).await.unwrap().id, first);
        assert_eq!(claim(&db).await.unwrap().id, second);
        assert!(claim(&db).await.is_none(), "future job must not be claimed");

        make_due(&db, later).await;
        assert_eq!(claim(&db).await.unwrap().id, later);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn complete_is_idempotent_and_guarded() {
        let (db, _dir, case_id) = setup_db().await;
        let id = enqueue(&db, case_id, JobType::AckIntake, 5).await;

        let queued = db.write(move |tx| complete(tx, id)).await.unwrap();
        assert_eq!(queued, CompleteOutcome::WrongStatus(JobStatus::Queued));

        claim(&db).await.unwrap();
        assert_eq!(
            db.write(move |tx| complete(tx, id)).await.unwrap(),
            CompleteOutcome::Completed
        );
        assert_eq!(
            db.write(move |tx| complete(tx, id)).await.unwrap(),
            CompleteOutcome::AlreadyDone
        );
        assert_eq!(
            db.write(|tx| complete(tx, JobId(9999))).await.unwrap(),
            CompleteOutcome::Missing
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn n_retriable_failures_dead_letter_with_increasing_run_after() {
        let (db, _dir, case_id) = setup_db().await;
        let policy = RetryPolicy::default();
        let id = enqueue(&db, case_id, JobType::AckIntake, policy.max_attempts).await;

        let mut previous: Option<String> = None;
        for attempt in 1..policy.max_attempts {
            claim(&db).await.expect("job should be claimable");
            let outcome = db
                .write(move |tx| fail(tx, id, "503 from chat", true, &policy))
                .await
                .unwrap();
            match outcome {
                FailOutcome::Retrying {
                    attempts,
                    run_after,
                } => {
                    assert_eq!(attempts, attempt);
                    if let Some(prev) = &previous {
                        assert!(run_after > *prev, "{run_after} should follow {prev}");
                    }
                    previous = Some(run_after);
                }
                other => panic!("attempt {attempt}: expected retry, got {other:?}"),
            }
            let job = db.read(move |c| get(c, id)).await.unwrap().unwrap();
            assert_eq!(job.status, JobStatus::Queued);
            make_due(&db, id).await;
        }

        claim(&db).await.unwrap();
        let outcome = db
            .write(move |tx| fail(tx, id, "503 from chat", true, &policy))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            FailOutcome::Dead {
                attempts: policy.max_attempts
            }
        );
        let job = db.read(move |c| get(c, id)).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Dead);
        assert_eq!(job.attempts, job.max_attempts);
        assert_eq!(job.last_error.as_deref(), Some("503 from chat"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn permanent_failure_dead_letters_immediately() {
        let (db, _dir, case_id) = setup_db().await;
        let id = enqueue(&db, case_id, JobType::AckIntake, 5).await;
        claim(&db).await.unwrap();

        let policy = RetryPolicy::default();
        let outcome = db
            .write(move |tx| fail(tx, id, "bad payload", false, &policy))
            .await
            .unwrap();
        assert_eq!(outcome, FailOutcome::Dead { attempts: 1 });

        let again = db
            .write(move |tx| fail(tx, id, "bad payload", false, &policy))
            .await
            .unwrap();
        assert_eq!(again, FailOutcome::WrongStatus(JobStatus::Dead));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_orphaned_requeues_running_jobs() {
        let (db, _dir, case_id) = setup_db().await;
        let id = enqueue(&db, case_id, JobType::AckIntake, 5).await;
        claim(&db).await.unwrap();
        db.write(move |tx| {
            tx.execute(
                "UPDATE jobs SET attempts = 2, run_after = '2999-01-01T00:00:00.000Z' WHERE id = ?1",
                params![id.0],
            )
        })
        .await
        .unwrap();

        assert_eq!(db.write(|tx| reset_orphaned(tx)).await.unwrap(), 1);

        let job = db.read(move |c| get(c, id)).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.attempts, 2);
        assert!(job.run_after.as_str() < "2999");
        assert_eq!(claim(&db).await.unwrap().id, id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn requeue_returns_one_running_job_without_an_attempt() {
        let (db, _dir, case_id) = setup_db().await;
        let first = enqueue(&db, case_id, JobType::AckIntake, 5).await;
        let second = enqueue(&db, case_id, JobType::ExtractDocument, 5).await;
        assert_eq!(claim(&db).await.unwrap().id, first);
        assert_eq!(claim(&db).await.unwrap().id, second);

        assert!(db.write(move |tx| requeue(tx, first)).await.unwrap());
        assert!(!db.write(move |tx| requeue(tx, first)).await.unwrap());

        let requeued = db.read(move |c| get(c, first)).await.unwrap().unwrap();
        assert_eq!(requeued.status, JobStatus::Queued);
        assert_eq!(requeued.attempts, 0);
        let untouched = db.read(move |c| get(c, second)).await.unwrap().unwrap();
        assert_eq!(untouched.status, JobStatus::Running);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_claims_on_separate_handles_never_share_a_job() {
        let (db, dir, case_id) = setup_db().await;
        for _ in 0..20 {
            enqueue(&db, case_id, JobType::AckIntake, 5).await;
        }
        let other = Database::open(dir.path().join("jobs.db").to_str().unwrap())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for handle_db in [db.clone(), other.clone(), db.clone(), other.clone()] {
            handles.push(tokio::spawn(async move {
                let mut claimed = Vec::new();
                while let Some(job) = handle_db.write(|tx| claim_next_due(tx)).await.unwrap() {
                    claimed.push(job.id);
                }
                claimed
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort();
        let before = all.len();
        all.dedup();
        assert_eq!(before, 20);
        assert_eq!(all.len(), 20);

        other.close().await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn listing_and_counts() {
        let (db, _dir, case_id) = setup_db().await;
        let a = enqueue(&db, case_id, JobType::AckIntake, 1).await;
        enqueue(&db, case_id, JobType::ExtractDocument, 1).await;
        claim(&db).await.unwrap();
        let policy = RetryPolicy::default();
        db.write(move |tx| fail(tx, a, "boom", true, &policy))
            .await
            .unwrap();

        assert!(db.read(move |c| has_active(c, case_id)).await.unwrap());
        assert!(
            db.read(move |c| exists_for_case(c, case_id, JobType::AckIntake))
                .await
                .unwrap()
        );
        assert!(
            !db.read(move |c| exists_for_case(c, case_id, JobType::ExecuteCleanup))
                .await
                .unwrap()
        );

        let dead = db
            .read(|c| list_by_status(c, Some(JobStatus::Dead), 10))
            .await
            .unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].id, a);

        let all = db.read(move |c| list_for_case(c, case_id)).await.unwrap();
        assert_eq!(all.len(), 2);

        let counts = db.read(counts_by_status).await.unwrap();
        assert!(counts.contains(&(JobStatus::Dead, 1)));
        assert!(counts.contains(&(JobStatus::Queued, 1)));
        db.close().await.unwrap();
    }
}
