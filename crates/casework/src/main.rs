// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Casework - durable job queue and case workflow engine for referral triage.
//!
//! This is the binary entry point. The chat and LLM integrations are not part
//! of this crate; `worker` runs with dry-run collaborators and the event
//! subcommands stand in for the inbound side of the chat protocol.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod dry_run;
mod events;
mod inspect;
mod worker;

use std::path::PathBuf;

use casework_config::CaseworkConfig;
use casework_core::{CaseId, CaseworkError, Decision, JobStatus, MessageRole, SupportFlag};
use casework_storage::Database;
use casework_workflow::Workflow;
use clap::{Parser, Subcommand};
use tracing::error;

/// Casework - durable job queue and case workflow engine.
#[derive(Parser, Debug)]
#[command(name = "casework", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the XDG lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run boot recovery, then process jobs until SIGINT/SIGTERM.
    Worker,
    /// Run boot recovery only.
    Recover,
    /// Record a document posted to the intake room.
    Intake {
        /// Protocol event id of the intake message.
        #[arg(long)]
        origin_id: String,
        /// Media URL of the document (`file://` paths work with the dry-run worker).
        #[arg(long)]
        document: String,
        #[arg(long, default_value = "@operator:localhost")]
        sender: String,
        /// Intake room; defaults to `rooms.intake_room_id`.
        #[arg(long)]
        room: Option<String>,
    },
    /// Record a doctor's decision.
    Decide {
        case_id: CaseId,
        #[arg(long, required_unless_present = "text")]
        decision: Option<Decision>,
        #[arg(long, default_value = "none")]
        support_flag: SupportFlag,
        #[arg(long)]
        reason: Option<String>,
        /// A raw decision room reply, parsed with the reply template.
        #[arg(long, conflicts_with_all = ["decision", "reason"])]
        text: Option<String>,
        #[arg(long, default_value = "@doctor:localhost")]
        by: String,
    },
    /// Record a scheduling room reply.
    Reply {
        case_id: CaseId,
        /// The reply text, newline separated.
        #[arg(long)]
        text: String,
    },
    /// Record a reaction on a tracked message.
    React {
        case_id: CaseId,
        #[arg(long, default_value = "final_reply")]
        role: MessageRole,
        /// Reaction key as sent by the chat client.
        #[arg(long, default_value = "\u{1F44D}")]
        key: String,
        #[arg(long, default_value = "@operator:localhost")]
        by: String,
    },
    /// List jobs, most recent first.
    Jobs {
        #[arg(long)]
        status: Option<JobStatus>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show a case with its jobs, messages, and audit log.
    Case {
        case_id: CaseId,
        #[arg(long)]
        json: bool,
    },
    /// List recent cases.
    Cases {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => casework_config::load_and_validate_path(path),
        None => casework_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            casework_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.service.log_level);

    if let Err(e) = run(cli.command, config).await {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: CaseworkConfig) -> Result<(), CaseworkError> {
    match command {
        Commands::Worker => worker::run_worker(&config).await,
        Commands::Recover => worker::run_recover(&config).await,
        command => {
            let workflow = open_workflow(&config).await?;
            let result = dispatch(command, &config, &workflow).await;
            workflow.database().clone().close().await?;
            result
        }
    }
}

async fn dispatch(
    command: Commands,
    config: &CaseworkConfig,
    workflow: &Workflow,
) -> Result<(), CaseworkError> {
    match command {
        Commands::Intake {
            origin_id,
            document,
            sender,
            room,
        } => {
            let room = room.unwrap_or_else(|| config.rooms.intake_room_id.clone());
            events::intake(workflow, origin_id, room, sender, document).await
        }
        Commands::Decide {
            case_id,
            decision,
            support_flag,
            reason,
            text,
            by,
        } => match (text, decision) {
            (Some(text), _) => events::decide_from_reply(workflow, case_id, &text, &by).await,
            (None, Some(decision)) => {
                events::decide(workflow, case_id, decision, support_flag, reason, by).await
            }
            (None, None) => Err(CaseworkError::Validation(
                "either --decision or --text is required".to_string(),
            )),
        },
        Commands::Reply { case_id, text } => events::reply(workflow, case_id, &text).await,
        Commands::React {
            case_id,
            role,
            key,
            by,
        } => events::react(workflow, case_id, role, &key, by).await,
        Commands::Jobs {
            status,
            limit,
            json,
        } => inspect::jobs(workflow, status, limit, json).await,
        Commands::Case { case_id, json } => inspect::case(workflow, case_id, json).await,
        Commands::Cases { limit } => inspect::cases(workflow, limit).await,
        Commands::Worker | Commands::Recover => Ok(()),
    }
}

/// Open the store and wrap it in the workflow engine.
async fn open_workflow(config: &CaseworkConfig) -> Result<Workflow, CaseworkError> {
    let db = Database::open_with_config(&config.storage).await?;
    Ok(Workflow::new(db, config.queue.retry_policy()))
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("casework={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn decide_parses_typed_arguments() {
        let id = CaseId::new();
        let cli = Cli::try_parse_from([
            "casework",
            "decide",
            &id.to_string(),
            "--decision",
            "accept",
            "--support-flag",
            "anesthesist_icu",
        ])
        .unwrap();
        match cli.command {
            Commands::Decide {
                case_id,
                decision,
                support_flag,
                ..
            } => {
                assert_eq!(case_id, id);
                assert_eq!(decision, Some(Decision::Accept));
                assert_eq!(support_flag, SupportFlag::AnesthesistIcu);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn decide_needs_a_decision_or_a_reply() {
        let id = CaseId::new().to_string();
        assert!(Cli::try_parse_from(["casework", "decide", &id]).is_err());
        assert!(
            Cli::try_parse_from(["casework", "decide", &id, "--text", "decision: accept"]).is_ok()
        );
    }

    #[test]
    fn jobs_status_filter_uses_stored_names() {
        let cli = Cli::try_parse_from(["casework", "jobs", "--status", "dead"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Jobs {
                status: Some(JobStatus::Dead),
                limit: 20,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["casework", "jobs", "--status", "stuck"]).is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = casework_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.service.name, "casework");
    }
}
