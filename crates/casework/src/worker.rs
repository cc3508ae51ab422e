// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `casework worker` and `casework recover`.

use std::sync::Arc;

use casework_config::CaseworkConfig;
use casework_core::{CaseworkError, PluginAdapter};
use casework_worker::{
    BootRecovery, HandlerContext, HandlerRegistry, RecoveryReport, WorkerLoop,
    install_signal_handler,
};
use tracing::info;

use crate::dry_run::{DryRunChat, DryRunExtractor, DryRunLlm};
use crate::open_workflow;

/// Recover, then poll until a shutdown signal arrives.
pub async fn run_worker(config: &CaseworkConfig) -> Result<(), CaseworkError> {
    info!(service = %config.service.name, "starting casework worker");
    let workflow = open_workflow(config).await?;

    let report = BootRecovery::new(workflow.clone()).run().await?;
    print_report(&report);

    let chat = Arc::new(DryRunChat::new());
    let llm = Arc::new(DryRunLlm);
    let extractor = Arc::new(DryRunExtractor);
    for adapter in [
        chat.as_ref() as &dyn PluginAdapter,
        llm.as_ref(),
        extractor.as_ref(),
    ] {
        let health = adapter.health_check().await?;
        info!(
            adapter = adapter.name(),
            kind = %adapter.adapter_type(),
            version = %adapter.version(),
            health = ?health,
            "adapter ready"
        );
    }

    let ctx = HandlerContext::new(
        chat.clone(),
        llm.clone(),
        extractor.clone(),
        config.rooms.clone(),
        workflow.clone(),
    );
    let worker = WorkerLoop::new(
        workflow.clone(),
        HandlerRegistry::new(),
        ctx,
        config.worker.poll_interval(),
    );

    let cancel = install_signal_handler();
    worker.run(cancel).await;

    chat.shutdown().await?;
    llm.shutdown().await?;
    extractor.shutdown().await?;
    workflow.database().clone().close().await?;
    info!("casework worker stopped");
    Ok(())
}

pub async fn run_recover(config: &CaseworkConfig) -> Result<(), CaseworkError> {
    let workflow = open_workflow(config).await?;
    let report = BootRecovery::new(workflow.clone()).run().await?;
    print_report(&report);
    workflow.database().clone().close().await
}

fn print_report(report: &RecoveryReport) {
    println!(
        "recovery: {} orphaned job(s) reset, {} case(s) scanned, {} resumed, {} failed",
        report.orphaned_reset,
        report.scanned_cases,
        report.resumed.len(),
        report.failed_cases.len()
    );
    for resumed in &report.resumed {
        println!(
            "  case {} -> {} (job {})",
            resumed.case_id, resumed.job_type, resumed.job_id
        );
    }
}
