// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job execution for the Casework workflow engine.
//!
//! The [`WorkerLoop`] claims due jobs from the durable queue, dispatches them
//! through the [`HandlerRegistry`], and hands the classified result back to
//! the workflow. [`BootRecovery`] reconciles the store after a crash before
//! the loop starts polling.

pub mod context;
pub mod handler;
pub mod handlers;
pub mod record_number;
pub mod recovery;
pub mod registry;
pub mod runner;
pub mod shutdown;
pub mod templates;

pub use context::HandlerContext;
pub use handler::{HandlerError, JobHandler};
pub use handlers::RedactionRetry;
pub use recovery::{BootRecovery, RecoveryReport, ResumedCase};
pub use registry::HandlerRegistry;
pub use runner::{TickOutcome, WorkerLoop};
pub use shutdown::install_signal_handler;
