// SPDX-FileCopyrightText: 2026 Casework Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules for cases, the audit log, tracked messages, and jobs.

pub mod cases;
pub mod events;
pub mod jobs;
pub mod messages;
