// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core logic for retell, a readable real-time harness for `go test`.
//!
//! This crate launches a `go test -json` child process, ingests its stdout
//! and stderr streams concurrently, decodes line-delimited test events, and
//! incrementally renders a readable report: per-test pass/fail/skip lines,
//! captured output on failure, slow-test and hung-test warnings, and a final
//! summary with an overall verdict.
//!
//! For a CLI interface, see the `retell` crate.

mod config;
mod dispatcher;
pub mod errors;
pub mod events;
mod lines;
pub mod registry;
pub mod reporter;
mod runner;
mod watchdog;

pub use config::HarnessConfig;
pub use runner::{Harness, RunVerdict};
