// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::{error::Error, io};
use thiserror::Error;

/// Exit codes produced by retell.
///
/// Test outcomes map to 0 or 1; errors in retell's own setup use a distinct
/// code so scripts can tell "tests failed" from "the harness never ran".
pub struct RetellExitCode;

impl RetellExitCode {
    /// At least one test failed, the runner errored, or no tests matched.
    pub const TEST_RUN_FAILED: i32 = 1;
    /// retell could not start the run at all.
    pub const SETUP_ERROR: i32 = 2;
}

/// An error that prevented the run from producing a report.
#[derive(Debug, Error)]
pub enum ExpectedError {
    #[error("no `go` binary found on PATH")]
    GoBinaryNotFound,
    #[error("failed to create log file `{path}`")]
    LogFileCreate {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to set up report buffering")]
    ReportBuffer {
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Harness(#[from] retell_runner::errors::HarnessError),
}

impl ExpectedError {
    /// The exit code for this error.
    pub fn process_exit_code(&self) -> i32 {
        RetellExitCode::SETUP_ERROR
    }

    /// Displays this error and its cause chain to stderr.
    pub fn display_to_stderr(&self) {
        let colorize = supports_color::on_cached(supports_color::Stream::Stderr).is_some();
        let mut error_style = owo_colors::Style::new();
        if colorize {
            error_style = error_style.red().bold();
        }

        eprintln!("{} {self}", "error:".style(error_style));
        let mut source = self.source();
        while let Some(err) = source {
            eprintln!("  caused by: {err}");
            source = err.source();
        }
    }
}
