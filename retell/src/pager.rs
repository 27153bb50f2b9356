// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Paging of long reports.
//!
//! When stdout is a terminal and paging is enabled, the report is buffered
//! to a temp file while the transient status line stays live on the
//! terminal. At the end of the run a short report is printed directly and a
//! long one is handed to a pager, so failures don't scroll off screen.

use crate::errors::ExpectedError;
use camino_tempfile::NamedUtf8TempFile;
use std::{
    fs::File,
    io::{self, Write},
    process::Command,
};
use tracing::warn;

/// Reports at least this many lines long go through the pager.
const PAGE_THRESHOLD_LINES: u64 = 30;

const DEFAULT_PAGER: &str = "less";
const DEFAULT_PAGER_ARGS: &[&str] = &["-SRn"];

/// Where report output lands during the run.
pub(crate) enum ReportTarget {
    /// Straight to stdout; nothing to do at the end.
    Terminal,
    /// Buffered to a temp file, printed or paged at the end of the run.
    Paged { file: NamedUtf8TempFile },
}

impl ReportTarget {
    /// Creates the target and the sink the reporter should write to.
    pub(crate) fn new(paginate: bool) -> Result<(Self, Box<dyn Write + Send>), ExpectedError> {
        if !paginate {
            return Ok((ReportTarget::Terminal, Box::new(io::stdout())));
        }
        let file = NamedUtf8TempFile::new()
            .map_err(|source| ExpectedError::ReportBuffer { source })?;
        let writer: File = file
            .reopen()
            .map_err(|source| ExpectedError::ReportBuffer { source })?;
        Ok((ReportTarget::Paged { file }, Box::new(writer)))
    }

    /// Delivers the buffered report, paging it if it is long. A pager that
    /// fails to start degrades to direct printing.
    pub(crate) fn finalize(self, lines_written: u64) -> Result<(), ExpectedError> {
        let ReportTarget::Paged { file } = self else {
            return Ok(());
        };

        if lines_written >= PAGE_THRESHOLD_LINES {
            let pager = std::env::var("RETELL_PAGER").unwrap_or_else(|_| DEFAULT_PAGER.to_owned());
            let mut command = Command::new(&pager);
            if pager == DEFAULT_PAGER {
                command.args(DEFAULT_PAGER_ARGS);
            }
            match command.arg(file.path()).status() {
                Ok(_) => return Ok(()),
                Err(err) => {
                    warn!("failed to run pager `{pager}`: {err}");
                }
            }
        }

        let mut reader = file
            .reopen()
            .map_err(|source| ExpectedError::ReportBuffer { source })?;
        let mut stdout = io::stdout();
        io::copy(&mut reader, &mut stdout)
            .map_err(|source| ExpectedError::ReportBuffer { source })?;
        Ok(())
    }
}
