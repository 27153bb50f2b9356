// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Child-process execution and overall run orchestration.

use crate::{
    config::HarnessConfig,
    dispatcher::DispatcherContext,
    errors::HarnessError,
    events::StreamSource,
    lines::read_lines,
    registry::RunStats,
    reporter::Reporter,
};
use camino::Utf8Path;
use std::process::Stdio;
use tokio::{process::Command, sync::mpsc::unbounded_channel};
use tracing::debug;

/// Overall outcome of a run, in banner and exit-code priority order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunVerdict {
    /// At least one test failed.
    TestsFailed,
    /// No test failed, but the runner itself exited non-zero (build error,
    /// vet failure, and so on).
    RunnerError,
    /// The runner succeeded but matched no tests at all. Reported as a
    /// failure so an accidental zero-test match isn't mistaken for success.
    NoTestsRun,
    /// Tests ran and all of them passed or were skipped.
    Success,
}

impl RunVerdict {
    pub(crate) fn derive(stats: RunStats, runner_ok: bool) -> Self {
        if stats.failed > 0 {
            RunVerdict::TestsFailed
        } else if !runner_ok {
            RunVerdict::RunnerError
        } else if stats.total() == 0 {
            RunVerdict::NoTestsRun
        } else {
            RunVerdict::Success
        }
    }

    /// The process exit code this verdict maps to.
    pub fn exit_code(self) -> i32 {
        match self {
            RunVerdict::Success => 0,
            RunVerdict::TestsFailed | RunVerdict::RunnerError | RunVerdict::NoTestsRun => 1,
        }
    }
}

/// Executes the test runner and aggregates its event stream.
///
/// Owns its tokio runtime, so callers stay synchronous.
#[derive(Clone, Debug)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    /// Creates a harness with the given configuration.
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    /// Runs `program` with `args`, renders the report through `reporter`,
    /// and returns the overall verdict. Blocks until the runner exits and
    /// both of its streams are drained.
    pub fn execute(
        &self,
        program: &Utf8Path,
        args: &[String],
        reporter: &mut Reporter,
    ) -> Result<RunVerdict, HarnessError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("retell-runner-worker")
            .build()
            .map_err(HarnessError::RuntimeCreate)?;
        runtime.block_on(self.execute_impl(program, args, reporter))
    }

    async fn execute_impl(
        &self,
        program: &Utf8Path,
        args: &[String],
        reporter: &mut Reporter,
    ) -> Result<RunVerdict, HarnessError> {
        debug!("running `{program} {}`", args.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                command: format!("{program} {}", args.join(" ")),
                source,
            })?;

        let stdout = child.stdout.take().expect("child stdout was piped");
        let stderr = child.stderr.take().expect("child stderr was piped");

        let (out_tx, out_rx) = unbounded_channel();
        let (err_tx, err_rx) = unbounded_channel();
        tokio::spawn(read_lines(StreamSource::Stdout, stdout, out_tx));
        tokio::spawn(read_lines(StreamSource::Stderr, stderr, err_tx));

        let stats = DispatcherContext::new(&self.config, reporter)
            .run(out_rx, err_rx)
            .await?;

        let status = child.wait().await.map_err(HarnessError::Wait)?;
        debug!(?status, ?stats, "runner exited");

        reporter.summary(stats)?;
        let verdict = RunVerdict::derive(stats, status.success());
        match verdict {
            RunVerdict::Success => {}
            RunVerdict::TestsFailed => reporter.failure_banner()?,
            RunVerdict::RunnerError => {
                reporter.runner_error(status)?;
                reporter.failure_banner()?;
            }
            RunVerdict::NoTestsRun => reporter.no_tests_warning()?,
        }
        reporter.finish()?;
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(failed: usize, passed: usize, skipped: usize) -> RunStats {
        RunStats {
            failed,
            passed,
            skipped,
        }
    }

    #[test]
    fn verdict_priority_order() {
        // Failed tests dominate everything, including a runner error.
        assert_eq!(
            RunVerdict::derive(stats(1, 2, 0), false),
            RunVerdict::TestsFailed
        );
        // A runner error is surfaced even when every test passed.
        assert_eq!(
            RunVerdict::derive(stats(0, 3, 0), false),
            RunVerdict::RunnerError
        );
        // Zero tests is a failure in its own right.
        assert_eq!(
            RunVerdict::derive(stats(0, 0, 0), true),
            RunVerdict::NoTestsRun
        );
        // Skips alone still count as "tests ran".
        assert_eq!(
            RunVerdict::derive(stats(0, 0, 2), true),
            RunVerdict::Success
        );
    }

    #[test]
    fn exit_codes() {
        assert_eq!(RunVerdict::Success.exit_code(), 0);
        assert_eq!(RunVerdict::TestsFailed.exit_code(), 1);
        assert_eq!(RunVerdict::RunnerError.exit_code(), 1);
        assert_eq!(RunVerdict::NoTestsRun.exit_code(), 1);
    }
}
