// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch loop.
//!
//! This is the single writer for the whole run: it is the only code path
//! that creates, mutates, or marks tests, appends to the event log, and
//! renders output. Lines from the two splitter tasks and reports from the
//! watchdogs are merged here with `tokio::select!`; within one stream,
//! channel order preserves source order, while cross-stream ordering is
//! whatever arrival order the select produces.

use crate::{
    config::HarnessConfig,
    errors::{HarnessError, WriteEventError},
    events::{Action, ParsedLine, StreamSource, TestEvent},
    registry::{Ensured, RunStats, TestKey, TestOutcome, TestRegistry},
    reporter::Reporter,
    watchdog::{HungReport, spawn_watchdog},
};
use std::io;
use tokio::sync::{
    mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    oneshot,
};
use tracing::debug;

pub(crate) struct DispatcherContext<'a> {
    config: HarnessConfig,
    registry: TestRegistry,
    reporter: &'a mut Reporter,
}

impl<'a> DispatcherContext<'a> {
    pub(crate) fn new(config: &HarnessConfig, reporter: &'a mut Reporter) -> Self {
        Self {
            config: config.clone(),
            registry: TestRegistry::new(),
            reporter,
        }
    }

    /// Runs the dispatch loop until both line channels close, then performs
    /// the final flush and returns the aggregate counters.
    ///
    /// Watchdog reports that arrive after the streams end are discarded
    /// along with the registry.
    pub(crate) async fn run(
        mut self,
        mut stdout_rx: UnboundedReceiver<io::Result<String>>,
        mut stderr_rx: UnboundedReceiver<io::Result<String>>,
    ) -> Result<RunStats, HarnessError> {
        // The loop holds a sender too, so the hung branch never sees a
        // closed channel.
        let (hung_tx, mut hung_rx) = unbounded_channel();

        let mut stdout_done = false;
        let mut stderr_done = false;

        while !(stdout_done && stderr_done) {
            tokio::select! {
                line = stdout_rx.recv(), if !stdout_done => {
                    match line {
                        Some(line) => self.handle_line(StreamSource::Stdout, line, &hung_tx)?,
                        None => stdout_done = true,
                    }
                }
                line = stderr_rx.recv(), if !stderr_done => {
                    match line {
                        Some(line) => self.handle_line(StreamSource::Stderr, line, &hung_tx)?,
                        None => stderr_done = true,
                    }
                }
                report = hung_rx.recv() => {
                    if let Some(report) = report {
                        self.handle_hung(report)?;
                    }
                }
            }
        }

        self.reporter.flush(&self.registry)?;
        Ok(self.registry.stats())
    }

    fn handle_line(
        &mut self,
        stream: StreamSource,
        line: io::Result<String>,
        hung_tx: &UnboundedSender<HungReport>,
    ) -> Result<(), HarnessError> {
        let line = line.map_err(|source| HarnessError::StreamRead { stream, source })?;
        match ParsedLine::decode(&line) {
            ParsedLine::Passthrough(text) => self.reporter.passthrough(&text)?,
            ParsedLine::RunnerSummary => {}
            ParsedLine::Event(event) => self.handle_event(event, hung_tx)?,
        }
        Ok(())
    }

    fn handle_event(
        &mut self,
        event: TestEvent,
        hung_tx: &UnboundedSender<HungReport>,
    ) -> Result<(), WriteEventError> {
        let key = TestKey::new(event.package.as_str(), event.test.as_str());
        self.ensure(&key, hung_tx);

        let action = event.action;
        match action {
            Action::Output => {
                self.registry.append_output(&key, &event.output);
                let text = event.output.clone();
                self.reporter.record(event);
                // Output events only accumulate; they surface via a later
                // flush, so just tickle the status line.
                self.reporter.status_output(&text)?;
                return Ok(());
            }
            Action::Skip => self.registry.mark(&key, TestOutcome::Skipped),
            Action::Pass => self.registry.mark(&key, TestOutcome::Passed),
            Action::Fail => self.registry.mark(&key, TestOutcome::Failed),
            Action::Run | Action::Bench | Action::Pause | Action::Cont | Action::Other => {}
        }

        self.reporter.record(event);
        if matches!(
            action,
            Action::Skip | Action::Pass | Action::Fail | Action::Bench
        ) {
            self.reporter.flush(&self.registry)?;
        }
        Ok(())
    }

    fn ensure(&mut self, key: &TestKey, hung_tx: &UnboundedSender<HungReport>) {
        if let Ensured::Created { started } = self.registry.ensure(key) {
            debug!(test = %key, "new test discovered");
            let (cancel_tx, cancel_rx) = oneshot::channel();
            self.registry.arm_watchdog(key, cancel_tx);
            spawn_watchdog(
                key.clone(),
                started,
                self.config.hung_interval(),
                cancel_rx,
                hung_tx.clone(),
            );
        }
    }

    fn handle_hung(&mut self, report: HungReport) -> Result<(), WriteEventError> {
        // A report can race with the terminal event that cancelled its
        // watchdog; drop it rather than warn about a finished test.
        if self
            .registry
            .get(&report.key)
            .is_some_and(|test| !test.is_terminal())
        {
            self.reporter.hung_warning(&report.key, report.running_for)?;
        }
        Ok(())
    }
}
