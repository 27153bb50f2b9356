// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report renderer.

use crate::{
    config::HarnessConfig,
    errors::WriteEventError,
    events::{Action, TestEvent},
    registry::{RunStats, TestKey, TestRegistry},
    reporter::StatusLine,
};
use owo_colors::{OwoColorize, Style};
use regex::Regex;
use std::{
    fmt,
    io::{self, Write},
    sync::LazyLock,
    time::Duration,
};

/// Matches the log-site prefix Go's `t.Log` family adds to output lines,
/// e.g. `    TestOne: demo_test.go:42: `.
static LOG_SITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s+Test[^:]+: [^.]+\.(go|s):\d+: ").expect("log-site regex is valid")
});

#[derive(Debug, Default)]
struct Styles {
    pass: Style,
    fail: Style,
    skip: Style,
    bench: Style,
    warn: Style,
    package: Style,
    banner: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.pass = Style::new().green();
        self.fail = Style::new().red();
        self.skip = Style::new().yellow();
        self.bench = Style::new().yellow();
        self.warn = Style::new().blue();
        self.package = Style::new().bold();
        self.banner = Style::new().red();
    }
}

/// Renders the event stream as a readable report.
///
/// Owns the append-only event log and the flush cursor. [`record`] appends
/// one decoded event in dispatch arrival order; [`flush`] renders every
/// event that arrived since the previous flush, exactly once. Output goes to
/// the report sink, duplicated to an optional transcript sink, with an
/// optional transient status line cleared ahead of every report line.
///
/// [`record`]: Self::record
/// [`flush`]: Self::flush
pub struct Reporter {
    config: HarnessConfig,
    styles: Styles,
    events: Vec<TestEvent>,
    flushed: usize,
    report: Box<dyn Write + Send>,
    transcript: Option<Box<dyn Write + Send>>,
    status: Option<StatusLine>,
    lines_written: u64,
}

impl Reporter {
    /// Creates a reporter writing to `report`, optionally duplicating every
    /// line to `transcript`.
    pub fn new(
        config: HarnessConfig,
        report: Box<dyn Write + Send>,
        transcript: Option<Box<dyn Write + Send>>,
    ) -> Self {
        Self {
            config,
            styles: Styles::default(),
            events: Vec::new(),
            flushed: 0,
            report,
            transcript,
            status: None,
            lines_written: 0,
        }
    }

    /// Enables colored output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Attaches a transient status line, cleared before every report line.
    pub fn set_status_line(&mut self, status: StatusLine) {
        self.status = Some(status);
    }

    /// The number of report lines written so far.
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Appends one decoded event to the log. Called once per event, in
    /// dispatch arrival order.
    pub fn record(&mut self, event: TestEvent) {
        self.events.push(event);
    }

    /// Renders every unflushed event and advances the cursor past it.
    ///
    /// Idempotent: flushing with no new events renders nothing.
    pub fn flush(&mut self, registry: &TestRegistry) -> Result<(), WriteEventError> {
        while self.flushed < self.events.len() {
            let event = self.events[self.flushed].clone();
            self.render_event(&event, registry)?;
            self.flushed += 1;
        }
        Ok(())
    }

    /// Forwards one non-protocol line from the runner verbatim.
    pub fn passthrough(&mut self, line: &str) -> Result<(), WriteEventError> {
        self.write_text(line)?;
        Ok(())
    }

    /// Feeds one `output` event's text to the status line.
    pub fn status_output(&mut self, text: &str) -> Result<(), WriteEventError> {
        if let Some(status) = &mut self.status {
            status.update(text)?;
        }
        Ok(())
    }

    /// Renders a hung warning for a test that has produced no terminal event.
    pub fn hung_warning(
        &mut self,
        key: &TestKey,
        running_for: Duration,
    ) -> Result<(), WriteEventError> {
        let line = format!(
            "{} {}, ran for {:.1}s\n",
            "hung".style(self.styles.warn),
            key.name,
            running_for.as_secs_f64(),
        );
        self.write_text(&line)?;
        Ok(())
    }

    /// Renders the one-line summary.
    pub fn summary(&mut self, stats: RunStats) -> Result<(), WriteEventError> {
        let line = format!(
            "{} failed, {} passed, {} skipped, {} total\n",
            stats.failed,
            stats.passed,
            stats.skipped,
            stats.total(),
        );
        self.write_text(&line)?;
        Ok(())
    }

    /// Renders the failure banner.
    pub fn failure_banner(&mut self) -> Result<(), WriteEventError> {
        let line = format!("{}\n", "TEST FAILED".style(self.styles.banner));
        self.write_text(&line)?;
        Ok(())
    }

    /// Renders the warning for a runner that exited non-zero without any
    /// failed test.
    pub fn runner_error(&mut self, status: impl fmt::Display) -> Result<(), WriteEventError> {
        let text = format!("go test {status}");
        let line = format!("{}\n", text.style(self.styles.banner));
        self.write_text(&line)?;
        Ok(())
    }

    /// Renders the warning for a run that matched no tests at all.
    pub fn no_tests_warning(&mut self) -> Result<(), WriteEventError> {
        let line = format!("{}\n", "no tests found".style(self.styles.skip));
        self.write_text(&line)?;
        Ok(())
    }

    /// Clears the status line and flushes the underlying sinks.
    pub fn finish(&mut self) -> Result<(), WriteEventError> {
        if let Some(status) = &mut self.status {
            status.clear()?;
        }
        self.report.flush().map_err(WriteEventError::from)?;
        if let Some(transcript) = &mut self.transcript {
            transcript.flush().map_err(WriteEventError::from)?;
        }
        Ok(())
    }

    fn render_event(
        &mut self,
        event: &TestEvent,
        registry: &TestRegistry,
    ) -> Result<(), WriteEventError> {
        match event.action {
            // `run` silently establishes presence; `output` only feeds
            // scrollback; pause/cont and unknown actions render nothing.
            Action::Run | Action::Output | Action::Pause | Action::Cont | Action::Other => {}
            Action::Skip => {
                if self.config.selection {
                    self.scrollback(event, registry)?;
                }
                self.status_line_for(event, "skip", self.styles.skip, false)?;
            }
            Action::Bench => {
                self.status_line_for(event, "bnch", self.styles.bench, true)?;
                self.scrollback(event, registry)?;
            }
            Action::Pass => {
                self.status_line_for(event, "pass", self.styles.pass, false)?;
                if self.config.selection {
                    self.scrollback(event, registry)?;
                }
                self.slow_warning(event)?;
            }
            Action::Fail => {
                self.status_line_for(event, "fail", self.styles.fail, false)?;
                self.scrollback(event, registry)?;
                self.slow_warning(event)?;
            }
        }
        Ok(())
    }

    fn status_line_for(
        &mut self,
        event: &TestEvent,
        label: &str,
        style: Style,
        timing: bool,
    ) -> Result<(), WriteEventError> {
        let line = if timing {
            format!(
                "{} {:.2}s {}\n",
                label.style(style),
                event.elapsed.unwrap_or(0.0),
                event.test,
            )
        } else {
            format!("{} {}\n", label.style(style), event.test)
        };
        self.write_text(&line)?;
        Ok(())
    }

    fn slow_warning(&mut self, event: &TestEvent) -> Result<(), WriteEventError> {
        let Some(elapsed) = event.elapsed else {
            return Ok(());
        };
        if elapsed >= self.config.slow_threshold() {
            let line = format!(
                "{} {} took {elapsed:.2}s\n",
                "slow".style(self.styles.warn),
                event.test,
            );
            self.write_text(&line)?;
        }
        Ok(())
    }

    fn scrollback(
        &mut self,
        event: &TestEvent,
        registry: &TestRegistry,
    ) -> Result<(), WriteEventError> {
        if self.config.short {
            return Ok(());
        }
        let key = TestKey::new(event.package.as_str(), event.test.as_str());
        let lines: Vec<String> = registry
            .get(&key)
            .map(|test| test.scrollback().to_vec())
            .unwrap_or_default();
        if self.config.slim {
            self.write_text(&format!(
                "in package {}\n",
                event.package.style(self.styles.package)
            ))?;
            self.write_text("here follows test output:\n")?;
            for line in &lines {
                let stripped = match LOG_SITE_RE.find(line) {
                    Some(m) => &line[m.end()..],
                    None => line.as_str(),
                };
                self.write_text(stripped)?;
            }
        } else {
            self.write_text(&format!(
                "  in package {}\n",
                event.package.style(self.styles.package)
            ))?;
            self.write_text("  here follows test output:\n")?;
            for line in &lines {
                self.write_text(&format!("    {line}"))?;
            }
        }
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        if let Some(status) = &mut self.status {
            status.clear()?;
        }
        self.report.write_all(text.as_bytes())?;
        if let Some(transcript) = &mut self.transcript {
            transcript.write_all(text.as_bytes())?;
        }
        self.lines_written += text.bytes().filter(|&b| b == b'\n').count() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{registry::TestOutcome, reporter::test_helpers::TestSink};
    use indoc::indoc;

    fn event(action: Action, test: &str, output: &str, elapsed: Option<f64>) -> TestEvent {
        TestEvent {
            timestamp: None,
            action,
            package: "example.com/demo".to_owned(),
            test: test.to_owned(),
            output: output.to_owned(),
            elapsed,
        }
    }

    fn reporter(config: HarnessConfig) -> (Reporter, TestSink) {
        let sink = TestSink::default();
        (Reporter::new(config, Box::new(sink.clone()), None), sink)
    }

    #[test]
    fn flush_is_idempotent() {
        let (mut reporter, sink) = reporter(HarnessConfig::default());
        let registry = TestRegistry::new();
        reporter.record(event(Action::Pass, "TestOne", "", Some(0.1)));
        reporter.flush(&registry).unwrap();
        let after_first = sink.contents();
        assert_eq!(after_first, "pass TestOne\n");
        reporter.flush(&registry).unwrap();
        assert_eq!(sink.contents(), after_first);
    }

    #[test]
    fn fail_renders_scrollback_and_slim_strips_log_sites() {
        let (mut reporter, sink) = reporter(HarnessConfig::default());
        let mut registry = TestRegistry::new();
        let key = TestKey::new("example.com/demo", "TestBoom");
        registry.ensure(&key);
        registry.append_output(&key, "=== RUN   TestBoom\n");
        registry.append_output(&key, "    TestBoom: demo_test.go:12: boom\n");
        registry.mark(&key, TestOutcome::Failed);

        reporter.record(event(Action::Fail, "TestBoom", "", Some(0.05)));
        reporter.flush(&registry).unwrap();
        assert_eq!(
            sink.contents(),
            indoc! {"
                fail TestBoom
                in package example.com/demo
                here follows test output:
                === RUN   TestBoom
                boom
            "}
        );
    }

    #[test]
    fn no_slim_indents_scrollback_verbatim() {
        let config = HarnessConfig {
            slim: false,
            ..HarnessConfig::default()
        };
        let (mut reporter, sink) = reporter(config);
        let mut registry = TestRegistry::new();
        let key = TestKey::new("example.com/demo", "TestBoom");
        registry.ensure(&key);
        registry.append_output(&key, "    TestBoom: demo_test.go:12: boom\n");
        registry.mark(&key, TestOutcome::Failed);

        reporter.record(event(Action::Fail, "TestBoom", "", None));
        reporter.flush(&registry).unwrap();
        assert_eq!(
            sink.contents(),
            indoc! {"
                fail TestBoom
                  in package example.com/demo
                  here follows test output:
                        TestBoom: demo_test.go:12: boom
            "}
        );
    }

    #[test]
    fn short_mode_suppresses_scrollback() {
        let config = HarnessConfig {
            short: true,
            ..HarnessConfig::default()
        };
        let (mut reporter, sink) = reporter(config);
        let mut registry = TestRegistry::new();
        let key = TestKey::new("example.com/demo", "TestBoom");
        registry.ensure(&key);
        registry.append_output(&key, "boom\n");
        registry.mark(&key, TestOutcome::Failed);

        reporter.record(event(Action::Fail, "TestBoom", "", None));
        reporter.flush(&registry).unwrap();
        assert_eq!(sink.contents(), "fail TestBoom\n");
    }

    #[test]
    fn skip_renders_scrollback_only_in_selection_mode() {
        let mut registry = TestRegistry::new();
        let key = TestKey::new("example.com/demo", "TestSkipped");
        registry.ensure(&key);
        registry.append_output(&key, "skipping: no database\n");
        registry.mark(&key, TestOutcome::Skipped);

        let (mut reporter, sink) = reporter(HarnessConfig::default());
        reporter.record(event(Action::Skip, "TestSkipped", "", None));
        reporter.flush(&registry).unwrap();
        assert_eq!(sink.contents(), "skip TestSkipped\n");

        let config = HarnessConfig {
            selection: true,
            ..HarnessConfig::default()
        };
        let (mut reporter, sink) = self::reporter(config);
        reporter.record(event(Action::Skip, "TestSkipped", "", None));
        reporter.flush(&registry).unwrap();
        assert_eq!(
            sink.contents(),
            indoc! {"
                in package example.com/demo
                here follows test output:
                skipping: no database
                skip TestSkipped
            "}
        );
    }

    #[test]
    fn slow_threshold_boundary_is_inclusive() {
        let registry = TestRegistry::new();
        let (mut reporter, sink) = reporter(HarnessConfig::default());
        reporter.record(event(Action::Pass, "TestAtThreshold", "", Some(1.0)));
        reporter.record(event(Action::Pass, "TestJustUnder", "", Some(0.99)));
        reporter.flush(&registry).unwrap();
        assert_eq!(
            sink.contents(),
            indoc! {"
                pass TestAtThreshold
                slow TestAtThreshold took 1.00s
                pass TestJustUnder
            "}
        );
    }

    #[test]
    fn bench_shows_timing_and_scrollback() {
        let mut registry = TestRegistry::new();
        let key = TestKey::new("example.com/demo", "BenchmarkOne");
        registry.ensure(&key);
        registry.append_output(&key, "BenchmarkOne-8   1000000   1053 ns/op\n");

        let (mut reporter, sink) = reporter(HarnessConfig::default());
        reporter.record(event(Action::Bench, "BenchmarkOne", "", Some(2.5)));
        reporter.flush(&registry).unwrap();
        assert_eq!(
            sink.contents(),
            indoc! {"
                bnch 2.50s BenchmarkOne
                in package example.com/demo
                here follows test output:
                BenchmarkOne-8   1000000   1053 ns/op
            "}
        );
    }

    #[test]
    fn summary_and_banners() {
        let (mut reporter, sink) = reporter(HarnessConfig::default());
        reporter
            .summary(RunStats {
                passed: 2,
                failed: 1,
                skipped: 3,
            })
            .unwrap();
        reporter.failure_banner().unwrap();
        assert_eq!(
            sink.contents(),
            indoc! {"
                1 failed, 2 passed, 3 skipped, 6 total
                TEST FAILED
            "}
        );
    }

    #[test]
    fn transcript_receives_a_copy() {
        let transcript = TestSink::default();
        let sink = TestSink::default();
        let mut reporter = Reporter::new(
            HarnessConfig::default(),
            Box::new(sink.clone()),
            Some(Box::new(transcript.clone())),
        );
        reporter.passthrough("ok  \texample.com/demo\t0.01s\n").unwrap();
        reporter.no_tests_warning().unwrap();
        assert_eq!(sink.contents(), transcript.contents());
        assert_eq!(reporter.lines_written(), 2);
    }
}
