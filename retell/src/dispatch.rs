// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::ExpectedError, helpers, output::OutputOpts, pager::ReportTarget};
use camino::Utf8PathBuf;
use clap::Parser;
use retell_runner::{
    Harness, HarnessConfig,
    reporter::{Reporter, StatusLine, WidthProvider},
};
use std::io::{IsTerminal, Write};

/// retell runs `go test` and formats the result in a more readable manner.
///
/// Arguments after retell's own flags are forwarded to `go test`; `-json`
/// and `-v` are always added internally. The `RETELL` environment variable
/// may hold additional `go test` arguments.
///
/// Without selection flags, retell prints failed tests and their output,
/// warnings about slow and seemingly stuck tests, and a minimal summary at
/// the end.
#[derive(Debug, Parser)]
#[command(name = "retell", version, styles = crate::output::clap_styles::style())]
pub struct RetellApp {
    #[command(flatten)]
    output: OutputOpts,

    /// Don't print any scrollback, even on failures
    #[arg(long, short = 's')]
    short: bool,

    /// Scale the slow (1s) and hung (10s) warning thresholds
    #[arg(
        long,
        short = 't',
        value_name = "FACTOR",
        default_value_t = 1.0,
        value_parser = parse_time_factor
    )]
    time_factor: f64,

    /// Keep Go's log-site prefixes and indent scrollback
    #[arg(long)]
    no_slim: bool,

    /// Never page the report through `less`
    #[arg(long)]
    no_page: bool,

    /// Also write the full report to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<Utf8PathBuf>,

    /// Arguments forwarded to `go test`
    #[arg(
        value_name = "GO_TEST_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

fn parse_time_factor(input: &str) -> Result<f64, String> {
    let factor: f64 = input.parse().map_err(|err| format!("{err}"))?;
    if factor.is_finite() && factor > 0.0 {
        Ok(factor)
    } else {
        Err("time factor must be greater than zero".to_owned())
    }
}

/// Terminal width for the status line, queried once and cached.
#[derive(Debug, Default)]
struct TerminalWidth {
    cached: Option<Option<u16>>,
}

impl WidthProvider for TerminalWidth {
    fn width(&mut self) -> Option<u16> {
        *self
            .cached
            .get_or_insert_with(|| crossterm::terminal::size().ok().map(|(cols, _)| cols))
    }
}

impl RetellApp {
    /// Executes the run and returns the process exit code.
    pub fn exec(self) -> Result<i32, ExpectedError> {
        let ctx = self.output.init();

        let go_binary = helpers::find_go_binary()?;
        let mut forwarded = self.args;
        if let Ok(extra) = std::env::var("RETELL") {
            forwarded.extend(extra.split_whitespace().map(str::to_owned));
        }

        let config = HarnessConfig {
            time_factor: self.time_factor,
            selection: helpers::is_selection(&forwarded),
            short: self.short,
            slim: !self.no_slim,
        };
        let args = helpers::go_test_args(&forwarded);

        let stdout_is_tty = std::io::stdout().is_terminal();
        let paginate = stdout_is_tty && !self.no_page;
        let (target, report_sink) = ReportTarget::new(paginate)?;

        let transcript: Option<Box<dyn Write + Send>> = match &self.log_file {
            Some(path) => {
                let file = std::fs::File::create(path).map_err(|source| {
                    ExpectedError::LogFileCreate {
                        path: path.clone(),
                        source,
                    }
                })?;
                Some(Box::new(file))
            }
            None => None,
        };

        let mut reporter = Reporter::new(config.clone(), report_sink, transcript);
        if ctx.color.should_colorize(supports_color::Stream::Stdout) {
            reporter.colorize();
        }
        if stdout_is_tty {
            reporter.set_status_line(StatusLine::new(
                Box::new(std::io::stdout()),
                Box::new(TerminalWidth::default()),
            ));
        }

        let verdict = Harness::new(config).execute(&go_binary, &args, &mut reporter)?;
        let lines_written = reporter.lines_written();
        // Close the report sink before the pager reads the buffer.
        drop(reporter);
        target.finalize(lines_written)?;

        Ok(verdict.exit_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_app() {
        RetellApp::command().debug_assert();
    }

    #[test]
    fn forwarded_args_capture_hyphen_values() {
        let app = RetellApp::parse_from(["retell", "-t", "0.1", "-run", "TestOne", "./..."]);
        assert_eq!(app.time_factor, 0.1);
        assert_eq!(app.args, ["-run", "TestOne", "./..."]);
    }

    #[test]
    fn time_factor_must_be_positive() {
        assert!(parse_time_factor("0").is_err());
        assert!(parse_time_factor("-1").is_err());
        assert!(parse_time_factor("inf").is_err());
        assert!(parse_time_factor("0.25").is_ok());
    }
}
