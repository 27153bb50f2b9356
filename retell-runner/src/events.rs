// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoded `go test -json` events.
//!
//! Each line the runner writes on stdout or stderr is either a JSON record
//! in the `test2json` wire format or free-form text (compiler errors, build
//! output, vet diagnostics). Decoding is pure and stateless: a line either
//! becomes a [`TestEvent`], is classified as passthrough text, or is a
//! runner-level summary that carries no per-test information and is dropped.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::fmt;

/// Which child stream a line arrived on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamSource {
    /// The runner's standard output.
    Stdout,
    /// The runner's standard error.
    Stderr,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::Stdout => f.write_str("stdout"),
            StreamSource::Stderr => f.write_str("stderr"),
        }
    }
}

/// The `Action` field of a `test2json` record.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The test has started running.
    Run,
    /// The test has been paused.
    Pause,
    /// The test has continued running.
    Cont,
    /// The test passed.
    Pass,
    /// A benchmark printed log output but did not fail.
    Bench,
    /// The test or benchmark failed.
    Fail,
    /// The test printed output.
    Output,
    /// The test was skipped, or the package contained no tests.
    Skip,
    /// Newer Go versions add actions (e.g. `start`) that carry nothing the
    /// aggregator needs.
    #[serde(other)]
    Other,
}

/// One decoded record from the runner's JSON stream.
///
/// Immutable once decoded. The field names match the `test2json` wire
/// format; all fields other than `Action` may be absent.
#[derive(Clone, Debug, Deserialize)]
pub struct TestEvent {
    /// The time at which the event was generated.
    #[serde(rename = "Time", default)]
    pub timestamp: Option<DateTime<FixedOffset>>,

    /// What happened.
    #[serde(rename = "Action")]
    pub action: Action,

    /// The import path of the package under test.
    #[serde(rename = "Package", default)]
    pub package: String,

    /// The test name. Empty for package-level records.
    #[serde(rename = "Test", default)]
    pub test: String,

    /// One line of output, for `output` events.
    #[serde(rename = "Output", default)]
    pub output: String,

    /// Elapsed seconds, present on terminal events.
    #[serde(rename = "Elapsed", default)]
    pub elapsed: Option<f64>,
}

/// The classification of one raw line from the runner.
#[derive(Clone, Debug)]
pub enum ParsedLine {
    /// A structured event naming a test.
    Event(TestEvent),
    /// A structured record with an empty test name: a package summary or
    /// similar runner-level line. Dropped.
    RunnerSummary,
    /// Not a structured record at all; forwarded verbatim.
    Passthrough(String),
}

impl ParsedLine {
    /// Decodes one newline-terminated line from the runner.
    pub fn decode(line: &str) -> Self {
        match serde_json::from_str::<TestEvent>(line) {
            Ok(event) if event.test.is_empty() => ParsedLine::RunnerSummary,
            Ok(event) => ParsedLine::Event(event),
            Err(_) => ParsedLine::Passthrough(line.to_owned()),
        }
    }
}
