// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The retell command-line interface.
//!
//! retell wraps `go test`, always adding `-json -v`, and re-renders the
//! event stream as a readable report. The aggregation core lives in the
//! `retell-runner` crate; this crate supplies argument parsing, color and
//! logging setup, `go` binary lookup, and paging of long reports.

mod dispatch;
mod errors;
mod helpers;
mod output;
mod pager;

pub use dispatch::RetellApp;
pub use errors::ExpectedError;
