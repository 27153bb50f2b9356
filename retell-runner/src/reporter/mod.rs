// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental rendering of the event stream.
//!
//! The reporter owns the append-only event log and the flush cursor: events
//! are recorded in dispatch arrival order, and each flush renders exactly
//! the events that arrived since the previous one. It also owns the output
//! sinks (report, optional transcript, optional transient status line).

mod displayer;
mod status_line;

pub use displayer::Reporter;
pub use status_line::{StatusLine, WidthProvider};

#[cfg(test)]
pub(crate) mod test_helpers;
