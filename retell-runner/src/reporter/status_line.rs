// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transient status line.
//!
//! While tests run, the most recent interesting output line is shown as an
//! overwritable line on the terminal, rewritten in place with a carriage
//! return. Updates are throttled and sanitized; the line is cleared before
//! any real report line is written to the terminal.

use std::{
    io::{self, Write},
    time::{Duration, Instant},
};

/// Minimum time between status line rewrites.
const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Output shorter than this (after sanitizing) isn't worth showing.
const MIN_CONTENT_LEN: usize = 8;

/// Provides the current output width in columns.
///
/// Injected rather than queried globally so that width-dependent rendering
/// is testable with a fixed width, and so the core carries no terminal
/// dependency.
pub trait WidthProvider: Send {
    /// The current width, or `None` when there is no terminal to measure.
    fn width(&mut self) -> Option<u16>;
}

impl<F> WidthProvider for F
where
    F: FnMut() -> Option<u16> + Send,
{
    fn width(&mut self) -> Option<u16> {
        self()
    }
}

/// A single overwritable terminal line showing the latest test output.
pub struct StatusLine {
    sink: Box<dyn Write + Send>,
    width: Box<dyn WidthProvider>,
    last_update: Option<Instant>,
    last_len: usize,
}

impl StatusLine {
    /// Creates a status line writing to `sink`, sized by `width`.
    pub fn new(sink: Box<dyn Write + Send>, width: Box<dyn WidthProvider>) -> Self {
        Self {
            sink,
            width,
            last_update: None,
            last_len: 0,
        }
    }

    /// Erases whatever the status line currently shows.
    pub(crate) fn clear(&mut self) -> io::Result<()> {
        if self.last_len == 0 {
            return Ok(());
        }
        write!(self.sink, "\r{:width$}\r", "", width = self.last_len)?;
        self.sink.flush()?;
        self.last_len = 0;
        Ok(())
    }

    /// Replaces the status line with the interesting part of `text`, if any.
    pub(crate) fn update(&mut self, text: &str) -> io::Result<()> {
        if self
            .last_update
            .is_some_and(|at| at.elapsed() <= UPDATE_INTERVAL)
        {
            return Ok(());
        }
        let Some(cols) = self.width.width() else {
            return Ok(());
        };
        let Some(mut content) = find_content(text) else {
            return Ok(());
        };
        // find_content only keeps single-byte characters, so this cannot
        // split a char.
        content.truncate(cols as usize);
        self.clear()?;
        self.sink.write_all(content.as_bytes())?;
        self.sink.flush()?;
        self.last_len = content.len();
        self.last_update = Some(Instant::now());
        Ok(())
    }
}

/// Extracts the last run of visible characters from `text`.
///
/// Scans line segments back to front, keeping printable ASCII and ESC (so
/// colored output survives), and returns the first segment with enough
/// visible content to be worth showing.
fn find_content(text: &str) -> Option<String> {
    for segment in text.rsplit(['\r', '\n']) {
        let visible: String = segment
            .chars()
            .filter(|&c| c == '\x1b' || matches!(c, ' '..='~'))
            .collect();
        if visible.len() > MIN_CONTENT_LEN {
            return Some(visible);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::test_helpers::TestSink;

    #[test]
    fn find_content_takes_last_meaningful_segment() {
        assert_eq!(
            find_content("first interesting line\nsecond one here\n"),
            Some("second one here".to_owned()),
        );
        // The trailing segment is too short; fall back to the one before it.
        assert_eq!(
            find_content("a longer line of output\nok\n"),
            Some("a longer line of output".to_owned()),
        );
        assert_eq!(find_content("short\n"), None);
        assert_eq!(find_content(""), None);
    }

    #[test]
    fn find_content_strips_unprintable_bytes() {
        assert_eq!(
            find_content("ringing\x07 the bell\n"),
            Some("ringing the bell".to_owned()),
        );
    }

    #[test]
    fn update_truncates_to_width_and_clear_erases() {
        let sink = TestSink::default();
        let mut status = StatusLine::new(
            Box::new(sink.clone()),
            Box::new(|| Some(10u16)) as Box<dyn WidthProvider>,
        );
        status.update("some very long status output\n").unwrap();
        assert_eq!(sink.contents(), "some very ");

        status.clear().unwrap();
        assert_eq!(sink.contents(), format!("some very \r{:10}\r", ""));
        // Clearing twice writes nothing further.
        status.clear().unwrap();
        assert_eq!(sink.contents(), format!("some very \r{:10}\r", ""));
    }

    #[test]
    fn updates_are_throttled() {
        let sink = TestSink::default();
        let mut status = StatusLine::new(
            Box::new(sink.clone()),
            Box::new(|| Some(80u16)) as Box<dyn WidthProvider>,
        );
        status.update("the first status line\n").unwrap();
        status.update("a second status line\n").unwrap();
        assert_eq!(sink.contents(), "the first status line");
    }

    #[test]
    fn no_width_disables_updates() {
        let sink = TestSink::default();
        let mut status = StatusLine::new(
            Box::new(sink.clone()),
            Box::new(|| None) as Box<dyn WidthProvider>,
        );
        status.update("plenty of output to show\n").unwrap();
        assert_eq!(sink.contents(), "");
    }
}
