// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

/// A shared in-memory sink, cloneable so tests can keep a handle while the
/// reporter owns the writer.
#[derive(Clone, Debug, Default)]
pub(crate) struct TestSink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestSink {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.buf.lock().unwrap().clone()).unwrap()
    }
}

impl Write for TestSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
