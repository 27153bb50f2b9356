// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line splitting for the runner's output streams.
//!
//! One splitter task runs per child stream. Each task reads its stream to
//! end-of-input and delivers complete newline-terminated lines into its own
//! channel, so the dispatch loop can merge the two streams in whatever order
//! lines become available. Order within one stream is preserved by the
//! channel; no ordering is imposed across streams.

use crate::events::StreamSource;
use std::io;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc::UnboundedSender,
};
use tracing::debug;

/// Reads `reader` until end-of-input, sending each newline-terminated line
/// over `tx`. If the stream ends with pending unterminated bytes, they are
/// sent as a final line.
///
/// I/O errors other than end-of-input are delivered in-band; the dispatch
/// loop treats them as fatal to the whole run. The channel closes when this
/// returns.
pub(crate) async fn read_lines<R>(
    source: StreamSource,
    reader: R,
    tx: UnboundedSender<io::Result<String>>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(Ok(line)).is_err() {
                    // The dispatch loop went away; nothing left to do.
                    break;
                }
            }
            Err(err) => {
                debug!(%source, "read error on runner stream: {err}");
                let _ = tx.send(Err(err));
                break;
            }
        }
    }
}
