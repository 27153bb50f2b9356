// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by retell.

use crate::events::StreamSource;
use std::io;
use thiserror::Error;

/// An error that occurred while writing to the report output.
#[derive(Debug, Error)]
#[error("error writing to report output")]
pub struct WriteEventError {
    #[from]
    source: io::Error,
}

/// An error that occurred while executing the runner and aggregating its
/// output.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The tokio runtime failed to start.
    #[error("failed to create tokio runtime")]
    RuntimeCreate(#[source] io::Error),

    /// The runner command could not be spawned.
    #[error("failed to spawn runner command `{command}`")]
    Spawn {
        /// The command that was attempted.
        command: String,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Reading one of the runner's output streams failed.
    ///
    /// This is fatal to the run: no summary is produced.
    #[error("error reading runner {stream} stream")]
    StreamRead {
        /// The stream the error occurred on.
        stream: StreamSource,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Waiting for the runner to exit failed.
    #[error("error waiting for runner to exit")]
    Wait(#[source] io::Error),

    /// Writing report output failed.
    #[error(transparent)]
    WriteEvent(#[from] WriteEventError),
}
