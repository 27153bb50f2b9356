// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hung-test detection.
//!
//! One watchdog task runs per live test, armed when the test is first seen.
//! The dispatch loop cancels it by dropping the oneshot sender when the test
//! reaches a terminal state; until then the watchdog reports the test once
//! per interval. Reports flow back to the dispatch loop over a channel, so
//! rendering stays single-writer and a report that races with the test's
//! completion can be dropped there.
//!
//! Watchdogs still outstanding at the end of the run are cancelled when the
//! registry is dropped.

use crate::registry::TestKey;
use std::time::Duration;
use tokio::{
    sync::{mpsc::UnboundedSender, oneshot},
    task::JoinHandle,
    time::{Instant, interval_at},
};

/// A periodic report for a test that has produced no terminal event yet.
#[derive(Clone, Debug)]
pub(crate) struct HungReport {
    /// The test that appears hung.
    pub(crate) key: TestKey,
    /// How long the test has been running.
    pub(crate) running_for: Duration,
}

/// Spawns the watchdog task for one test.
///
/// `started` is the test's creation time; the first report fires one full
/// `interval` after it.
pub(crate) fn spawn_watchdog(
    key: TestKey,
    started: Instant,
    interval: Duration,
    mut cancel: oneshot::Receiver<()>,
    reports: UnboundedSender<HungReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = interval_at(started + interval, interval);
        loop {
            tokio::select! {
                _ = &mut cancel => break,
                _ = tick.tick() => {
                    let report = HungReport {
                        key: key.clone(),
                        running_for: started.elapsed(),
                    };
                    if reports.send(report).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test(start_paused = true)]
    async fn reports_periodically_until_cancelled() {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (report_tx, mut report_rx) = unbounded_channel();
        let handle = spawn_watchdog(
            TestKey::new("p", "TestHung"),
            Instant::now(),
            Duration::from_secs(10),
            cancel_rx,
            report_tx,
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        let first = report_rx.recv().await.unwrap();
        assert_eq!(first.running_for, Duration::from_secs(10));
        let second = report_rx.recv().await.unwrap();
        assert_eq!(second.running_for, Duration::from_secs(20));

        drop(cancel_tx);
        handle.await.unwrap();
        // Cancellation stops the reports for good.
        assert!(report_rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_interval_reports_nothing() {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (report_tx, mut report_rx) = unbounded_channel();
        let handle = spawn_watchdog(
            TestKey::new("p", "TestFast"),
            Instant::now(),
            Duration::from_secs(10),
            cancel_rx,
            report_tx,
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(cancel_tx);
        handle.await.unwrap();
        assert!(report_rx.recv().await.is_none());
    }
}
