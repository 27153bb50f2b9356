// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration values consumed by the harness core.

use std::time::Duration;

/// A test that takes at least this long (scaled by the time factor) is
/// called out as slow once it finishes.
pub(crate) const SLOW_THRESHOLD_SECS: f64 = 1.0;

/// A test that produces no terminal event for this long (scaled by the time
/// factor) is reported as hung, once per elapsed interval.
pub(crate) const HUNG_THRESHOLD_SECS: f64 = 10.0;

/// Configuration for a harness run.
///
/// These are plain values; mapping them from command-line flags is the CLI's
/// business.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Multiplier applied to both the slow and hung thresholds.
    ///
    /// Must be finite and greater than zero; the CLI validates this at parse
    /// time.
    pub time_factor: f64,

    /// True when the user asked for specific tests (e.g. via `-run`).
    ///
    /// In selection mode even skipped and passing tests render their
    /// captured output: if the user named a test, its output is worth
    /// explaining.
    pub selection: bool,

    /// Suppress captured output entirely, even for failures.
    pub short: bool,

    /// Strip the log-site prefixes Go's `t.Log` family adds to output lines.
    pub slim: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            time_factor: 1.0,
            selection: false,
            short: false,
            slim: true,
        }
    }
}

impl HarnessConfig {
    /// Elapsed seconds at or above which a finished test counts as slow.
    ///
    /// The boundary is inclusive: a test that took exactly the threshold is
    /// slow.
    pub(crate) fn slow_threshold(&self) -> f64 {
        SLOW_THRESHOLD_SECS * self.time_factor
    }

    /// Interval between hung-test reports for a test that hasn't reached a
    /// terminal state.
    pub(crate) fn hung_interval(&self) -> Duration {
        Duration::from_secs_f64(HUNG_THRESHOLD_SECS * self.time_factor)
    }
}
