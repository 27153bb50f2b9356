// Copyright (c) The retell Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test state for a single run.
//!
//! The registry is only ever mutated by the dispatch loop, which makes it
//! single-writer by construction. Tests are created lazily on first
//! reference and never removed while the run is in progress.

use std::{collections::BTreeMap, fmt};
use tokio::{sync::oneshot, time::Instant};
use tracing::warn;

/// Identity of a test: package plus test name, unique across a run.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct TestKey {
    /// The import path of the package under test.
    pub package: String,
    /// The test name, including any subtest path.
    pub name: String,
}

impl TestKey {
    /// Creates a new key from a package and test name.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.package, self.name)
    }
}

/// Terminal outcome of a test.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestOutcome {
    /// The test passed.
    Passed,
    /// The test or benchmark failed.
    Failed,
    /// The test was skipped.
    Skipped,
}

/// State tracked for one test.
#[derive(Debug)]
pub struct TestCase {
    scrollback: Vec<String>,
    outcome: Option<TestOutcome>,
    started: Instant,
    // Dropped when the test reaches a terminal state, which wakes the
    // watchdog's cancellation branch.
    cancel_watchdog: Option<oneshot::Sender<()>>,
}

impl TestCase {
    /// Captured output lines, in arrival order.
    pub fn scrollback(&self) -> &[String] {
        &self.scrollback
    }

    /// The terminal outcome, if the test has reached one.
    pub fn outcome(&self) -> Option<TestOutcome> {
        self.outcome
    }

    /// True once the test has passed, failed, or been skipped.
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// When the test was first seen.
    pub fn started(&self) -> Instant {
        self.started
    }
}

/// Counters for terminal test states.
///
/// Each field is incremented exactly once, synchronously with the matching
/// terminal transition in [`TestRegistry::mark`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// The number of tests that passed.
    pub passed: usize,
    /// The number of tests that failed.
    pub failed: usize,
    /// The number of tests that were skipped.
    pub skipped: usize,
}

impl RunStats {
    /// The total number of tests that reached a terminal state.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// The result of [`TestRegistry::ensure`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Ensured {
    /// The test was created; the caller is expected to arm a watchdog.
    Created {
        /// When the test was created, for use as the watchdog's origin.
        started: Instant,
    },
    /// The test already existed.
    Existing,
}

/// Keyed store of per-test state, plus the aggregate counters.
#[derive(Debug, Default)]
pub struct TestRegistry {
    tests: BTreeMap<TestKey, TestCase>,
    stats: RunStats,
}

impl TestRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current aggregate counters.
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Looks up a test by key.
    pub fn get(&self, key: &TestKey) -> Option<&TestCase> {
        self.tests.get(key)
    }

    /// Get-or-create: returns whether the test had to be created. Safe to
    /// call repeatedly for the same key.
    pub(crate) fn ensure(&mut self, key: &TestKey) -> Ensured {
        if self.tests.contains_key(key) {
            return Ensured::Existing;
        }
        let started = Instant::now();
        self.tests.insert(
            key.clone(),
            TestCase {
                scrollback: Vec::new(),
                outcome: None,
                started,
                cancel_watchdog: None,
            },
        );
        Ensured::Created { started }
    }

    /// Stores the cancellation handle for a freshly created test's watchdog.
    pub(crate) fn arm_watchdog(&mut self, key: &TestKey, cancel: oneshot::Sender<()>) {
        if let Some(test) = self.tests.get_mut(key) {
            test.cancel_watchdog = Some(cancel);
        }
    }

    /// Appends one output line to a test's scrollback.
    ///
    /// The test is expected to already exist (via [`ensure`]); a miss is
    /// recovered as a no-op.
    ///
    /// [`ensure`]: Self::ensure
    pub(crate) fn append_output(&mut self, key: &TestKey, text: &str) {
        match self.tests.get_mut(key) {
            Some(test) => test.scrollback.push(text.to_owned()),
            None => warn!(test = %key, "output for unknown test dropped"),
        }
    }

    /// Marks a test terminal and bumps the matching counter.
    ///
    /// A second terminal transition for the same test should not occur given
    /// the runner's event grammar; it is recovered as a no-op so the
    /// counters stay consistent.
    pub(crate) fn mark(&mut self, key: &TestKey, outcome: TestOutcome) {
        let Some(test) = self.tests.get_mut(key) else {
            warn!(test = %key, ?outcome, "terminal event for unknown test dropped");
            return;
        };
        if test.outcome.is_some() {
            warn!(test = %key, ?outcome, "test is already terminal, ignoring second transition");
            return;
        }
        test.outcome = Some(outcome);
        // Cancel the watchdog.
        test.cancel_watchdog = None;
        match outcome {
            TestOutcome::Passed => self.stats.passed += 1,
            TestOutcome::Failed => self.stats.failed += 1,
            TestOutcome::Skipped => self.stats.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TestKey {
        TestKey::new("example.com/demo", "TestOne")
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut registry = TestRegistry::new();
        assert!(matches!(registry.ensure(&key()), Ensured::Created { .. }));
        assert_eq!(registry.ensure(&key()), Ensured::Existing);
        assert_eq!(registry.ensure(&key()), Ensured::Existing);
    }

    #[test]
    fn scrollback_preserves_arrival_order() {
        let mut registry = TestRegistry::new();
        registry.ensure(&key());
        registry.append_output(&key(), "line1\n");
        registry.append_output(&key(), "line2\n");
        let test = registry.get(&key()).unwrap();
        assert_eq!(test.scrollback(), ["line1\n", "line2\n"]);
    }

    #[test]
    fn output_for_unknown_test_is_a_noop() {
        let mut registry = TestRegistry::new();
        registry.append_output(&key(), "orphan\n");
        assert!(registry.get(&key()).is_none());
    }

    #[test]
    fn mark_transitions_at_most_once() {
        let mut registry = TestRegistry::new();
        registry.ensure(&key());
        registry.mark(&key(), TestOutcome::Passed);
        // A second transition must not corrupt the counters or the outcome.
        registry.mark(&key(), TestOutcome::Failed);
        assert_eq!(
            registry.get(&key()).unwrap().outcome(),
            Some(TestOutcome::Passed)
        );
        assert_eq!(
            registry.stats(),
            RunStats {
                passed: 1,
                failed: 0,
                skipped: 0
            }
        );
    }

    #[test]
    fn mark_for_unknown_test_is_a_noop() {
        let mut registry = TestRegistry::new();
        registry.mark(&key(), TestOutcome::Failed);
        assert_eq!(registry.stats(), RunStats::default());
    }
}
