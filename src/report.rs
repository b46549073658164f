//! Run outcome accounting.
//!
//! Node transforms run on a thread pool, so their outcomes are collected in a
//! [`Tally`] (atomic counters plus a locked diagnostic list) and frozen into a
//! [`RunReport`] when the run ends. Class and index pages are tracked apart
//! from the node counters: they are one-per-class / one-per-run events and
//! are reported on their own lines.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// One item that could not be produced, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub path: PathBuf,
    pub reason: String,
}

impl Failure {
    pub fn new(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Final outcome of one run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    /// Node pages written.
    pub succeeded: usize,
    /// Node pages that failed. Always equal to `failures.len()`.
    pub failed: usize,
    pub failures: Vec<Failure>,
    /// Class and index pages that failed. Not part of the node counts.
    pub page_failures: Vec<Failure>,
    pub class_pages: usize,
    pub index_written: bool,
    pub images_copied: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} node docs successfully transformed, {} failed",
            self.succeeded, self.failed
        )
    }
}

/// Thread-safe accumulator for node outcomes.
#[derive(Debug, Default)]
pub struct Tally {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    failures: Mutex<Vec<Failure>>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure(&self, failure: Failure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Freeze the counters into a report. Diagnostics are sorted by path so
    /// output does not depend on worker scheduling.
    pub fn into_report(self) -> RunReport {
        let mut failures = self
            .failures
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        RunReport {
            succeeded: self.succeeded.into_inner(),
            failed: self.failed.into_inner(),
            failures,
            ..RunReport::default()
        }
    }
}
