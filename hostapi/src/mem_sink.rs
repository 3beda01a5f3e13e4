//! In-memory log sink for testing.
//!
//! `MemSink` implements `LogSink` by appending every line to a vector, in
//! call order. Tests share it through an `Arc` and inspect what the guest
//! printed after the call returns.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::sink::LogSink;

/// Captures log lines in call order.
#[derive(Debug, Default)]
pub struct MemSink {
    lines: Mutex<Vec<String>>,
}

impl MemSink {
    /// Create a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every captured line.
    pub fn lines(&self) -> Vec<String> {
        self.guard().clone()
    }

    /// Remove and return every captured line.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.guard())
    }

    /// The most recent line, if any.
    pub fn last(&self) -> Option<String> {
        self.guard().last().cloned()
    }

    /// Returns the number of captured lines.
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// Returns true if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Drop every captured line.
    pub fn clear(&self) {
        self.guard().clear();
    }
}

impl LogSink for MemSink {
    fn write_line(&self, line: &str) {
        self.guard().push(line.to_owned());
    }
}
