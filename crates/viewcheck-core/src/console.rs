//! Console and failed-request log

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ConsoleEntry, Severity};

/// Per-severity entry counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
    pub other: usize,
}

/// Append-only log of console output, in arrival order
#[derive(Debug, Clone, Default)]
pub struct ConsoleRecorder {
    entries: Vec<ConsoleEntry>,
}

impl ConsoleRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        if severity == Severity::Error {
            debug!("console error: {}", text);
        }
        self.entries.push(ConsoleEntry::new(severity, text));
    }

    /// Record a network request that never completed
    pub fn record_failed_request(&mut self, url: &str, error_text: &str) {
        let reason = if error_text.is_empty() { "unknown" } else { error_text };
        self.record(
            Severity::Error,
            format!("Request failed: {} - {}", url, reason),
        );
    }

    pub fn entries(&self) -> &[ConsoleEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ConsoleEntry> {
        self.entries
    }

    pub fn counts(&self) -> ConsoleCounts {
        counts(&self.entries)
    }
}

/// Count entries by severity
pub fn counts(entries: &[ConsoleEntry]) -> ConsoleCounts {
    entries.iter().fold(ConsoleCounts::default(), |mut acc, e| {
        match e.severity {
            Severity::Error => acc.error += 1,
            Severity::Warning => acc.warning += 1,
            Severity::Info => acc.info += 1,
            Severity::Other => acc.other += 1,
        }
        acc
    })
}

/// Texts of error entries, first `limit` only
pub fn error_texts(entries: &[ConsoleEntry], limit: usize) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.severity == Severity::Error)
        .take(limit)
        .map(|e| e.text.clone())
        .collect()
}

/// Error entries whose text matches a transient-failure signature
pub fn critical<'a>(entries: &'a [ConsoleEntry], signatures: &[String]) -> Vec<&'a ConsoleEntry> {
    entries
        .iter()
        .filter(|e| e.severity == Severity::Error)
        .filter(|e| {
            signatures
                .iter()
                .any(|sig| !sig.is_empty() && e.text.contains(sig.as_str()))
        })
        .collect()
}
