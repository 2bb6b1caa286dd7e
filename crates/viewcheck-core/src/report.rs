//! Diagnostic report for one run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use uuid::Uuid;

use crate::console::{self, ConsoleCounts};
use crate::types::{ConsoleEntry, Exchange, PageState, Verdict, VerdictReason};
use crate::verdict::Decision;

/// Everything a run observed, plus the verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    pub run_id: Uuid,
    pub target_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub exchanges: Vec<Exchange>,
    /// First N console error texts
    pub console_errors: Vec<String>,
    pub console_counts: ConsoleCounts,
    pub page_state: PageState,
    pub decision: Decision,
}

impl ProbeReport {
    pub fn new(
        target_url: impl Into<String>,
        started_at: DateTime<Utc>,
        exchanges: Vec<Exchange>,
        console_entries: &[ConsoleEntry],
        max_errors: usize,
        page_state: PageState,
        decision: Decision,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target_url: target_url.into(),
            started_at,
            finished_at: Utc::now(),
            exchanges,
            console_errors: console::error_texts(console_entries, max_errors),
            console_counts: console::counts(console_entries),
            page_state,
            decision,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.decision.verdict
    }

    pub fn passed(&self) -> bool {
        self.decision.verdict.passed
    }

    /// Labelled plain-text sections for stdout
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Target: {}", self.target_url);
        let _ = writeln!(out, "Run: {} ({} ms)", self.run_id, self.elapsed_ms());

        let _ = writeln!(out, "\n=== exchanges ===");
        if self.exchanges.is_empty() {
            let _ = writeln!(out, "(none captured)");
        }
        for (i, e) in self.exchanges.iter().enumerate() {
            let status = e
                .status
                .map_or_else(|| "pending".to_string(), |s| s.to_string());
            let _ = writeln!(out, "{}. {} {} -> {}", i + 1, e.method, e.url, status);
            if let Some(body) = &e.request_body {
                let _ = writeln!(out, "   request: {}", body);
            }
            match &e.decoded_summary {
                Some(s) => {
                    let _ = writeln!(
                        out,
                        "   success: {}, styles: {}, rows: {}, list: {}",
                        s.success, s.has_styles, s.row_count, s.list_length
                    );
                }
                None => {
                    let _ = writeln!(out, "   (body not decoded)");
                }
            }
        }

        let _ = writeln!(
            out,
            "\n=== console errors ({} errors, {} warnings) ===",
            self.console_counts.error, self.console_counts.warning
        );
        if self.console_errors.is_empty() {
            let _ = writeln!(out, "none");
        }
        for (i, text) in self.console_errors.iter().enumerate() {
            let _ = writeln!(out, "{} {}", i + 1, text);
        }

        let _ = writeln!(out, "\n=== page state ===");
        let state = serde_json::to_string_pretty(&self.page_state)
            .unwrap_or_else(|e| format!("<unserializable page state: {}>", e));
        let _ = writeln!(out, "{}", state);

        if !self.decision.critical.is_empty() {
            let _ = writeln!(out, "\n=== critical errors ===");
            for text in &self.decision.critical {
                let _ = writeln!(out, "- {}", text);
            }
        }

        let headline = match self.decision.verdict.reason {
            VerdictReason::DataVisible => "Data visible",
            VerdictReason::BaselineOkNoErrors => {
                "Report page loaded, configuration OK, no critical errors"
            }
            VerdictReason::DataNotVisible => "Data not visible",
            VerdictReason::ErrorsPresent => "Report may not be loading correctly",
        };
        let _ = writeln!(
            out,
            "\n*** {}: {} [{}, rule {}] ***",
            if self.passed() { "SUCCESS" } else { "FAIL" },
            headline,
            self.decision.verdict.reason,
            self.decision.rule
        );
        out
    }

    fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
