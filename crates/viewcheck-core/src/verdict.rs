//! Verdict rules
//!
//! Evidence is first reduced to a fixed set of [`Signals`], then run through
//! [`RULES`] in order. The first rule that returns a verdict decides the run.
//! DOM visibility is the primary evidence; console and network output only
//! corroborate it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::VerdictConfig;
use crate::console;
use crate::types::{ConsoleEntry, Exchange, PageState, Verdict, VerdictReason};

/// Boolean view of everything the rules look at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub has_container: bool,
    pub has_pagination: bool,
    /// At least one non-empty cell text
    pub has_cell_text: bool,
    pub has_cells: bool,
    /// Cell count above the configured minimum
    pub many_cells: bool,
    pub has_keyword: bool,
    /// Page configuration field is populated
    pub config_populated: bool,
    /// A data-fetch response decoded with rows
    pub data_populated: bool,
    pub critical_errors: usize,
}

/// One entry of the rule table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub evaluate: fn(&Signals) -> Option<Verdict>,
}

/// Rules in precedence order
pub const RULES: [Rule; 4] = [
    Rule {
        name: "nothing-rendered",
        evaluate: nothing_rendered,
    },
    Rule {
        name: "clean-render",
        evaluate: clean_render,
    },
    Rule {
        name: "render-despite-noise",
        evaluate: render_despite_noise,
    },
    Rule {
        name: "errors-present",
        evaluate: errors_present,
    },
];

fn nothing_rendered(s: &Signals) -> Option<Verdict> {
    (!s.has_container && !s.has_pagination && !s.has_cell_text)
        .then(|| Verdict::fail(VerdictReason::DataNotVisible))
}

fn clean_render(s: &Signals) -> Option<Verdict> {
    if !s.has_container || s.critical_errors > 0 {
        return None;
    }
    if s.has_pagination || s.has_cell_text || s.has_cells {
        Some(Verdict::pass(VerdictReason::DataVisible))
    } else if s.config_populated || s.data_populated {
        Some(Verdict::pass(VerdictReason::BaselineOkNoErrors))
    } else {
        None
    }
}

fn render_despite_noise(s: &Signals) -> Option<Verdict> {
    (s.has_container && (s.has_pagination || s.has_keyword || s.many_cells))
        .then(|| Verdict::pass(VerdictReason::DataVisible))
}

fn errors_present(_: &Signals) -> Option<Verdict> {
    Some(Verdict::fail(VerdictReason::ErrorsPresent))
}

/// Outcome plus the rule that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub rule: String,
    pub signals: Signals,
    /// Critical console texts that fed the decision
    pub critical: Vec<String>,
}

/// Combines page, traffic and console evidence into a verdict
#[derive(Debug, Clone, Default)]
pub struct VerdictEngine {
    config: VerdictConfig,
}

impl VerdictEngine {
    pub fn new(config: VerdictConfig) -> Self {
        Self { config }
    }

    /// Reduce the evidence to signals
    pub fn signals(
        &self,
        state: &PageState,
        exchanges: &[Exchange],
        console_entries: &[ConsoleEntry],
    ) -> Signals {
        let config_populated = state.config_field.as_deref().is_some_and(|v| {
            v.chars().count() >= self.config.min_config_field_len && !v.contains("undefined")
        });
        let data_populated = exchanges.iter().any(|e| {
            e.decoded_summary
                .as_ref()
                .is_some_and(|s| s.success && s.row_count > 0)
        });

        Signals {
            has_container: state.has_container,
            has_pagination: state.has_pagination,
            has_cell_text: state.has_cell_text(),
            has_cells: state.cell_count > 0,
            many_cells: state.cell_count > self.config.min_cell_count,
            has_keyword: state.has_category_keyword || state.has_header_keyword,
            config_populated,
            data_populated,
            critical_errors: console::critical(console_entries, &self.config.critical_signatures)
                .len(),
        }
    }

    /// Run the rule table and report which rule fired
    pub fn evaluate(
        &self,
        state: &PageState,
        exchanges: &[Exchange],
        console_entries: &[ConsoleEntry],
    ) -> Decision {
        let signals = self.signals(state, exchanges, console_entries);
        debug!("Verdict signals: {:?}", signals);

        let (rule, verdict) = RULES
            .iter()
            .find_map(|rule| (rule.evaluate)(&signals).map(|v| (rule.name, v)))
            .unwrap_or(("errors-present", Verdict::fail(VerdictReason::ErrorsPresent)));

        info!("Verdict {} via rule {}", verdict, rule);

        Decision {
            verdict,
            rule: rule.to_string(),
            signals,
            critical: console::critical(console_entries, &self.config.critical_signatures)
                .into_iter()
                .take(self.config.max_reported_errors)
                .map(|e| e.text.clone())
                .collect(),
        }
    }

    pub fn decide(
        &self,
        state: &PageState,
        exchanges: &[Exchange],
        console_entries: &[ConsoleEntry],
    ) -> Verdict {
        self.evaluate(state, exchanges, console_entries).verdict
    }
}
