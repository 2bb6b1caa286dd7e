//! Core type definitions for a verification run

use serde::{Deserialize, Serialize};

/// Summary extracted from a decoded data-fetch response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSummary {
    /// Envelope `success` flag
    pub success: bool,
    /// Inner report definition carries a `styles` field
    pub has_styles: bool,
    /// Number of entries in the inner `rows` mapping
    pub row_count: usize,
    /// Length of the named result list (or all lists when unnamed)
    pub list_length: usize,
}

/// One request/response pair matched against an endpoint pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    /// Set once the matching response arrives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u32>,
    /// Absent when the body could not be read or decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_summary: Option<ResponseSummary>,
}

impl Exchange {
    pub fn new(url: impl Into<String>, method: impl Into<String>, request_body: Option<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            request_body,
            status: None,
            decoded_summary: None,
        }
    }

    /// Whether a response has been joined to this request
    pub fn is_resolved(&self) -> bool {
        self.status.is_some()
    }
}

/// Console entry severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    #[default]
    Other,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    /// Maps browser console/log levels onto the four severities.
    /// Unknown levels (`debug`, `table`, `trace`, ...) land in `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" | "assert" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "info" | "log" => Ok(Self::Info),
            "" => Err("Empty severity".to_string()),
            _ => Ok(Self::Other),
        }
    }
}

/// One console or failed-request notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub severity: Severity,
    pub text: String,
}

impl ConsoleEntry {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Snapshot of the rendered report page
///
/// Built once from a single page evaluation and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub has_container: bool,
    /// Truncated for display
    pub container_text: String,
    /// Truncated for display
    pub body_text: String,
    /// Untruncated length of the page text
    pub body_text_length: usize,
    pub cell_count: usize,
    /// Strategy that produced `cell_texts`, if any matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_strategy: Option<String>,
    pub cell_texts: Vec<String>,
    pub has_pagination: bool,
    pub has_date_like: bool,
    pub has_category_keyword: bool,
    pub has_header_keyword: bool,
    /// Value of the page's base configuration assignment, when found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_field: Option<String>,
}

impl PageState {
    /// Whether any non-empty cell text was captured
    pub fn has_cell_text(&self) -> bool {
        self.cell_texts.iter().any(|t| !t.trim().is_empty())
    }
}

/// Why a verdict came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    DataVisible,
    DataNotVisible,
    BaselineOkNoErrors,
    ErrorsPresent,
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataVisible => write!(f, "data_visible"),
            Self::DataNotVisible => write!(f, "data_not_visible"),
            Self::BaselineOkNoErrors => write!(f, "baseline_ok_no_errors"),
            Self::ErrorsPresent => write!(f, "errors_present"),
        }
    }
}

/// Terminal outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub reason: VerdictReason,
}

impl Verdict {
    pub fn pass(reason: VerdictReason) -> Self {
        Self { passed: true, reason }
    }

    pub fn fail(reason: VerdictReason) -> Self {
        Self { passed: false, reason }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "{} ({})", outcome, self.reason)
    }
}
