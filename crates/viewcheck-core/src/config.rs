//! Configuration management for viewcheck
//!
//! Every threshold the heuristics use lives here rather than as a magic number,
//! since the defaults were tuned against one reporting deployment and are
//! expected to drift.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{ProbeError, Result};

/// Relative location of the project config file
pub const CONFIG_FILE: &str = ".viewcheck/config.toml";

/// Top-level probe configuration
///
/// Loaded from `.viewcheck/config.toml` or an explicit `--config` path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Full target URL; overrides the base/path/id triple when set
    #[serde(default)]
    pub url: Option<String>,

    /// Reporting service origin
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path prefix of the report view page
    #[serde(default = "default_view_path")]
    pub view_path: String,

    /// Report identifier appended to the view path
    #[serde(default = "default_report_id")]
    pub report_id: String,

    /// URL substrings identifying the data-fetch endpoints to record
    #[serde(default = "default_endpoint_patterns")]
    pub endpoint_patterns: Vec<String>,

    /// Capacity of the capture event channel
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub verdict: VerdictConfig,

    #[serde(default)]
    pub screenshot: ScreenshotConfig,
}

/// Browser launch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Browser UI language, passed as `--lang`
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_true")]
    pub ignore_certificate_errors: bool,
    #[serde(default)]
    pub sandbox: bool,
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Waits and timeouts around navigation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Hard bound on load plus network quiescence
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// How long the network must stay idle to count as quiescent
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: u64,
    /// Fixed delay after quiescence before the snapshot
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// One ranked way of enumerating grid cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStrategy {
    pub name: String,
    /// CSS selector evaluated inside the container
    pub selector: String,
}

impl CellStrategy {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }
}

/// Page snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_container_selector")]
    pub container_selector: String,
    /// Cell strategies in rank order; earlier entries win ties
    #[serde(default = "default_cell_strategies")]
    pub cell_strategies: Vec<CellStrategy>,
    #[serde(default = "default_max_cell_texts")]
    pub max_cell_texts: usize,
    #[serde(default = "default_max_container_text")]
    pub max_container_text: usize,
    #[serde(default = "default_max_body_text")]
    pub max_body_text: usize,
    /// "N items total" marker
    #[serde(default = "default_pagination_pattern")]
    pub pagination_pattern: String,
    #[serde(default = "default_year_min")]
    pub year_min: u32,
    #[serde(default = "default_year_max")]
    pub year_max: u32,
    #[serde(default = "default_category_keywords")]
    pub category_keywords: Vec<String>,
    #[serde(default = "default_header_keywords")]
    pub header_keywords: Vec<String>,
    /// Regex with one capture group, run against the page HTML
    #[serde(default = "default_config_field_pattern")]
    pub config_field_pattern: String,
}

/// Response body decoding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Bodies at or above this many characters are not decoded
    #[serde(default = "default_max_body_len")]
    pub max_body_len: usize,
    /// `result.dataList.<name>.list` to measure; all lists when unset
    #[serde(default)]
    pub data_list_name: Option<String>,
}

/// Verdict thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Substrings marking an error entry as critical
    #[serde(default = "default_critical_signatures")]
    pub critical_signatures: Vec<String>,
    /// Cell count above which rendering counts as a weak positive signal
    #[serde(default = "default_min_cell_count")]
    pub min_cell_count: usize,
    #[serde(default = "default_max_reported_errors")]
    pub max_reported_errors: usize,
    /// Minimum length for a configuration field to count as populated
    #[serde(default = "default_min_config_field_len")]
    pub min_config_field_len: usize,
}

/// Optional full-page capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_screenshot_path")]
    pub path: PathBuf,
}

// Default value providers
fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "http://127.0.0.1:8085".to_string()
}

fn default_view_path() -> String {
    "/jmreport/view/".to_string()
}

fn default_report_id() -> String {
    "1350035590569136128".to_string()
}

fn default_endpoint_patterns() -> Vec<String> {
    vec!["/jmreport/show".to_string(), "/show?id=".to_string()]
}

fn default_event_log_capacity() -> usize {
    4096
}

fn default_window_width() -> u32 {
    1200
}

fn default_window_height() -> u32 {
    800
}

fn default_lang() -> String {
    "zh-CN".to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_quiet_window_ms() -> u64 {
    500
}

fn default_settle_delay_ms() -> u64 {
    8000
}

fn default_container_selector() -> String {
    "#jm-sheet-wrapper".to_string()
}

fn default_cell_strategies() -> Vec<CellStrategy> {
    vec![
        CellStrategy::new("grid-cell", ".cell"),
        CellStrategy::new("table-cell", "td, th"),
    ]
}

fn default_max_cell_texts() -> usize {
    30
}

fn default_max_container_text() -> usize {
    800
}

fn default_max_body_text() -> usize {
    500
}

fn default_pagination_pattern() -> String {
    r"共\s*\d+\s*条".to_string()
}

fn default_year_min() -> u32 {
    1990
}

fn default_year_max() -> u32 {
    2099
}

fn default_category_keywords() -> Vec<String> {
    ["品类", "总销售额"].iter().map(|k| k.to_string()).collect()
}

fn default_header_keywords() -> Vec<String> {
    ["日期", "员工", "姓名", "所在部门"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

fn default_config_field_pattern() -> String {
    r#"baseFull\s*=\s*['"]([^'"]*)['"]"#.to_string()
}

fn default_max_body_len() -> usize {
    5000
}

fn default_critical_signatures() -> Vec<String> {
    vec!["undefined".to_string(), "404".to_string()]
}

fn default_min_cell_count() -> usize {
    5
}

fn default_max_reported_errors() -> usize {
    15
}

fn default_min_config_field_len() -> usize {
    6
}

fn default_screenshot_path() -> PathBuf {
    PathBuf::from("/tmp/viewcheck.png")
}

impl ProbeConfig {
    /// Load configuration from `.viewcheck/config.toml` or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ProbeError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Write default configuration to `.viewcheck/config.toml`
    pub fn write_default(root: &Path) -> Result<PathBuf> {
        let config_path = root.join(CONFIG_FILE);
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| ProbeError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Apply environment overrides
    ///
    /// `lookup` is normally `std::env::var(..).ok()`; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("VIEW_URL").filter(|v| !v.is_empty()) {
            self.url = Some(url);
        }
        if let Some(id) = lookup("VIEW_REPORT_ID").filter(|v| !v.is_empty()) {
            self.report_id = id;
        }
        if let Some(headless) = lookup("VIEWCHECK_HEADLESS") {
            self.browser.headless = !matches!(headless.as_str(), "0" | "false");
        }
        if lookup("SCREENSHOT").is_some_and(|v| !v.is_empty()) {
            self.screenshot.enabled = true;
        }
    }

    /// The page to load
    pub fn target_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "{}/{}{}",
                self.base_url.trim_end_matches('/'),
                self.view_path.trim_start_matches('/'),
                self.report_id
            ),
        }
    }

    /// Reject settings the run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.endpoint_patterns.iter().all(|p| p.is_empty()) {
            return Err(ProbeError::Config(
                "at least one non-empty endpoint pattern is required".to_string(),
            ));
        }
        if self.extraction.cell_strategies.is_empty() {
            return Err(ProbeError::Config(
                "at least one cell strategy is required".to_string(),
            ));
        }
        if self.extraction.year_min > self.extraction.year_max {
            return Err(ProbeError::Config(format!(
                "year_min {} exceeds year_max {}",
                self.extraction.year_min, self.extraction.year_max
            )));
        }
        if self.event_log_capacity == 0 {
            return Err(ProbeError::Config(
                "event_log_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: None,
            base_url: default_base_url(),
            view_path: default_view_path(),
            report_id: default_report_id(),
            endpoint_patterns: default_endpoint_patterns(),
            event_log_capacity: default_event_log_capacity(),
            browser: BrowserSettings::default(),
            timing: TimingConfig::default(),
            extraction: ExtractionConfig::default(),
            decoder: DecoderConfig::default(),
            verdict: VerdictConfig::default(),
            screenshot: ScreenshotConfig::default(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            lang: default_lang(),
            ignore_certificate_errors: true,
            sandbox: false,
            user_agent: None,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: default_navigation_timeout_secs(),
            quiet_window_ms: default_quiet_window_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            container_selector: default_container_selector(),
            cell_strategies: default_cell_strategies(),
            max_cell_texts: default_max_cell_texts(),
            max_container_text: default_max_container_text(),
            max_body_text: default_max_body_text(),
            pagination_pattern: default_pagination_pattern(),
            year_min: default_year_min(),
            year_max: default_year_max(),
            category_keywords: default_category_keywords(),
            header_keywords: default_header_keywords(),
            config_field_pattern: default_config_field_pattern(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_body_len: default_max_body_len(),
            data_list_name: None,
        }
    }
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            critical_signatures: default_critical_signatures(),
            min_cell_count: default_min_cell_count(),
            max_reported_errors: default_max_reported_errors(),
            min_config_field_len: default_min_config_field_len(),
        }
    }
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_screenshot_path(),
        }
    }
}
