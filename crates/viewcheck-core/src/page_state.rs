//! Derivation of [`PageState`] from a raw page reading
//!
//! The browser side reads the page once and hands back a [`RawSnapshot`] with
//! untruncated text. All booleans are derived here from the full text, and only
//! then are the text fields cut down to their display bounds.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::types::PageState;
use crate::{ProbeError, Result};

/// Cells found by one extraction strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCellSet {
    pub strategy: String,
    /// Number of elements the selector matched
    pub count: usize,
    /// Element texts in document order
    #[serde(default)]
    pub texts: Vec<String>,
}

/// Result of the single in-page evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    pub has_container: bool,
    #[serde(default)]
    pub container_text: String,
    #[serde(default)]
    pub body_text: String,
    /// Source of inline scripts, searched for the configuration field
    #[serde(default)]
    pub script_text: String,
    /// One entry per configured strategy, in rank order
    #[serde(default)]
    pub cells: Vec<RawCellSet>,
}

/// Compiled derivation rules
#[derive(Debug, Clone)]
pub struct PageStateRules {
    pagination: Regex,
    config_field: Regex,
    year_token: Regex,
    year_min: u32,
    year_max: u32,
    category_keywords: Vec<String>,
    header_keywords: Vec<String>,
    max_cell_texts: usize,
    max_container_text: usize,
    max_body_text: usize,
}

impl PageStateRules {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| ProbeError::Config(format!("Invalid {} pattern: {}", name, e)))
        };

        Ok(Self {
            pagination: compile("pagination", &config.pagination_pattern)?,
            config_field: compile("config field", &config.config_field_pattern)?,
            year_token: compile("year", "[0-9]+")?,
            year_min: config.year_min,
            year_max: config.year_max,
            category_keywords: config.category_keywords.clone(),
            header_keywords: config.header_keywords.clone(),
            max_cell_texts: config.max_cell_texts,
            max_container_text: config.max_container_text,
            max_body_text: config.max_body_text,
        })
    }

    /// Build the page state. Pure: the same snapshot always yields the same state.
    pub fn derive(&self, raw: &RawSnapshot) -> PageState {
        let container_text = if raw.has_container {
            raw.container_text.as_str()
        } else {
            ""
        };
        let body_text = raw.body_text.as_str();

        let (cell_count, cell_strategy, cell_texts) = if raw.has_container {
            self.pick_cells(&raw.cells)
        } else {
            (0, None, Vec::new())
        };

        let contains_any = |keywords: &[String]| {
            keywords.iter().filter(|k| !k.is_empty()).any(|k| {
                container_text.contains(k.as_str()) || body_text.contains(k.as_str())
            })
        };

        PageState {
            has_container: raw.has_container,
            container_text: truncate(container_text, self.max_container_text),
            body_text: truncate(body_text, self.max_body_text),
            body_text_length: body_text.chars().count(),
            cell_count,
            cell_strategy,
            cell_texts,
            has_pagination: self.pagination.is_match(body_text),
            has_date_like: self.has_year(body_text) || self.has_year(container_text),
            has_category_keyword: contains_any(&self.category_keywords),
            has_header_keyword: contains_any(&self.header_keywords),
            config_field: self
                .config_field
                .captures(&raw.script_text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string()),
        }
    }

    /// Highest-cardinality strategy wins; earlier strategies win ties
    fn pick_cells(&self, sets: &[RawCellSet]) -> (usize, Option<String>, Vec<String>) {
        let mut best: Option<&RawCellSet> = None;
        for set in sets {
            if best.map_or(true, |b| set.count > b.count) {
                best = Some(set);
            }
        }

        match best {
            Some(set) if set.count > 0 => {
                let texts = set
                    .texts
                    .iter()
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .take(self.max_cell_texts)
                    .map(str::to_string)
                    .collect();
                (set.count, Some(set.strategy.clone()), texts)
            }
            _ => (0, None, Vec::new()),
        }
    }

    fn has_year(&self, text: &str) -> bool {
        self.year_token.find_iter(text).any(|m| {
            let digits = m.as_str();
            // yyyy or yyyymmdd
            let year = match digits.len() {
                4 | 8 => &digits[..4],
                _ => return false,
            };
            year.parse::<u32>()
                .is_ok_and(|y| (self.year_min..=self.year_max).contains(&y))
        })
    }
}

/// Bounded prefix, cut on a character boundary
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> PageStateRules {
        PageStateRules::new(&ExtractionConfig::default()).unwrap()
    }

    fn cells(strategy: &str, count: usize, texts: &[&str]) -> RawCellSet {
        RawCellSet {
            strategy: strategy.to_string(),
            count,
            texts: texts.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_no_container() {
        let raw = RawSnapshot {
            has_container: false,
            container_text: "ignored".to_string(),
            body_text: "登录超时".to_string(),
            cells: vec![cells("grid-cell", 3, &["a", "b", "c"])],
            ..Default::default()
        };
        let state = rules().derive(&raw);
        assert!(!state.has_container);
        assert_eq!(state.cell_count, 0);
        assert!(state.cell_texts.is_empty());
        assert!(state.container_text.is_empty());
        assert!(!state.has_pagination);
    }

    #[test]
    fn test_empty_container_is_valid() {
        let raw = RawSnapshot {
            has_container: true,
            cells: vec![cells("grid-cell", 0, &[]), cells("table-cell", 0, &[])],
            ..Default::default()
        };
        let state = rules().derive(&raw);
        assert!(state.has_container);
        assert_eq!(state.cell_count, 0);
        assert_eq!(state.cell_strategy, None);
        assert_eq!(state.body_text_length, 0);
    }

    #[test]
    fn test_fallback_strategy_used_when_primary_empty() {
        let raw = RawSnapshot {
            has_container: true,
            cells: vec![
                cells("grid-cell", 0, &[]),
                cells("table-cell", 4, &["日期", " ", "品类", "2024-01-01"]),
            ],
            ..Default::default()
        };
        let state = rules().derive(&raw);
        assert_eq!(state.cell_count, 4);
        assert_eq!(state.cell_strategy.as_deref(), Some("table-cell"));
        assert_eq!(state.cell_texts, vec!["日期", "品类", "2024-01-01"]);
    }

    #[test]
    fn test_tie_goes_to_higher_rank() {
        let raw = RawSnapshot {
            has_container: true,
            cells: vec![cells("grid-cell", 2, &["x", "y"]), cells("table-cell", 2, &["p", "q"])],
            ..Default::default()
        };
        let state = rules().derive(&raw);
        assert_eq!(state.cell_strategy.as_deref(), Some("grid-cell"));
        assert_eq!(state.cell_texts, vec!["x", "y"]);
    }

    #[test]
    fn test_cell_texts_capped() {
        let texts: Vec<String> = (0..300).map(|i| format!("c{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let raw = RawSnapshot {
            has_container: true,
            cells: vec![cells("grid-cell", 300, &refs)],
            ..Default::default()
        };
        let state = rules().derive(&raw);
        assert_eq!(state.cell_count, 300);
        assert_eq!(state.cell_texts.len(), 30);
        assert_eq!(state.cell_texts[29], "c29");
    }

    #[test]
    fn test_pagination_marker() {
        let r = rules();
        let with = |body: &str| {
            r.derive(&RawSnapshot {
                has_container: true,
                body_text: body.to_string(),
                ..Default::default()
            })
            .has_pagination
        };
        assert!(with("共128条"));
        assert!(with("第1页 共 128 条 每页20条"));
        assert!(!with("共计条目"));
        assert!(!with("128 items"));
    }

    #[test]
    fn test_year_range() {
        let r = rules();
        assert!(r.has_year("日期 2024-03-01"));
        assert!(r.has_year("20240301"));
        assert!(!r.has_year("订单 12345 金额 3000"));
        assert!(!r.has_year("1200"));
        assert!(!r.has_year("no digits"));
    }

    #[test]
    fn test_keywords_from_body_or_container() {
        let raw = RawSnapshot {
            has_container: true,
            container_text: "品类 销售额".to_string(),
            body_text: "报表 日期".to_string(),
            ..Default::default()
        };
        let state = rules().derive(&raw);
        assert!(state.has_category_keyword);
        assert!(state.has_header_keyword);
    }

    #[test]
    fn test_truncation_after_derivation() {
        let mut body = "x".repeat(1000);
        body.push_str("共 7 条 2023");
        let raw = RawSnapshot {
            has_container: true,
            container_text: "报".repeat(2000),
            body_text: body,
            ..Default::default()
        };
        let state = rules().derive(&raw);
        assert!(state.has_pagination);
        assert!(state.has_date_like);
        assert_eq!(state.body_text.chars().count(), 500);
        assert_eq!(state.container_text.chars().count(), 800);
        assert_eq!(state.body_text_length, 1010);
    }

    #[test]
    fn test_config_field() {
        let raw = RawSnapshot {
            has_container: true,
            script_text: "var baseFull = 'http://127.0.0.1:8085';\nvar x = 1;".to_string(),
            ..Default::default()
        };
        assert_eq!(
            rules().derive(&raw).config_field.as_deref(),
            Some("http://127.0.0.1:8085")
        );

        let missing = RawSnapshot::default();
        assert_eq!(rules().derive(&missing).config_field, None);
    }

    #[test]
    fn test_derive_is_pure() {
        let raw = RawSnapshot {
            has_container: true,
            body_text: "共128条".to_string(),
            cells: vec![cells("grid-cell", 40, &["a"; 40])],
            ..Default::default()
        };
        let r = rules();
        assert_eq!(r.derive(&raw), r.derive(&raw));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = ExtractionConfig {
            pagination_pattern: "共(".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PageStateRules::new(&config),
            Err(ProbeError::Config(_))
        ));
    }
}
