//! Page state extraction
//!
//! The whole DOM reading happens in one script evaluation so the snapshot can
//! never straddle two render passes. The script only reads. Every cell strategy
//! is evaluated in the same pass, and the choice between them is made on the
//! Rust side by [`PageStateRules`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use viewcheck_core::config::{CellStrategy, ExtractionConfig};
use viewcheck_core::{PageState, PageStateRules, ProbeError, RawSnapshot};

use crate::error::Result;

/// Anything that can evaluate a script in a loaded page
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    async fn evaluate_script(&self, script: &str) -> Result<Value>;
}

/// Reads [`PageState`] from a rendered page
#[derive(Debug, Clone)]
pub struct PageStateExtractor {
    rules: PageStateRules,
    script: String,
}

impl PageStateExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        if config.cell_strategies.is_empty() {
            return Err(ProbeError::Config(
                "at least one cell strategy is required".to_string(),
            ));
        }
        Ok(Self {
            rules: PageStateRules::new(config)?,
            script: snapshot_script(config)?,
        })
    }

    /// Take one snapshot of the page
    pub async fn snapshot(&self, page: &dyn ScriptRunner) -> Result<PageState> {
        let value = page.evaluate_script(&self.script).await?;
        let raw = parse_snapshot(value)?;
        debug!(
            "Raw snapshot: container={}, body={} chars, strategies={}",
            raw.has_container,
            raw.body_text.len(),
            raw.cells.len()
        );

        let state = self.rules.derive(&raw);
        info!(
            "Page state: container={}, cells={} ({}), pagination={}",
            state.has_container,
            state.cell_count,
            state.cell_strategy.as_deref().unwrap_or("none"),
            state.has_pagination
        );
        Ok(state)
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

/// Build the in-page reader for the configured container and strategies
fn snapshot_script(config: &ExtractionConfig) -> Result<String> {
    let container = serde_json::to_string(&config.container_selector)?;
    let strategies = serde_json::to_string(
        &config
            .cell_strategies
            .iter()
            .map(|CellStrategy { name, selector }| {
                serde_json::json!({ "name": name, "selector": selector })
            })
            .collect::<Vec<_>>(),
    )?;
    let cap = config.max_cell_texts;

    Ok(format!(
        r#"(() => {{
  const container = document.querySelector({container});
  const bodyText = (document.body && document.body.innerText) || '';
  const scriptText = Array.from(document.scripts)
    .filter((s) => !s.src)
    .map((s) => s.textContent || '')
    .join('\n');
  const cells = container
    ? {strategies}.map((s) => {{
        let nodes = [];
        try {{
          nodes = Array.from(container.querySelectorAll(s.selector));
        }} catch (_) {{
          nodes = [];
        }}
        return {{
          strategy: s.name,
          count: nodes.length,
          texts: nodes
            .map((n) => (n.textContent || '').trim())
            .filter(Boolean)
            .slice(0, {cap}),
        }};
      }})
    : [];
  return JSON.stringify({{
    hasContainer: !!container,
    containerText: container ? container.innerText || '' : '',
    bodyText,
    scriptText,
    cells,
  }});
}})()"#
    ))
}

/// Accept either the stringified snapshot or an already-structured value
fn parse_snapshot(value: Value) -> Result<RawSnapshot> {
    match value {
        Value::String(s) => serde_json::from_str(&s)
            .map_err(|e| ProbeError::Extraction(format!("Malformed page snapshot: {}", e))),
        v @ Value::Object(_) => serde_json::from_value(v)
            .map_err(|e| ProbeError::Extraction(format!("Malformed page snapshot: {}", e))),
        other => Err(ProbeError::Extraction(format!(
            "Page snapshot returned {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
