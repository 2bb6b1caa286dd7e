//! Response body decoding
//!
//! The report service wraps its payload in an envelope whose
//! `result.jsonStr` field is itself a JSON document serialized to a string.
//! Both levels are parsed here; a failure at either one yields `None`.

use serde_json::Value;
use tracing::debug;

use crate::config::DecoderConfig;
use crate::types::ResponseSummary;

/// Decodes captured response bodies into a [`ResponseSummary`]
#[derive(Debug, Clone, Default)]
pub struct ResponseDecoder {
    config: DecoderConfig,
}

impl ResponseDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Decode a body, or `None` when it is empty, oversized, or malformed
    pub fn decode(&self, body: &str) -> Option<ResponseSummary> {
        // Bounded in characters, not bytes: CJK payloads are three bytes per char
        let chars = body.chars().count();
        if chars == 0 || chars >= self.config.max_body_len {
            debug!("Skipping decode of {} char body", chars);
            return None;
        }

        let envelope: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                debug!("Envelope is not JSON: {}", e);
                return None;
            }
        };
        if !envelope.is_object() {
            return None;
        }

        let result = envelope.get("result");
        let inner = match result.and_then(|r| r.get("jsonStr")) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("jsonStr is not JSON: {}", e);
                    return None;
                }
            },
            // Already structured; accept without a second parse
            Some(other) => Some(other.clone()),
        };

        let has_styles = inner
            .as_ref()
            .and_then(|v| v.get("styles"))
            .is_some_and(|s| !s.is_null());

        let row_count = match inner.as_ref().and_then(|v| v.get("rows")) {
            Some(Value::Object(rows)) => rows.len(),
            Some(Value::Array(rows)) => rows.len(),
            _ => 0,
        };

        Some(ResponseSummary {
            success: envelope
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            has_styles,
            row_count,
            list_length: self.list_length(result),
        })
    }

    fn list_length(&self, result: Option<&Value>) -> usize {
        let Some(Value::Object(lists)) = result.and_then(|r| r.get("dataList")) else {
            return 0;
        };

        let len_of = |entry: &Value| {
            entry
                .get("list")
                .and_then(Value::as_array)
                .map_or(0, Vec::len)
        };

        match &self.config.data_list_name {
            Some(name) => lists.get(name).map_or(0, len_of),
            None => lists.values().map(len_of).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> ResponseDecoder {
        ResponseDecoder::default()
    }

    #[test]
    fn test_double_encoded_body() {
        let body = r#"{"success":true,"result":{"jsonStr":"{\"styles\":{},\"rows\":{\"0\":{}}}"}}"#;
        let summary = decoder().decode(body).unwrap();
        assert!(summary.success);
        assert!(summary.has_styles);
        assert_eq!(summary.row_count, 1);
        assert_eq!(summary.list_length, 0);
    }

    #[test]
    fn test_rows_and_named_list() {
        let body = serde_json::json!({
            "success": true,
            "result": {
                "jsonStr": serde_json::json!({
                    "rows": {"0": {}, "1": {}, "2": {}, "len": 3}
                }).to_string(),
                "dataList": {
                    "htma_profit": {"list": [1, 2, 3, 4]},
                    "other": {"list": [1]}
                }
            }
        })
        .to_string();

        let named = ResponseDecoder::new(DecoderConfig {
            data_list_name: Some("htma_profit".to_string()),
            ..Default::default()
        });
        let summary = named.decode(&body).unwrap();
        assert!(!summary.has_styles);
        assert_eq!(summary.row_count, 4);
        assert_eq!(summary.list_length, 4);

        let all = decoder().decode(&body).unwrap();
        assert_eq!(all.list_length, 5);
    }

    #[test]
    fn test_malformed_outer_is_absent() {
        assert!(decoder().decode("<html>502 Bad Gateway</html>").is_none());
        assert!(decoder().decode("{\"success\":").is_none());
        assert!(decoder().decode("[1,2,3]").is_none());
    }

    #[test]
    fn test_malformed_inner_is_absent() {
        let body = r#"{"success":true,"result":{"jsonStr":"{not json"}}"#;
        assert!(decoder().decode(body).is_none());
    }

    #[test]
    fn test_missing_inner_still_summarized() {
        let summary = decoder().decode(r#"{"success":false,"message":"no"}"#).unwrap();
        assert!(!summary.success);
        assert!(!summary.has_styles);
        assert_eq!(summary.row_count, 0);
    }

    #[test]
    fn test_inner_object_accepted_as_is() {
        let body = r#"{"success":true,"result":{"jsonStr":{"styles":{"0":{}},"rows":{"0":{},"1":{}}}}}"#;
        let summary = decoder().decode(body).unwrap();
        assert!(summary.has_styles);
        assert_eq!(summary.row_count, 2);
    }

    #[test]
    fn test_size_bound() {
        let small = ResponseDecoder::new(DecoderConfig {
            max_body_len: 20,
            data_list_name: None,
        });
        assert!(small.decode(r#"{"success":true,"result":{}}"#).is_none());
        assert!(small.decode("").is_none());
        assert!(small.decode(r#"{"success":true}"#).is_some());
    }

    #[test]
    fn test_size_bound_counts_characters() {
        let text = "员工姓名所在部门总销售额".repeat(5);
        let rows: serde_json::Map<String, Value> = (0..30)
            .map(|i| {
                let row = serde_json::json!({ "cells": { "0": { "text": text } } });
                (i.to_string(), row)
            })
            .collect();
        let inner = serde_json::json!({ "rows": rows, "styles": [] }).to_string();
        let body = serde_json::json!({ "success": true, "result": { "jsonStr": inner } }).to_string();
        assert!(body.len() >= 5000);
        assert!(body.chars().count() < 5000);

        let summary = ResponseDecoder::default().decode(&body).unwrap();
        assert!(summary.success);
        assert_eq!(summary.row_count, 30);

        let tight = ResponseDecoder::new(DecoderConfig {
            max_body_len: body.chars().count(),
            data_list_name: None,
        });
        assert!(tight.decode(&body).is_none());
    }
}
