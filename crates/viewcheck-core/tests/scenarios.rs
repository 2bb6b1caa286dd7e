//! End-to-end scenarios through the public API
//!
//! Each test plays a recorded page reading and network/console activity through
//! the recorders, derives the page state, and checks the verdict.

use viewcheck_core::config::ExtractionConfig;
use viewcheck_core::{
    ConsoleRecorder, PageStateRules, ProbeConfig, RawCellSet, RawSnapshot, ResponseDecoder,
    Severity, TrafficRecorder, Verdict, VerdictEngine, VerdictReason,
};

const SHOW: &str = "http://127.0.0.1:8085/jmreport/show?id=8946110000000000001";

/// Helper to build a cell set with `count` matched elements
fn cell_set(strategy: &str, count: usize) -> RawCellSet {
    RawCellSet {
        strategy: strategy.to_string(),
        count,
        texts: (0..count).map(|i| format!("cell-{}", i)).collect(),
    }
}

fn rules() -> PageStateRules {
    PageStateRules::new(&ExtractionConfig::default()).expect("default patterns compile")
}

fn traffic() -> TrafficRecorder {
    let config = ProbeConfig::default();
    TrafficRecorder::new(
        config.endpoint_patterns.clone(),
        ResponseDecoder::new(config.decoder),
    )
}

#[test]
fn test_paginated_grid_without_errors_is_data_visible() {
    let raw = RawSnapshot {
        has_container: true,
        container_text: "日期 品类 销售额".to_string(),
        body_text: "日期 品类 销售额 共128条".to_string(),
        cells: vec![cell_set("grid-cell", 40), cell_set("table-cell", 0)],
        ..Default::default()
    };
    let state = rules().derive(&raw);
    assert!(state.has_pagination);
    assert_eq!(state.cell_count, 40);

    let verdict = VerdictEngine::default().decide(&state, &[], &[]);
    assert_eq!(verdict, Verdict::pass(VerdictReason::DataVisible));
}

#[test]
fn test_blank_page_is_data_not_visible() {
    let raw = RawSnapshot::default();
    let state = rules().derive(&raw);

    let mut console = ConsoleRecorder::new();
    console.record(Severity::Error, "Uncaught ReferenceError: x is undefined");

    let verdict = VerdictEngine::default().decide(&state, &[], console.entries());
    assert_eq!(verdict, Verdict::fail(VerdictReason::DataNotVisible));
}

#[test]
fn test_double_encoded_show_response() {
    let mut recorder = traffic();
    recorder.on_request(SHOW, "GET", None);
    recorder.on_response(
        SHOW,
        200,
        Ok(r#"{"success":true,"result":{"jsonStr":"{\"styles\":{},\"rows\":{\"0\":{}}}"}}"#.to_string()),
    );

    let exchanges = recorder.into_exchanges();
    let summary = exchanges[0].decoded_summary.as_ref().expect("decoded");
    assert!(summary.has_styles);
    assert_eq!(summary.row_count, 1);

    let state = rules().derive(&RawSnapshot {
        has_container: true,
        ..Default::default()
    });
    let verdict = VerdictEngine::default().decide(&state, &exchanges, &[]);
    assert_eq!(verdict, Verdict::pass(VerdictReason::BaselineOkNoErrors));
}

#[test]
fn test_hundreds_of_cells_stay_bounded() {
    let raw = RawSnapshot {
        has_container: true,
        cells: vec![cell_set("grid-cell", 0), cell_set("table-cell", 480)],
        ..Default::default()
    };
    let state = rules().derive(&raw);
    assert_eq!(state.cell_count, 480);
    assert_eq!(state.cell_texts.len(), 30);
    assert_eq!(state.cell_strategy.as_deref(), Some("table-cell"));
}

#[test]
fn test_critical_errors_with_sparse_render_fail_with_diagnostics() {
    let raw = RawSnapshot {
        has_container: true,
        cells: vec![cell_set("grid-cell", 2)],
        ..Default::default()
    };
    let state = rules().derive(&raw);

    let mut console = ConsoleRecorder::new();
    for i in 0..20 {
        console.record(Severity::Error, format!("GET http://h/undefined/{} 404", i));
    }
    console.record_failed_request(SHOW, "net::ERR_CONNECTION_REFUSED");

    let decision = VerdictEngine::default().evaluate(&state, &[], console.entries());
    assert_eq!(decision.verdict, Verdict::fail(VerdictReason::ErrorsPresent));
    assert_eq!(decision.critical.len(), 15);
}

#[test]
fn test_snapshot_derivation_is_repeatable() {
    let raw = RawSnapshot {
        has_container: true,
        body_text: "2024年 日期 共 3 条".to_string(),
        script_text: "baseFull = \"http://127.0.0.1:8085\"".to_string(),
        cells: vec![cell_set("grid-cell", 3)],
        ..Default::default()
    };
    let r = rules();
    let first = r.derive(&raw);
    let second = r.derive(&raw);
    assert_eq!(first, second);
    assert!(first.has_date_like);
    assert!(first.has_header_keyword);
    assert_eq!(first.config_field.as_deref(), Some("http://127.0.0.1:8085"));
}

#[test]
fn test_noisy_employee_table_is_rescued_by_headers() {
    let raw = RawSnapshot {
        has_container: true,
        container_text: "员工 姓名 所在部门".to_string(),
        body_text: "员工明细 员工 姓名 所在部门".to_string(),
        cells: vec![cell_set("table-cell", 3)],
        ..Default::default()
    };
    let state = rules().derive(&raw);
    assert!(state.has_header_keyword);
    assert!(!state.has_pagination);

    let mut console = ConsoleRecorder::new();
    console.record(Severity::Error, "GET http://h/jmreport/undefined.js 404");

    let decision = VerdictEngine::default().evaluate(&state, &[], console.entries());
    assert_eq!(decision.verdict, Verdict::pass(VerdictReason::DataVisible));
    assert_eq!(decision.rule, "render-despite-noise");
}
