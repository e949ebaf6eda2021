//! End-to-end collector behavior against the real filesystem.

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use evidence_collector::render::BitmapRenderer;
use evidence_collector::store::MemoryFileSystem;
use evidence_collector::{Collector, ErrorKind, EvidenceDraft, EvidenceKind, Status};
use serde_json::json;

#[test]
fn test_text_capture_end_to_end() {
    let (_dir, config) = common::temp_config("ABC");
    let collector = Collector::new(config).unwrap();

    let key = collector.start(Some("#ABC-T1 does X"), Utc::now()).unwrap();
    assert_eq!(key.primary(), "ABC-T1");
    collector.record(key.primary(), EvidenceDraft::text("d", json!("v")));
    assert!(collector.set_status("ABC-T1", Status::Passed));
    collector.flush().unwrap();

    let report = common::read_report(&collector.report_path());
    assert!(report.title.starts_with("My Header Test Run: "));
    assert_eq!(report.tests.len(), 1);
    let row = &report.tests[0];
    assert_eq!(row.id, "ABC-T1");
    assert_eq!(row.status, Status::Passed);
    assert_eq!(row.evidence.len(), 1);

    let ev = &row.evidence[0];
    assert_eq!(ev.description, "d");
    assert_eq!(ev.kind, EvidenceKind::Text);
    let resource = ev.resource.as_deref().unwrap();
    assert!(resource.ends_with(&format!("-dataText-{}.txt", ev.collected_at)));
    assert_eq!(fs::read_to_string(resource).unwrap(), "v");
}

#[test]
fn test_report_has_no_raw_data() {
    let (_dir, config) = common::temp_config("ABC");
    let collector = Collector::new(config).unwrap();
    collector.start(Some("ABC-T2"), Utc::now());
    collector.record("ABC-T2", EvidenceDraft::image("shot", json!({"secret": "payload"})));
    collector.flush().unwrap();

    let raw = fs::read_to_string(collector.report_path()).unwrap();
    assert!(!raw.contains("\"data\""));
    assert!(!raw.contains("payload"));
    let report = common::read_report(&collector.report_path());
    let resource = report.tests[0].evidence[0].resource.clone().unwrap();
    assert!(resource.ends_with(".png"));
    let bytes = fs::read(&resource).unwrap();
    assert!(bytes.starts_with(b"\x89PNG"));
}

#[test]
fn test_composite_fan_out_in_report() {
    let (_dir, config) = common::temp_config("ABC");
    let collector = Collector::new(config).unwrap();
    let key = collector
        .start(Some("can add two numbers ABC-T488,ABC-T188 together"), Utc::now())
        .unwrap();
    collector.record(key.primary(), EvidenceDraft::text("shared", json!({"a": "c"})));
    collector.record(
        key.primary(),
        EvidenceDraft::image("only T188", json!({"a": "c"})).with_identifier(Some("ABC-T188")),
    );
    collector.set_status(key.primary(), Status::Passed);
    let summary = collector.flush().unwrap();
    assert_eq!(summary.rows, 2);
    assert_eq!(summary.artifacts, 3);

    let report = common::read_report(&collector.report_path());
    assert_eq!(report.tests[0].id, "ABC-T488");
    assert_eq!(report.tests[1].id, "ABC-T188");
    let first: Vec<_> = report.tests[0].evidence.iter().map(|e| e.description.as_str()).collect();
    let second: Vec<_> = report.tests[1].evidence.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(first, vec!["shared"]);
    assert_eq!(second, vec!["shared", "only T188"]);
    assert_eq!(report.tests[0].date, report.tests[1].date);
    assert_eq!(report.tests[0].duration, report.tests[1].duration);
    for row in &report.tests {
        for ev in &row.evidence {
            assert_eq!(ev.identifier, row.id);
            assert!(Path::new(ev.resource.as_deref().unwrap()).exists());
        }
    }
}

#[test]
fn test_rapid_captures_get_distinct_files() {
    let (_dir, config) = common::temp_config("ABC");
    let collector = Collector::new(config).unwrap();
    collector.start(Some("ABC-T3"), Utc::now());
    for i in 0..20 {
        collector.record("ABC-T3", EvidenceDraft::text(format!("n{i}"), json!(i)));
    }
    collector.flush().unwrap();
    let report = common::read_report(&collector.report_path());
    let mut resources: Vec<_> = report.tests[0]
        .evidence
        .iter()
        .map(|e| e.resource.clone().unwrap())
        .collect();
    let descriptions: Vec<_> = report.tests[0].evidence.iter().map(|e| e.description.clone()).collect();
    assert_eq!(descriptions, (0..20).map(|i| format!("n{i}")).collect::<Vec<_>>());
    resources.sort();
    resources.dedup();
    assert_eq!(resources.len(), 20);
}

#[test]
fn test_existing_report_is_extended() {
    let (_dir, config) = common::temp_config("ABC");
    {
        let first = Collector::new(config.clone()).unwrap();
        first.start(Some("ABC-1"), Utc::now());
        first.flush().unwrap();
    }
    let second = Collector::new(config).unwrap();
    second.start(Some("ABC-2"), Utc::now());
    second.flush().unwrap();
    let report = common::read_report(&second.report_path());
    let ids: Vec<_> = report.tests.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["ABC-1", "ABC-2"]);
}

#[test]
fn test_corrupt_report_is_a_hard_failure() {
    let (_dir, config) = common::temp_config("ABC");
    let collector = Collector::new(config).unwrap();
    fs::write(collector.report_path(), "{ broken").unwrap();
    collector.start(Some("ABC-1"), Utc::now());
    let err = collector.flush().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(collector.is_empty());
    assert_eq!(fs::read_to_string(collector.report_path()).unwrap(), "{ broken");
}

#[test]
fn test_disabled_collector_never_touches_filesystem() {
    let (_dir, config) = common::temp_config("ABC");
    let fs = Arc::new(MemoryFileSystem::new());
    let collector =
        Collector::with_backends(config.disabled(), fs.clone(), Arc::new(BitmapRenderer)).unwrap();
    collector.start(Some("ABC-1"), Utc::now());
    collector.record("ABC-1", EvidenceDraft::text("d", json!("v")));
    collector.set_status("ABC-1", Status::Passed);
    collector.flush().unwrap();
    assert!(collector.is_empty());
    assert_eq!(fs.operations(), 0);
    assert!(fs.paths().is_empty());
}
