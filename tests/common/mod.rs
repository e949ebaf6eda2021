//! Shared helpers for the integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use evidence_collector::{CollectorConfig, OutputResult};
use tempfile::TempDir;

/// A collector config writing into a fresh temp directory.
pub fn temp_config(project: &str) -> (TempDir, CollectorConfig) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let config = CollectorConfig::default()
        .with_project(project)
        .with_header("My Header")
        .with_output(dir.path().join("evidence"), "results.json");
    (dir, config)
}

pub fn read_report(path: &Path) -> OutputResult {
    let raw = fs::read_to_string(path).expect("read report");
    serde_json::from_str(&raw).expect("parse report")
}
