//! The persisted report schema.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::evidence::MaterializedEvidence;

/// Lifecycle state of a test case. `Pending` only changes once, to
/// `Passed` or `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Pending,
    Passed,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Passed => "Passed",
            Status::Failed => "Failed",
        }
    }

    pub fn from_success(success: bool) -> Self {
        if success {
            Status::Passed
        } else {
            Status::Failed
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per identifier. A composite test case produces one row for each of
/// its identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub status: Status,
    /// Milliseconds between test start and status update.
    #[serde(default)]
    pub duration: u64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub evidence: Vec<MaterializedEvidence>,
}

/// Contents of the report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputResult {
    pub title: String,
    #[serde(default)]
    pub tests: Vec<ReportRow>,
}

impl OutputResult {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tests: Vec::new(),
        }
    }

    /// `"<header> Test Run: <timestamp>"`, trimmed when the header is empty.
    pub fn title_for(header: &str, created: DateTime<Utc>) -> String {
        format!(
            "{} Test Run: {}",
            header,
            created.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
        .trim()
        .to_string()
    }

    pub fn count(&self, status: Status) -> usize {
        self.tests.iter().filter(|t| t.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_title_embeds_header_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            OutputResult::title_for("My Header", at),
            "My Header Test Run: 2024-03-01T12:00:00.000Z"
        );
        assert_eq!(
            OutputResult::title_for("", at),
            "Test Run: 2024-03-01T12:00:00.000Z"
        );
    }

    #[test]
    fn test_row_schema() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut report = OutputResult::new("t");
        report.tests.push(ReportRow {
            id: "ABC-1".into(),
            status: Status::Passed,
            duration: 12,
            date: at,
            evidence: vec![],
        });
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["tests"][0]["id"], "ABC-1");
        assert_eq!(value["tests"][0]["status"], "Passed");
        assert_eq!(value["tests"][0]["duration"], 12);
        assert_eq!(report.count(Status::Passed), 1);
        assert_eq!(report.count(Status::Failed), 0);
    }
}
