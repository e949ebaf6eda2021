//! Test lifecycle integration.
//!
//! [`EvidenceEnvironment`] translates test-runner events into collector calls
//! and tracks which test case is currently running. Test bodies capture
//! evidence through the [`EvidenceContext`] handle it hands out; a capture made
//! while no tracked test is running is silently dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::collector::{self, Collector, FlushSummary};
use crate::errors::Result;
use crate::evidence::EvidenceDraft;
use crate::identifiers::CaseKey;
use crate::report::Status;

/// Description of the error evidence recorded for a failing test.
pub const TEST_ERROR_MESSAGE: &str = "Error executing test";

/// Runner events the environment reacts to.
#[derive(Debug, Clone, Copy)]
pub enum TestEvent<'a> {
    Setup,
    TestStart {
        name: Option<&'a str>,
        started_at: DateTime<Utc>,
    },
    TestSuccess,
    /// `errors` are the runner's rendered failure messages.
    TestFailure {
        errors: &'a [String],
    },
    Teardown,
    Error,
}

#[derive(Debug)]
pub struct EvidenceEnvironment {
    collector: Arc<Collector>,
    current: Option<CaseKey>,
}

impl EvidenceEnvironment {
    pub fn new(collector: Arc<Collector>) -> Self {
        Self {
            collector,
            current: None,
        }
    }

    /// Uses the process-wide collector; fails if it was never initialized.
    pub fn from_global() -> Result<Self> {
        Ok(Self::new(collector::global()?))
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn current(&self) -> Option<&CaseKey> {
        self.current.as_ref()
    }

    /// Handles one runner event. Only flushing can fail.
    pub fn handle_event(&mut self, event: TestEvent<'_>) -> Result<()> {
        match event {
            TestEvent::Setup => {}
            TestEvent::TestStart { name, started_at } => self.start_test(name, started_at),
            TestEvent::TestSuccess => self.end_test(true, &[]),
            TestEvent::TestFailure { errors } => self.end_test(false, errors),
            TestEvent::Teardown | TestEvent::Error => {
                self.finish()?;
            }
        }
        Ok(())
    }

    pub fn start_test(&mut self, name: Option<&str>, started_at: DateTime<Utc>) {
        self.current = self.collector.start(name, started_at);
    }

    /// Records the runner's errors as error evidence, then sets the status.
    pub fn end_test(&mut self, success: bool, errors: &[String]) {
        let Some(key) = self.current.as_ref() else {
            debug!("test ended without a tracked test case");
            return;
        };
        if !errors.is_empty() {
            let stack = serde_json::to_string_pretty(errors).unwrap_or_else(|_| errors.join("\n"));
            self.collector
                .record(key.primary(), EvidenceDraft::error(TEST_ERROR_MESSAGE, Some(stack)));
        }
        self.collector
            .set_status(key.primary(), Status::from_success(success));
    }

    /// Flushes the collector and forgets the current test.
    pub fn finish(&mut self) -> Result<FlushSummary> {
        self.current = None;
        self.collector.flush()
    }

    /// The capture handle passed to test bodies.
    pub fn context(&self) -> EvidenceContext<'_> {
        EvidenceContext {
            collector: &self.collector,
            current: self.current.as_ref(),
        }
    }
}

/// Capture functions bound to the currently running test.
///
/// Every method returns whether anything was recorded; failures are never
/// surfaced to the test.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceContext<'a> {
    collector: &'a Collector,
    current: Option<&'a CaseKey>,
}

impl<'a> EvidenceContext<'a> {
    pub fn record_text<T: Serialize + ?Sized>(
        &self,
        description: &str,
        data: &T,
        identifier: Option<&str>,
    ) -> bool {
        match to_value(description, data) {
            Some(value) => self.record(EvidenceDraft::text(description, value), identifier),
            None => false,
        }
    }

    pub fn record_image<T: Serialize + ?Sized>(
        &self,
        description: &str,
        data: &T,
        identifier: Option<&str>,
    ) -> bool {
        match to_value(description, data) {
            Some(value) => self.record(EvidenceDraft::image(description, value), identifier),
            None => false,
        }
    }

    pub fn record_error(&self, message: &str, stack: Option<&str>, identifier: Option<&str>) -> bool {
        self.record(
            EvidenceDraft::error(message, stack.map(str::to_string)),
            identifier,
        )
    }

    /// Records `error` with its chain of sources as the stack.
    pub fn record_std_error(
        &self,
        error: &(dyn std::error::Error + 'static),
        identifier: Option<&str>,
    ) -> bool {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        let stack = if causes.is_empty() {
            None
        } else {
            Some(causes.join("\n"))
        };
        self.record_error(&error.to_string(), stack.as_deref(), identifier)
    }

    fn record(&self, draft: EvidenceDraft, identifier: Option<&str>) -> bool {
        let Some(key) = self.current else {
            debug!(description = %draft.description, "no tracked test, capture ignored");
            return false;
        };
        self.collector
            .record(key.primary(), draft.with_identifier(identifier))
            > 0
    }
}

fn to_value<T: Serialize + ?Sized>(description: &str, data: &T) -> Option<serde_json::Value> {
    serde_json::to_value(data)
        .inspect_err(|e| warn!(description = description, error = %e, "evidence data is not serializable"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectorConfig;
    use crate::evidence::{EvidenceKind, Payload};
    use crate::render::BitmapRenderer;
    use crate::store::MemoryFileSystem;
    use serde_json::json;

    fn environment() -> EvidenceEnvironment {
        let config = CollectorConfig::default()
            .with_project("ABC")
            .with_output("evidence", "results.json");
        let collector = Collector::with_backends(
            config,
            Arc::new(MemoryFileSystem::new()),
            Arc::new(BitmapRenderer),
        )
        .unwrap();
        EvidenceEnvironment::new(Arc::new(collector))
    }

    #[test]
    fn test_capture_without_current_test_is_noop() {
        let env = environment();
        assert!(!env.context().record_text("d", "v", None));
        assert!(env.collector().is_empty());
    }

    #[test]
    fn test_untracked_start_clears_current() {
        let mut env = environment();
        env.start_test(Some("ABC-1 first"), Utc::now());
        assert!(env.current().is_some());
        env.start_test(Some("no id"), Utc::now());
        assert!(env.current().is_none());
        assert!(!env.context().record_text("d", "v", None));
    }

    #[test]
    fn test_failure_records_runner_errors() {
        let mut env = environment();
        env.handle_event(TestEvent::TestStart {
            name: Some("#ABC-7 fails"),
            started_at: Utc::now(),
        })
        .unwrap();
        let errors = vec!["expected 1 to be 2".to_string()];
        env.handle_event(TestEvent::TestFailure { errors: &errors })
            .unwrap();
        let case = env.collector().test_case("ABC-7").unwrap();
        assert_eq!(case.status, Status::Failed);
        assert_eq!(case.evidence.len(), 1);
        assert_eq!(case.evidence[0].kind(), EvidenceKind::Error);
        match &case.evidence[0].payload {
            Payload::Error { message, stack } => {
                assert_eq!(message, TEST_ERROR_MESSAGE);
                assert!(stack.as_deref().unwrap().contains("expected 1 to be 2"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_context_serializes_structured_data() {
        let mut env = environment();
        env.start_test(Some("ABC-2"), Utc::now());
        assert!(env.context().record_image("shot", &json!({"a": "b"}), None));
        let case = env.collector().test_case("ABC-2").unwrap();
        assert_eq!(case.evidence[0].payload, Payload::Image(json!({"a": "b"})));
    }

    #[test]
    fn test_std_error_includes_sources() {
        #[derive(Debug)]
        struct Outer(std::io::Error);
        impl std::fmt::Display for Outer {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("outer failed")
            }
        }
        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let mut env = environment();
        env.start_test(Some("ABC-3"), Utc::now());
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert!(env.context().record_std_error(&err, None));
        let case = env.collector().test_case("ABC-3").unwrap();
        let Payload::Error { message, stack } = &case.evidence[0].payload else {
            panic!("expected error payload");
        };
        assert_eq!(message, "outer failed");
        assert_eq!(stack.as_deref(), Some("caused by: disk full"));
    }

    #[test]
    fn test_teardown_flushes_and_forgets_current() {
        let mut env = environment();
        env.start_test(Some("ABC-4"), Utc::now());
        env.handle_event(TestEvent::TestSuccess).unwrap();
        env.handle_event(TestEvent::Teardown).unwrap();
        assert!(env.current().is_none());
        assert!(env.collector().is_empty());
    }
}
