//! The evidence collector.
//!
//! A [`Collector`] owns the in-memory table of tracked test cases for one run.
//! Test cases are created by [`Collector::start`], receive evidence through
//! [`Collector::record`], get their outcome from [`Collector::set_status`],
//! and are written to the report by [`Collector::flush`], which always leaves
//! the table empty.
//!
//! All operations are synchronous. Calls are expected to come from a single
//! driver thread; the internal mutex only makes the type shareable.
//!
//! A process-wide instance is available through [`init`] and [`global`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::MicroClock;
use crate::config::CollectorConfig;
use crate::errors::{CollectorError, Result};
use crate::evidence::{Evidence, EvidenceDraft, MaterializedEvidence};
use crate::identifiers::{CaseKey, IdentifierExtractor};
use crate::render::{ArtifactRenderer, BitmapRenderer, RenderBackend};
use crate::report::{ReportRow, Status};
use crate::store::{FileSystem, OutputStore, StdFileSystem};

// =============================================================================
// CORE TYPES
// =============================================================================

/// Evidence and outcome of one (possibly composite) test case.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    pub key: CaseKey,
    pub started: DateTime<Utc>,
    /// Milliseconds, set together with the final status.
    pub duration: Option<u64>,
    pub status: Status,
    /// In capture order.
    pub evidence: Vec<Evidence>,
}

impl TestCase {
    pub fn new(key: CaseKey, started: DateTime<Utc>) -> Self {
        Self {
            key,
            started,
            duration: None,
            status: Status::Pending,
            evidence: Vec::new(),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.key.is_composite()
    }

    /// Evidence belonging to the report row of `id`. A non-composite case
    /// reports all of its evidence.
    pub fn evidence_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Evidence> + 'a {
        let composite = self.is_composite();
        self.evidence
            .iter()
            .filter(move |ev| !composite || ev.identifier == id)
    }
}

/// Outcome counters of a flush.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushSummary {
    pub rows: usize,
    pub artifacts: usize,
    pub failed_artifacts: usize,
}

/// Test cases in insertion order, indexed by primary key.
#[derive(Debug, Default)]
struct CaseTable {
    cases: Vec<TestCase>,
    index: HashMap<String, usize>,
}

impl CaseTable {
    fn get(&self, key: &str) -> Option<&TestCase> {
        self.index.get(key).map(|&i| &self.cases[i])
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut TestCase> {
        self.index.get(key).map(|&i| &mut self.cases[i])
    }

    /// Returns `false` and leaves the table untouched if the key exists.
    fn insert(&mut self, case: TestCase) -> bool {
        let key = case.key.primary().to_string();
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.cases.len());
        self.cases.push(case);
        true
    }

    fn take(&mut self) -> Vec<TestCase> {
        self.index.clear();
        std::mem::take(&mut self.cases)
    }
}

// =============================================================================
// COLLECTOR
// =============================================================================

#[derive(Debug)]
pub struct Collector {
    id: Uuid,
    config: CollectorConfig,
    extractor: IdentifierExtractor,
    store: OutputStore,
    renderer: ArtifactRenderer,
    clock: MicroClock,
    table: Mutex<CaseTable>,
}

impl Collector {
    /// Builds a collector writing through `std::fs` and rendering images with
    /// [`BitmapRenderer`].
    pub fn new(config: CollectorConfig) -> Result<Self> {
        Self::with_backends(config, Arc::new(StdFileSystem), Arc::new(BitmapRenderer))
    }

    /// When enabled, the output folder and an empty report are created unless
    /// they already exist.
    pub fn with_backends(
        config: CollectorConfig,
        fs: Arc<dyn FileSystem>,
        backend: Arc<dyn RenderBackend>,
    ) -> Result<Self> {
        let extractor = IdentifierExtractor::from_config(&config)?;
        let store = OutputStore::new(fs, &config.output);
        let collector = Self {
            id: Uuid::new_v4(),
            extractor,
            store,
            renderer: ArtifactRenderer::new(backend),
            clock: MicroClock::new(),
            table: Mutex::new(CaseTable::default()),
            config,
        };
        if collector.config.enabled {
            collector.store.ensure_initialized(&collector.config.header)?;
        }
        debug!(
            collector = %collector.id,
            enabled = collector.config.enabled,
            report = %collector.store.report_path().display(),
            "evidence collector created"
        );
        Ok(collector)
    }

    fn lock(&self) -> MutexGuard<'_, CaseTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn report_path(&self) -> PathBuf {
        self.store.report_path()
    }

    pub fn extract(&self, raw_name: Option<&str>) -> Option<Vec<String>> {
        self.extractor.extract(raw_name)
    }

    pub fn len(&self) -> usize {
        self.lock().cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the tracked test case with primary key `key`.
    pub fn test_case(&self, key: &str) -> Option<TestCase> {
        self.lock().get(key).cloned()
    }

    /// Starts tracking the test named `raw_name`.
    ///
    /// Returns the key to record evidence under, or `None` when the name holds
    /// no identifier (the test then runs untracked) or collection is disabled.
    /// Starting an already tracked key keeps the original start time.
    pub fn start(&self, raw_name: Option<&str>, started_at: DateTime<Utc>) -> Option<CaseKey> {
        if !self.config.enabled {
            return None;
        }
        let Some(key) = self.extract(raw_name).and_then(CaseKey::new) else {
            warn!(
                test = raw_name.unwrap_or("<unnamed>"),
                "test will be ignored for evidence collection: no test case identifier in its name"
            );
            return None;
        };
        self.track(key.clone(), started_at);
        Some(key)
    }

    /// Inserts a fresh test case for `key` unless one exists. Returns whether
    /// it was inserted.
    pub fn track(&self, key: CaseKey, started_at: DateTime<Utc>) -> bool {
        if !self.config.enabled {
            return false;
        }
        let inserted = self.lock().insert(TestCase::new(key.clone(), started_at));
        if inserted {
            debug!(collector = %self.id, test_case = %key, "tracking test case");
        } else {
            debug!(collector = %self.id, test_case = %key, "test case already tracked");
        }
        inserted
    }

    /// Appends evidence to the test case `key` and returns how many entries
    /// were added.
    ///
    /// A draft without an explicit identifier recorded on a composite case is
    /// copied once per identifier of the case, each copy with its own
    /// timestamp. On a composite case, evidence tagged with an identifier
    /// outside the key is kept but matches no report row, so it is never
    /// written to the report.
    pub fn record(&self, key: &str, draft: EvidenceDraft) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let mut table = self.lock();
        let Some(case) = table.get_mut(key) else {
            warn!(test_case = key, "missing test case, evidence dropped");
            return 0;
        };
        let EvidenceDraft {
            identifier,
            description,
            payload,
        } = draft;
        match identifier {
            None if case.is_composite() => {
                let copies: Vec<Evidence> = case
                    .key
                    .ids()
                    .iter()
                    .map(|id| Evidence {
                        identifier: id.clone(),
                        description: description.clone(),
                        collected_at: self.clock.now_micros(),
                        payload: payload.clone(),
                    })
                    .collect();
                let added = copies.len();
                case.evidence.extend(copies);
                added
            }
            identifier => {
                let identifier = identifier.unwrap_or_else(|| case.key.primary().to_string());
                if case.is_composite() && !case.key.contains(&identifier) {
                    warn!(
                        test_case = key,
                        identifier = %identifier,
                        "evidence identifier is not part of the test case and will not be reported"
                    );
                }
                case.evidence.push(Evidence {
                    identifier,
                    description,
                    collected_at: self.clock.now_micros(),
                    payload,
                });
                1
            }
        }
    }

    /// Sets the outcome of `identifier`, measuring duration up to now.
    pub fn set_status(&self, identifier: &str, status: Status) -> bool {
        self.set_status_at(identifier, status, Utc::now())
    }

    /// Sets the outcome of `identifier` with a driver-supplied end time.
    /// Unknown identifiers are logged and ignored.
    pub fn set_status_at(&self, identifier: &str, status: Status, ended_at: DateTime<Utc>) -> bool {
        if !self.config.enabled {
            return false;
        }
        if status == Status::Pending {
            warn!(test_case = identifier, "status cannot be reset to Pending");
            return false;
        }
        let mut table = self.lock();
        let Some(case) = table.get_mut(identifier) else {
            warn!(test_case = identifier, "missing test case, status update ignored");
            return false;
        };
        case.status = status;
        case.duration = Some(
            ended_at
                .signed_duration_since(case.started)
                .num_milliseconds()
                .unsigned_abs(),
        );
        true
    }

    /// Materializes all evidence, appends one report row per identifier and
    /// rewrites the report. The table is emptied first, so it is empty
    /// afterwards whatever the outcome.
    ///
    /// Failing to render or write a single artifact is logged and leaves that
    /// entry without a `resource`. An unreadable report aborts the flush.
    pub fn flush(&self) -> Result<FlushSummary> {
        let cases = self.lock().take();
        if !self.config.enabled || cases.is_empty() {
            debug!(collector = %self.id, "nothing to flush");
            return Ok(FlushSummary::default());
        }

        let mut report = self.store.read()?;
        let title = report.title.clone();
        let mut summary = FlushSummary::default();

        for case in &cases {
            for id in case.key.ids() {
                let evidence = case
                    .evidence_for(id)
                    .map(|ev| self.materialize(ev, &title, &mut summary))
                    .collect();
                report.tests.push(ReportRow {
                    id: id.clone(),
                    status: case.status,
                    duration: case.duration.unwrap_or(0),
                    date: case.started,
                    evidence,
                });
                summary.rows += 1;
            }
        }

        self.store.write(&report)?;
        info!(
            collector = %self.id,
            rows = summary.rows,
            artifacts = summary.artifacts,
            failed = summary.failed_artifacts,
            report = %self.store.report_path().display(),
            "evidence report written"
        );
        Ok(summary)
    }

    fn materialize(
        &self,
        evidence: &Evidence,
        title: &str,
        summary: &mut FlushSummary,
    ) -> MaterializedEvidence {
        let written = self
            .renderer
            .materialize(evidence, title)
            .and_then(|art| self.store.write_artifact(&art.file_name, &art.bytes));
        match written {
            Ok(path) => {
                summary.artifacts += 1;
                evidence.materialize(Some(path.display().to_string()))
            }
            Err(e) => {
                summary.failed_artifacts += 1;
                warn!(
                    identifier = %evidence.identifier,
                    description = %evidence.description,
                    error = %e,
                    "failed to materialize evidence"
                );
                evidence.materialize(None)
            }
        }
    }
}

// =============================================================================
// PROCESS-WIDE INSTANCE
// =============================================================================

static GLOBAL: OnceCell<Arc<Collector>> = OnceCell::new();

/// Creates the process-wide collector.
///
/// Calling it again with an equal configuration returns the existing instance;
/// a different configuration fails with `AlreadyInitialized`.
pub fn init(config: CollectorConfig) -> Result<Arc<Collector>> {
    let collector = GLOBAL.get_or_try_init(|| Collector::new(config.clone()).map(Arc::new))?;
    if collector.config != config {
        return Err(CollectorError::AlreadyInitialized);
    }
    Ok(collector.clone())
}

/// The process-wide collector created by [`init`].
pub fn global() -> Result<Arc<Collector>> {
    GLOBAL.get().cloned().ok_or(CollectorError::NotInitialized)
}
