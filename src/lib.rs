//! Test evidence collection.
//!
//! Tests capture text, images and errors while they run; the [`Collector`]
//! groups that evidence per test-case identifier and, at the end of the run,
//! writes artifact files plus a JSON report into the configured output folder.
//!
//! Only one process should write a given report file: the report is
//! read, extended and rewritten whole, so concurrent writers lose rows.
//! Give each worker its own `output.file`.

pub use crate::collector::{Collector, FlushSummary, TestCase};
pub use crate::config::{CollectorConfig, OutputConfig};
pub use crate::environment::{EvidenceContext, EvidenceEnvironment, TestEvent};
pub use crate::errors::{CollectorError, ErrorKind, Result};
pub use crate::evidence::{Evidence, EvidenceDraft, EvidenceKind, MaterializedEvidence, Payload};
pub use crate::identifiers::{CaseKey, IdentifierExtractor};
pub use crate::report::{OutputResult, ReportRow, Status};

pub mod cli;
pub mod clock;
pub mod collector;
pub mod config;
pub mod environment;
pub mod errors;
pub mod evidence;
pub mod identifiers;
pub mod render;
pub mod report;
pub mod store;
