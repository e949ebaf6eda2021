//! The evidence command-line interface.
//!
//! Entry point for the `evidence` binary: parses arguments, installs the log
//! subscriber and dispatches to the subcommand handlers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use crate::cli::args::{Command, EvidenceArgs};
use crate::collector::Collector;
use crate::config::{CollectorConfig, OutputConfig};
use crate::errors::{CollectorError, Result};
use crate::report::OutputResult;
use crate::store::{OutputStore, StdFileSystem};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    init_tracing();
    let args = EvidenceArgs::parse();
    let choice = output::color_choice(args.no_color);

    let result = match args.command {
        Command::Init { config } => handle_init(&config),
        Command::Summary { report } => handle_summary(&report, choice),
        Command::Verify { report } => handle_verify(&report, choice),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_init(config_path: &Path) -> Result<bool> {
    let config = CollectorConfig::from_path(config_path)?;
    if !config.enabled {
        println!("Evidence collection is disabled; nothing to initialize.");
        return Ok(true);
    }
    let collector = Collector::new(config)?;
    println!("Report ready at {}", collector.report_path().display());
    Ok(true)
}

fn handle_summary(report_path: &Path, choice: termcolor::ColorChoice) -> Result<bool> {
    let report = open_report(report_path)?;
    output::print_summary(&report, choice);
    Ok(true)
}

fn handle_verify(report_path: &Path, choice: termcolor::ColorChoice) -> Result<bool> {
    let report = open_report(report_path)?;
    let verification = verify_report(&report, report_path)?;
    output::print_verification(&verification, choice);
    Ok(verification.is_ok())
}

fn open_report(report_path: &Path) -> Result<OutputResult> {
    let file = report_path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| {
            CollectorError::config(
                format!("'{}' is not a report file path", report_path.display()),
                None,
            )
        })?;
    let output = OutputConfig {
        folder: report_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
        file: file.to_string(),
    };
    OutputStore::new(Arc::new(StdFileSystem), &output).read()
}

// =============================================================================
// VERIFICATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingResource {
    pub test_id: String,
    pub resource: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Verification {
    pub checked: usize,
    pub missing: Vec<MissingResource>,
    /// Files in the report folder that no report entry references.
    pub orphans: Vec<PathBuf>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks every `resource` of `report`. A resource path that does not resolve
/// as recorded is also looked up by file name next to the report, so a report
/// folder that was moved as a whole still verifies.
pub fn verify_report(report: &OutputResult, report_path: &Path) -> Result<Verification> {
    let folder = report_path.parent().unwrap_or_else(|| Path::new(""));
    let folder = if folder.as_os_str().is_empty() {
        Path::new(".")
    } else {
        folder
    };

    let mut verification = Verification::default();
    let mut referenced = HashSet::new();
    for row in &report.tests {
        for ev in &row.evidence {
            let Some(resource) = &ev.resource else {
                continue;
            };
            verification.checked += 1;
            let recorded = PathBuf::from(resource);
            let beside = recorded.file_name().map(|name| folder.join(name));
            if let Some(name) = recorded.file_name() {
                referenced.insert(name.to_os_string());
            }
            let found = recorded.exists() || beside.is_some_and(|p| p.exists());
            if !found {
                verification.missing.push(MissingResource {
                    test_id: row.id.clone(),
                    resource: resource.clone(),
                });
            }
        }
    }

    let report_name = report_path.file_name().map(|n| n.to_os_string());
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| folder.to_path_buf());
            CollectorError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_os_string();
        if Some(&name) == report_name.as_ref() || referenced.contains(&name) {
            continue;
        }
        verification.orphans.push(entry.path().to_path_buf());
    }
    verification.orphans.sort();
    Ok(verification)
}
