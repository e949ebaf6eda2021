//! Output file store.
//!
//! Owns the report file at `<folder>/<file>` and the artifact files written
//! next to it. The report is always read whole and rewritten whole; two
//! processes targeting the same report path will lose each other's rows, so
//! every worker needs its own output file.

pub mod fs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::OutputConfig;
use crate::errors::{CollectorError, Result};
use crate::report::OutputResult;

pub use fs::{FileSystem, MemoryFileSystem, StdFileSystem};

#[derive(Debug, Clone)]
pub struct OutputStore {
    fs: Arc<dyn FileSystem>,
    folder: PathBuf,
    file: String,
}

impl OutputStore {
    pub fn new(fs: Arc<dyn FileSystem>, output: &OutputConfig) -> Self {
        Self {
            fs,
            folder: output.folder.clone(),
            file: output.file.clone(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn report_path(&self) -> PathBuf {
        self.folder.join(&self.file)
    }

    /// Creates the output folder and an empty report titled after `header`.
    /// An existing report is left untouched. Returns whether a report was created.
    pub fn ensure_initialized(&self, header: &str) -> Result<bool> {
        if !self.fs.exists(&self.folder) {
            self.fs
                .create_dir_all(&self.folder)
                .map_err(|e| CollectorError::io(&self.folder, e))?;
            debug!(folder = %self.folder.display(), "created output folder");
        }
        let path = self.report_path();
        if self.fs.exists(&path) {
            return Ok(false);
        }
        let initial = OutputResult::new(OutputResult::title_for(header, Utc::now()));
        self.write(&initial)?;
        debug!(path = %path.display(), "created report file");
        Ok(true)
    }

    pub fn read(&self) -> Result<OutputResult> {
        let path = self.report_path();
        let content = self.fs.read_to_string(&path).map_err(|e| CollectorError::Decode {
            path: path.clone(),
            reason: e.to_string(),
            source: None,
        })?;
        serde_json::from_str(&content).map_err(|e| CollectorError::Decode {
            path,
            reason: "content does not match the report schema".to_string(),
            source: Some(e),
        })
    }

    /// Overwrites the report with `content`, pretty-printed.
    pub fn write(&self, content: &OutputResult) -> Result<()> {
        let path = self.report_path();
        let json = serde_json::to_string_pretty(content).map_err(|e| CollectorError::Encode {
            what: "report",
            source: e,
        })?;
        self.fs
            .write(&path, json.as_bytes())
            .map_err(|e| CollectorError::io(&path, e))
    }

    /// Writes an artifact next to the report and returns its path.
    pub fn write_artifact(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.folder.join(file_name);
        self.fs
            .write(&path, bytes)
            .map_err(|e| CollectorError::io(&path, e))?;
        Ok(path)
    }
}
