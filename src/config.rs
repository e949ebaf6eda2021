//! Collector configuration.
//!
//! The configuration is supplied once per process. Missing keys fall back to
//! the defaults a test runner would use out of the box: collection enabled,
//! report written to `./evidence/results.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{CollectorError, Result};
use crate::identifiers::IdentifierExtractor;

pub const DEFAULT_OUTPUT_FOLDER: &str = "./evidence";
pub const DEFAULT_OUTPUT_FILE: &str = "results.json";

/// Where the report and its artifact files are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub folder: PathBuf,
    pub file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

impl OutputConfig {
    pub fn report_path(&self) -> PathBuf {
        self.folder.join(&self.file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectorConfig {
    pub enabled: bool,
    /// Identifier prefix, e.g. `ABC` for identifiers like `ABC-T12`.
    pub project: Option<String>,
    /// Run header embedded in the report title.
    pub header: String,
    /// Overrides the default `<project>\S+` identifier pattern.
    pub regex: Option<String>,
    pub output: OutputConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            project: None,
            header: String::new(),
            regex: None,
            output: OutputConfig::default(),
        }
    }
}

impl CollectorConfig {
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn with_output(mut self, folder: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        self.output = OutputConfig {
            folder: folder.into(),
            file: file.into(),
        };
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Loads a configuration file. `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| CollectorError::io(path, e))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: CollectorConfig = if is_json {
            serde_json::from_str(&content).map_err(|e| {
                CollectorError::config(
                    format!("failed to parse '{}': {e}", path.display()),
                    Some("expected a JSON object with keys enabled, project, header, regex, output".into()),
                )
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                CollectorError::config(
                    format!("failed to parse '{}': {e}", path.display()),
                    Some("expected a YAML mapping with keys enabled, project, header, regex, output".into()),
                )
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the identifier pattern compiles and the output file name is usable.
    pub fn validate(&self) -> Result<()> {
        if self.output.file.trim().is_empty() {
            return Err(CollectorError::config(
                "output.file must not be empty",
                Some("set output.file, e.g. `results.json`".into()),
            ));
        }
        IdentifierExtractor::from_config(self)?;
        Ok(())
    }
}
