//! Error types for the evidence collector.
//!
//! Every failure the collector can surface is a [`CollectorError`]. Most
//! conditions met during a test run are *not* errors: untracked tests, captures
//! without a current test and failed artifact renders are logged and skipped so
//! evidence collection never fails a test. What remains here are configuration
//! problems, misuse of the process-wide instance, and report-file corruption.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = CollectorError> = std::result::Result<T, E>;

/// Type-safe classification of [`CollectorError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    AlreadyInitialized,
    NotInitialized,
    InvalidPattern,
    Config,
    Io,
    Decode,
    Encode,
    Render,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::AlreadyInitialized => "AlreadyInitialized",
            ErrorKind::NotInitialized => "NotInitialized",
            ErrorKind::InvalidPattern => "InvalidPattern",
            ErrorKind::Config => "Config",
            ErrorKind::Io => "Io",
            ErrorKind::Decode => "Decode",
            ErrorKind::Encode => "Encode",
            ErrorKind::Render => "Render",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum CollectorError {
    #[error("evidence collector already initialized with a different configuration")]
    #[diagnostic(
        code(evidence::collector::already_initialized),
        help("initialize the collector once per process; use `collector::global()` afterwards")
    )]
    AlreadyInitialized,

    #[error("evidence collector has not been initialized")]
    #[diagnostic(
        code(evidence::collector::not_initialized),
        help("call `collector::init(config)` before requesting the global collector")
    )]
    NotInitialized,

    #[error("invalid identifier pattern '{pattern}'")]
    #[diagnostic(code(evidence::config::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {message}")]
    #[diagnostic(code(evidence::config::invalid))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("I/O error on '{}'", path.display())]
    #[diagnostic(code(evidence::store::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report file '{}' is unreadable: {reason}", path.display())]
    #[diagnostic(
        code(evidence::store::decode),
        help("the report is not overwritten; repair or remove it before the next run")
    )]
    Decode {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("failed to serialize {what}")]
    #[diagnostic(code(evidence::store::encode))]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to render artifact '{file_name}': {message}")]
    #[diagnostic(code(evidence::render::failed))]
    Render { file_name: String, message: String },
}

impl CollectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectorError::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            CollectorError::NotInitialized => ErrorKind::NotInitialized,
            CollectorError::InvalidPattern { .. } => ErrorKind::InvalidPattern,
            CollectorError::Config { .. } => ErrorKind::Config,
            CollectorError::Io { .. } => ErrorKind::Io,
            CollectorError::Decode { .. } => ErrorKind::Decode,
            CollectorError::Encode { .. } => ErrorKind::Encode,
            CollectorError::Render { .. } => ErrorKind::Render,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CollectorError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(message: impl Into<String>, help: Option<String>) -> Self {
        CollectorError::Config {
            message: message.into(),
            help,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = CollectorError::config("bad", None);
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.kind().to_string(), "Config");
        assert_eq!(CollectorError::AlreadyInitialized.kind(), ErrorKind::AlreadyInitialized);
    }

    #[test]
    fn test_diagnostic_code_is_stable() {
        let err = CollectorError::NotInitialized;
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("evidence::collector::not_initialized"));
    }

    #[test]
    fn test_io_error_mentions_path() {
        let err = CollectorError::io(
            "out/results.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("out/results.json"));
    }
}
