//! Artifact rendering.
//!
//! [`ArtifactRenderer`] turns one [`Evidence`] into the bytes and file name of
//! its artifact. Text is written as-is (structured data pretty-printed);
//! images and errors go through a [`RenderBackend`].

pub mod bitmap;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{CollectorError, Result};
use crate::evidence::{Evidence, EvidenceKind, Payload};

pub use bitmap::BitmapRenderer;

pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Turns a titled body of text into encoded image bytes.
pub trait RenderBackend: Send + Sync + fmt::Debug {
    fn render(&self, title: &str, body: &str, is_error: bool) -> Result<Vec<u8>, BackendError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ArtifactRenderer {
    backend: Arc<dyn RenderBackend>,
}

impl Default for ArtifactRenderer {
    fn default() -> Self {
        Self::new(Arc::new(BitmapRenderer))
    }
}

impl ArtifactRenderer {
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self { backend }
    }

    /// `<identifier>-data<Kind>-<collectedAt>.<ext>`; characters that are not
    /// safe in a file name are replaced by `_`.
    pub fn file_name(identifier: &str, kind: EvidenceKind, collected_at: i64) -> String {
        let safe: String = identifier
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "{}-data{}-{}.{}",
            safe,
            kind.as_str(),
            collected_at,
            kind.extension()
        )
    }

    /// Renders `evidence`; `title` is the report title shown in image headers.
    pub fn materialize(&self, evidence: &Evidence, title: &str) -> Result<RenderedArtifact> {
        let file_name =
            Self::file_name(&evidence.identifier, evidence.kind(), evidence.collected_at);
        let header = format!("Test Cycle: {title}");
        let bytes = match &evidence.payload {
            Payload::Text(data) => display_value(data).into_bytes(),
            Payload::Image(data) => self
                .backend
                .render(&header, &display_value(data), false)
                .map_err(|e| CollectorError::Render {
                    file_name: file_name.clone(),
                    message: e.to_string(),
                })?,
            Payload::Error { message, stack } => {
                let body = match stack {
                    Some(stack) => format!("{message}\n\n{stack}"),
                    None => message.clone(),
                };
                self.backend
                    .render(&header, &body, true)
                    .map_err(|e| CollectorError::Render {
                        file_name: file_name.clone(),
                        message: e.to_string(),
                    })?
            }
        };
        Ok(RenderedArtifact { file_name, bytes })
    }
}

/// Strings verbatim, everything else as pretty JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
