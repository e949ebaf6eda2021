//! Evidence values.
//!
//! An [`Evidence`] is captured once and never mutated. Flushing derives a
//! [`MaterializedEvidence`] from it, which references the written artifact
//! file instead of carrying the raw payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceKind {
    Text,
    Image,
    Error,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Text => "Text",
            EvidenceKind::Image => "Image",
            EvidenceKind::Error => "Error",
        }
    }

    /// Extension of the artifact file written for this kind.
    pub fn extension(&self) -> &'static str {
        match self {
            EvidenceKind::Text => "txt",
            EvidenceKind::Image | EvidenceKind::Error => "png",
        }
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was captured.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(Value),
    Image(Value),
    Error {
        message: String,
        stack: Option<String>,
    },
}

impl Payload {
    pub fn kind(&self) -> EvidenceKind {
        match self {
            Payload::Text(_) => EvidenceKind::Text,
            Payload::Image(_) => EvidenceKind::Image,
            Payload::Error { .. } => EvidenceKind::Error,
        }
    }
}

/// A capture request before it is bound to a test case.
///
/// `identifier` selects one sub-identifier of a composite case. When it is
/// `None` the evidence belongs to every sub-identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceDraft {
    pub identifier: Option<String>,
    pub description: String,
    pub payload: Payload,
}

impl EvidenceDraft {
    pub fn text(description: impl Into<String>, data: Value) -> Self {
        Self {
            identifier: None,
            description: description.into(),
            payload: Payload::Text(data),
        }
    }

    pub fn image(description: impl Into<String>, data: Value) -> Self {
        Self {
            identifier: None,
            description: description.into(),
            payload: Payload::Image(data),
        }
    }

    pub fn error(message: impl Into<String>, stack: Option<String>) -> Self {
        let message = message.into();
        Self {
            identifier: None,
            description: message.clone(),
            payload: Payload::Error { message, stack },
        }
    }

    pub fn with_identifier(mut self, identifier: Option<impl Into<String>>) -> Self {
        self.identifier = identifier.map(Into::into);
        self
    }
}

/// Captured evidence bound to one sub-identifier of a test case.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub identifier: String,
    pub description: String,
    /// Microseconds since the Unix epoch; unique per collector.
    pub collected_at: i64,
    pub payload: Payload,
}

impl Evidence {
    pub fn kind(&self) -> EvidenceKind {
        self.payload.kind()
    }

    /// Builds the report entry for this evidence. `resource` is `None` when the
    /// artifact could not be produced.
    pub fn materialize(&self, resource: Option<String>) -> MaterializedEvidence {
        let (message, stack) = match &self.payload {
            Payload::Error { message, stack } => (Some(message.clone()), stack.clone()),
            _ => (None, None),
        };
        MaterializedEvidence {
            identifier: self.identifier.clone(),
            description: self.description.clone(),
            collected_at: self.collected_at,
            kind: self.kind(),
            resource,
            message,
            stack,
        }
    }
}

/// Evidence as stored in the report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedEvidence {
    pub identifier: String,
    pub description: String,
    pub collected_at: i64,
    #[serde(rename = "type")]
    pub kind: EvidenceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}
