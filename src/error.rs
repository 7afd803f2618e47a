use std::fmt::Display;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SortieError {
    /// Malformed document, patch, or template content. The message always
    /// carries the logical name of the document being processed.
    #[error("{0}")]
    InvalidDocument(String),

    #[error("'{field}' not found in {document}")]
    MissingField {
        document: &'static str,
        field: String,
    },

    #[error("{kind} not found: {path}")]
    NotFound { kind: &'static str, path: String },

    #[error("failed to call {operation}: {detail}")]
    RemoteCall { operation: String, detail: String },

    #[error("task ID not found")]
    TaskIdNotFound,

    #[error("{command} failed: {detail}")]
    Subprocess { command: String, detail: String },

    #[error("failed to evaluate jsonnet: {0}")]
    Jsonnet(String),

    #[error("interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),

    #[error("{0}")]
    Other(String),
}

impl SortieError {
    /// Wrap a patch failure with the logical document name, e.g.
    /// "failed to patch ECS container definition: ...".
    pub fn patch(document: &str, reason: impl Display) -> Self {
        Self::InvalidDocument(format!("failed to patch {document}: {reason}"))
    }

    /// Wrap a load failure with the logical document name and the
    /// attempted path.
    pub fn load(document: &str, path: &Path, reason: impl Display) -> Self {
        Self::InvalidDocument(format!(
            "failed to load {document}: {reason}: {}",
            path.display()
        ))
    }
}

pub type Result<T> = std::result::Result<T, SortieError>;
