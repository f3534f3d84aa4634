//! The shared error taxonomy for every conversion stage.
//!
//! Single-file operations return these directly; the batch orchestrator
//! catches them per file and downgrades them to recorded failures
//! (see [`crate::batch`]). Every variant names the offending path or
//! format so a failure is always attributable to a specific file and
//! stage.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("input not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("cannot convert {from} to {to}")]
    UnsupportedPair { from: String, to: String },

    /// An optional codec backend is absent. Always names the backend so
    /// the user knows what to install.
    #[error("{format} support requires {backend}, which is not available")]
    DependencyMissing {
        format: String,
        backend: String,
    },

    /// Container-level metadata corruption only — individual unmappable
    /// tags are dropped silently, never escalated to this.
    #[error("failed to write metadata to {path}: {reason}")]
    MetadataWrite { path: PathBuf, reason: String },

    #[error("page index {index} out of range: document has {page_count} pages")]
    PageIndex { index: usize, page_count: usize },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("PDF error in {path}: {reason}")]
    Pdf { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Short stage/kind label used in batch failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::NotFound(_) => "not-found",
            ConvertError::UnsupportedFormat(_) => "unsupported-format",
            ConvertError::UnsupportedPair { .. } => "unsupported-pair",
            ConvertError::DependencyMissing { .. } => "dependency-missing",
            ConvertError::MetadataWrite { .. } => "metadata-write",
            ConvertError::PageIndex { .. } => "page-index",
            ConvertError::Decode { .. } => "decode",
            ConvertError::Encode { .. } => "encode",
            ConvertError::Pdf { .. } => "pdf",
            ConvertError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_message_names_count() {
        let err = ConvertError::PageIndex {
            index: 5,
            page_count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn dependency_missing_names_backend() {
        let err = ConvertError::DependencyMissing {
            format: "AVIF".into(),
            backend: "a dav1d-based decoder".into(),
        };
        assert!(err.to_string().contains("dav1d"));
        assert_eq!(err.kind(), "dependency-missing");
    }
}
