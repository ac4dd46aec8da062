use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::tokenizer::ParseError;

/// Result type alias for document and file operations
pub type Result<T> = std::result::Result<T, XmlError>;

/// Failures of the document load/save surface
#[derive(Debug, Error)]
pub enum XmlError {
    /// File not found or unreadable
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File could not be created or written
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Bytes do not match the encoding, or text cannot be represented in it
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Malformed XML
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl XmlError {
    /// True for failures of the underlying file rather than its content
    pub fn is_io(&self) -> bool {
        matches!(self, XmlError::Open { .. } | XmlError::Write { .. })
    }
}
