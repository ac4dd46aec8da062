//! Encoding-aware File Base
//!
//! Whole-buffer read and write of text files. Decoding and encoding are
//! delegated to [`crate::core::encoding`].

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::core::encoding::{self, FileEncoding};
use crate::error::{Result, XmlError};

/// Reads and writes text files in one configured encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextFile {
    encoding: FileEncoding,
}

impl TextFile {
    pub fn new(encoding: FileEncoding) -> Self {
        TextFile { encoding }
    }

    pub fn encoding(&self) -> FileEncoding {
        self.encoding
    }

    pub fn set_encoding(&mut self, encoding: FileEncoding) {
        self.encoding = encoding;
    }

    /// Read a whole file. A byte order mark overrides the configured encoding.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| XmlError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), encoding = %self.encoding, "read file");
        encoding::decode(&bytes, self.encoding).map_err(XmlError::Encoding)
    }

    /// Replace a file's contents with `text`
    pub fn write_str(&self, path: impl AsRef<Path>, text: &str) -> Result<()> {
        let path = path.as_ref();
        let bytes = encoding::encode(text, self.encoding).map_err(XmlError::Encoding)?;
        fs::write(path, &bytes).map_err(|source| XmlError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), encoding = %self.encoding, "wrote file");
        Ok(())
    }
}
