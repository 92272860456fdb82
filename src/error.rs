//! Error types for PDF decompression

use std::io;
use thiserror::Error;

/// Error type for PDF decompression operations
#[derive(Error, Debug)]
pub enum DecompressError {
    /// The input could not be loaded by the reader
    #[error("Failed to load PDF: {0}")]
    Load(String),

    /// Encrypted documents are not handled
    #[error("Encrypted documents are not supported")]
    Encrypted,

    /// The trailer has no usable `Root` entry
    #[error("Document has no catalog")]
    MissingCatalog,

    /// The catalog resolved to something other than a dictionary
    #[error("Catalog is not a dictionary (found {0})")]
    InvalidCatalog(&'static str),

    /// The reader handed back a node kind outside the recognized set
    #[error("Unexpected object kind from reader: {0}")]
    UnexpectedKind(String),

    /// Serial numbers and recorded body offsets disagree
    #[error("Cross-reference table inconsistent: {0}")]
    OffsetTable(String),

    /// A writer operation was issued out of order
    #[error("Writer is in state {found}, expected {expected}")]
    WriterState {
        expected: &'static str,
        found: &'static str,
    },

    /// IO error on the output sink
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for decompression operations
pub type Result<T> = std::result::Result<T, DecompressError>;

impl DecompressError {
    /// Create a new offset table error
    pub fn offset_table(msg: impl Into<String>) -> Self {
        Self::OffsetTable(msg.into())
    }

    /// Check if the error points at a broken internal contract rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedKind(_) | Self::OffsetTable(_) | Self::WriterState { .. }
        )
    }
}
