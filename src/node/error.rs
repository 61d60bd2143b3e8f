//! Error types for the chunking and assembly pipeline.

use std::path::PathBuf;

/// Errors that abort a chunking, ingest or assembly operation.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    /// The input file does not exist.
    #[error("input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A chunk size of zero was configured.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    /// The logical file name would escape the output directory.
    #[error("unusable file name {0:?}")]
    InvalidFileName(String),

    /// An upload carried no bytes.
    #[error("no file uploaded")]
    EmptyInput,

    /// Metadata could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Unexpected filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons an assembly is rejected without raising an error.
///
/// These are expected validation failures: the caller sees a failed
/// [`AssemblyOutcome`](crate::node::assembler::AssemblyOutcome) rather than an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyFailure {
    /// No metadata file at the given path.
    #[error("metadata file not found: {}", .0.display())]
    MetadataNotFound(PathBuf),

    /// The metadata file did not parse into well-formed metadata.
    #[error("malformed metadata: {reason}")]
    Malformed {
        /// What was wrong with it.
        reason: String,
    },

    /// A chunk referenced by the metadata is absent.
    #[error("missing chunk {index}: {}", .path.display())]
    MissingChunk {
        /// Zero-based chunk index.
        index: usize,
        /// Where the chunk was expected.
        path: PathBuf,
    },

    /// A chunk file is longer than the recorded chunk size.
    #[error("chunk {index} is {size} bytes, larger than chunk size {limit}")]
    OversizedChunk { index: usize, size: u64, limit: u64 },

    /// A chunk's digest differs from the recorded one.
    #[error("chunk {index} is corrupted: expected {expected}, got {actual}")]
    IntegrityMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    /// The assembled file has the wrong length.
    #[error("file size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// Errors from reading a persisted metadata file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("metadata file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed metadata: {0}")]
    Malformed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
