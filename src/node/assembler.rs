//! Verified reassembly of chunked files.
//!
//! Every chunk is checked against its recorded digest before the output file
//! is opened, so a single bad chunk means no output at all. The only failure
//! that can leave a file behind is the final size check.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use crate::node::error::{AssemblyFailure, ChunkError, LoadError};
use crate::node::events::{Operation, PipelineEvent, PipelineObserver, TracingObserver};
use crate::node::metadata::Metadata;
use crate::node::storage_manager;
use crate::node::utils;

/// Result of an assembly that did not hit an unexpected I/O error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// The output file was written and has the recorded size.
    Assembled { size: u64 },
    Failed(AssemblyFailure),
}

impl AssemblyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AssemblyOutcome::Assembled { .. })
    }

    pub fn failure(&self) -> Option<&AssemblyFailure> {
        match self {
            AssemblyOutcome::Failed(failure) => Some(failure),
            AssemblyOutcome::Assembled { .. } => None,
        }
    }
}

/// Result of checking chunks without producing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified(Metadata),
    Rejected(AssemblyFailure),
}

pub struct Assembler {
    observer: Arc<dyn PipelineObserver>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Load the metadata at `metadata_path` and check every chunk next to it.
    pub async fn verify_chunks(&self, metadata_path: &Path) -> Result<Verification, ChunkError> {
        self.observer.on_event(&PipelineEvent::Started {
            operation: Operation::Verify,
            target: metadata_path.to_path_buf(),
        });

        let verified = self.load_and_verify(metadata_path).await;
        match verified {
            Ok(Ok(metadata)) => {
                self.observer.on_event(&PipelineEvent::Completed {
                    operation: Operation::Verify,
                    chunk_count: metadata.chunk_count(),
                    total_size: metadata.total_size,
                });
                Ok(Verification::Verified(metadata))
            }
            Ok(Err(failure)) => {
                self.report_failure(Operation::Verify, &failure.to_string());
                Ok(Verification::Rejected(failure))
            }
            Err(e) => {
                self.report_failure(Operation::Verify, &e.to_string());
                Err(e)
            }
        }
    }

    /// Rebuild the file described by `metadata_path` into `output_path`.
    ///
    /// Chunks are looked up in the directory holding the metadata file.
    /// Validation failures come back as [`AssemblyOutcome::Failed`]; only
    /// unexpected I/O errors are returned as `Err`.
    pub async fn assemble_file(
        &self,
        metadata_path: &Path,
        output_path: &Path,
    ) -> Result<AssemblyOutcome, ChunkError> {
        self.observer.on_event(&PipelineEvent::Started {
            operation: Operation::Assemble,
            target: output_path.to_path_buf(),
        });

        match self.run(metadata_path, output_path).await {
            Ok(AssemblyOutcome::Failed(failure)) => {
                self.report_failure(Operation::Assemble, &failure.to_string());
                Ok(AssemblyOutcome::Failed(failure))
            }
            Ok(assembled) => Ok(assembled),
            Err(e) => {
                self.report_failure(Operation::Assemble, &e.to_string());
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        metadata_path: &Path,
        output_path: &Path,
    ) -> Result<AssemblyOutcome, ChunkError> {
        let metadata = match self.load_and_verify(metadata_path).await? {
            Ok(metadata) => metadata,
            Err(failure) => return Ok(AssemblyOutcome::Failed(failure)),
        };
        let chunk_dir = chunk_directory(metadata_path);

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut output = tokio::fs::File::create(output_path).await?;
        for index in 0..metadata.chunk_count() {
            let chunk_path = metadata.chunk_path(&chunk_dir, index);
            let Some(chunk_data) = storage_manager::load_chunk(&chunk_path).await? else {
                return Ok(AssemblyOutcome::Failed(AssemblyFailure::MissingChunk {
                    index,
                    path: chunk_path,
                }));
            };
            output.write_all(&chunk_data).await?;
            self.observer.on_event(&PipelineEvent::ChunkAppended { index });
        }
        output.flush().await?;
        drop(output);

        let actual = tokio::fs::metadata(output_path).await?.len();
        if actual != metadata.total_size {
            return Ok(AssemblyOutcome::Failed(AssemblyFailure::SizeMismatch {
                expected: metadata.total_size,
                actual,
            }));
        }

        self.observer.on_event(&PipelineEvent::Completed {
            operation: Operation::Assemble,
            chunk_count: metadata.chunk_count(),
            total_size: actual,
        });
        Ok(AssemblyOutcome::Assembled { size: actual })
    }

    async fn load_and_verify(
        &self,
        metadata_path: &Path,
    ) -> Result<Result<Metadata, AssemblyFailure>, ChunkError> {
        let metadata = match Metadata::load(metadata_path).await {
            Ok(metadata) => metadata,
            Err(LoadError::NotFound(path)) => {
                return Ok(Err(AssemblyFailure::MetadataNotFound(path)))
            }
            Err(LoadError::Malformed(reason)) => {
                return Ok(Err(AssemblyFailure::Malformed { reason }))
            }
            Err(LoadError::Io(e)) => return Err(e.into()),
        };
        let chunk_dir = chunk_directory(metadata_path);

        for (index, expected) in metadata.chunk_hashes.iter().enumerate() {
            let chunk_path = metadata.chunk_path(&chunk_dir, index);
            let Some(size) = storage_manager::chunk_len(&chunk_path).await? else {
                return Ok(Err(AssemblyFailure::MissingChunk {
                    index,
                    path: chunk_path,
                }));
            };
            if size > metadata.chunk_size {
                return Ok(Err(AssemblyFailure::OversizedChunk {
                    index,
                    size,
                    limit: metadata.chunk_size,
                }));
            }

            let Some(chunk_data) = storage_manager::load_chunk(&chunk_path).await? else {
                return Ok(Err(AssemblyFailure::MissingChunk {
                    index,
                    path: chunk_path,
                }));
            };

            let actual = utils::hash_data(&chunk_data);
            if actual != *expected {
                return Ok(Err(AssemblyFailure::IntegrityMismatch {
                    index,
                    expected: expected.clone(),
                    actual,
                }));
            }
            self.observer.on_event(&PipelineEvent::ChunkVerified { index });
        }

        Ok(Ok(metadata))
    }

    fn report_failure(&self, operation: Operation, reason: &str) {
        self.observer.on_event(&PipelineEvent::Failed {
            operation,
            reason: reason.to_string(),
        });
    }
}

/// Chunks always live next to their metadata file.
fn chunk_directory(metadata_path: &Path) -> PathBuf {
    metadata_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}
