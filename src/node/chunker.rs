//! Fixed-size chunker that writes content-addressed chunk files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::node::error::ChunkError;
use crate::node::events::{Operation, PipelineEvent, PipelineObserver, TracingObserver};
use crate::node::metadata::{self, Metadata};
use crate::node::storage_manager;
use crate::node::utils;

pub const CHUNK_SIZE: usize = 1_024 * 1_024; // 1 MB

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Everything one chunking run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    pub metadata: Metadata,
    pub chunk_directory: PathBuf,
    /// Index-aligned with `metadata.chunk_hashes`.
    pub chunk_files: Vec<PathBuf>,
    pub metadata_file_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl ChunkResult {
    pub fn total_chunks(&self) -> usize {
        self.chunk_files.len()
    }
}

/// Splits files into `chunk_size` windows; only the last chunk may be shorter.
/// An empty input produces zero chunks and a metadata file with no hashes.
pub struct Chunker {
    chunk_size: usize,
    observer: Arc<dyn PipelineObserver>,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkError> {
        if config.chunk_size == 0 {
            return Err(ChunkError::InvalidChunkSize);
        }
        Ok(Self {
            chunk_size: config.chunk_size,
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk `input_path` into `output_dir`, naming chunks after the input's
    /// file stem.
    pub async fn create_chunks(
        &self,
        input_path: &Path,
        output_dir: &Path,
    ) -> Result<ChunkResult, ChunkError> {
        let file_name = input_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.create_chunks_named(input_path, output_dir, &file_name)
            .await
    }

    /// Like [`Chunker::create_chunks`] but with an explicit logical name.
    pub async fn create_chunks_named(
        &self,
        input_path: &Path,
        output_dir: &Path,
        file_name: &str,
    ) -> Result<ChunkResult, ChunkError> {
        self.observer.on_event(&PipelineEvent::Started {
            operation: Operation::Chunk,
            target: input_path.to_path_buf(),
        });

        match self.run(input_path, output_dir, file_name).await {
            Ok(result) => {
                self.observer.on_event(&PipelineEvent::Completed {
                    operation: Operation::Chunk,
                    chunk_count: result.total_chunks(),
                    total_size: result.metadata.total_size,
                });
                Ok(result)
            }
            Err(e) => {
                self.observer.on_event(&PipelineEvent::Failed {
                    operation: Operation::Chunk,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        input_path: &Path,
        output_dir: &Path,
        file_name: &str,
    ) -> Result<ChunkResult, ChunkError> {
        match tokio::fs::metadata(input_path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChunkError::NotFound(input_path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        }
        if !metadata::is_safe_file_name(file_name) {
            return Err(ChunkError::InvalidFileName(file_name.to_string()));
        }

        tokio::fs::create_dir_all(output_dir).await?;

        let mut file = tokio::fs::File::open(input_path).await?;
        let mut metadata = Metadata::new(file_name, self.chunk_size as u64);
        let mut chunk_files = Vec::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let bytes_read = read_window(&mut file, &mut buffer).await?;
            if bytes_read == 0 {
                break;
            }

            let index = chunk_files.len();
            let chunk = &buffer[..bytes_read];
            let chunk_filename = metadata::chunk_file_name(file_name, index);
            let chunk_path =
                storage_manager::save_chunk(chunk, output_dir, &chunk_filename).await?;

            let digest = utils::hash_data(chunk);
            self.observer.on_event(&PipelineEvent::ChunkCreated {
                index,
                size: bytes_read,
                digest: digest.clone(),
            });

            metadata.chunk_hashes.push(digest);
            metadata.total_size += bytes_read as u64;
            chunk_files.push(chunk_path);
        }

        let metadata_file_path = metadata.save(output_dir).await?;

        Ok(ChunkResult {
            metadata,
            chunk_directory: output_dir.to_path_buf(),
            chunk_files,
            metadata_file_path,
            created_at: Utc::now(),
        })
    }
}

/// Fill `buf` completely unless EOF comes first. Returns the bytes read.
async fn read_window(
    reader: &mut (impl AsyncRead + Unpin),
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
