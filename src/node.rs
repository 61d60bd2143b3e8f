//! Local node: the ingestion and assembly-request layers over the chunk store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{info, warn};

pub mod assembler;
pub mod chunker;
pub mod error;
pub mod events;
pub mod metadata;
pub mod peer_registry;
pub mod storage_manager;
pub mod utils;

use assembler::{Assembler, AssemblyOutcome, Verification};
use chunker::{ChunkResult, Chunker, ChunkerConfig, CHUNK_SIZE};
use error::{AssemblyFailure, ChunkError};
use events::PipelineObserver;

const SELF_TEST_CONTENT: &str = "This is a test file for P2P file sharing. \
It contains some sample data to verify the chunking functionality works correctly.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Every ingest lands in its own directory under this root.
    pub store_root: PathBuf,
    pub chunk_size: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            store_root: default_store_root(),
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// `$XDG_DATA_HOME/p2p_share/chunks` or the platform equivalent, else a temp dir.
pub fn default_store_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("p2p_share").join("chunks"))
        .unwrap_or_else(|| std::env::temp_dir().join("p2p_chunks"))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub original_file_name: String,
    pub file_size: u64,
    pub result: ChunkResult,
}

#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub outcome: AssemblyOutcome,
    /// Size of the file this attempt wrote, if it wrote one.
    pub output_size: Option<u64>,
}

impl AssemblyReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

#[derive(Debug, Clone)]
pub struct SelfTestReport {
    pub test_file_size: u64,
    pub result: ChunkResult,
    pub assembly: AssemblyReport,
    pub round_trip_matches: bool,
}

pub struct Node {
    config: NodeConfig,
    chunker: Chunker,
    assembler: Assembler,
}

impl Node {
    pub fn new(config: NodeConfig) -> Result<Self, ChunkError> {
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: config.chunk_size,
        })?;
        Ok(Self {
            config,
            chunker,
            assembler: Assembler::new(),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.chunker = self.chunker.with_observer(observer.clone());
        self.assembler = self.assembler.with_observer(observer);
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Ingest a local file into a fresh upload directory under the store root.
    pub async fn ingest_file(&self, input_path: &Path) -> Result<IngestReport, ChunkError> {
        let file = match tokio::fs::File::open(input_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChunkError::NotFound(input_path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let original_file_name = input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ingest(&original_file_name, file).await
    }

    /// Stage an upload to a temp file, then chunk it under the store root.
    ///
    /// Chunks are named after `original_file_name` without its extension.
    pub async fn ingest(
        &self,
        original_file_name: &str,
        upload: impl AsyncRead + Unpin,
    ) -> Result<IngestReport, ChunkError> {
        self.ingest_into(&self.config.store_root, original_file_name, upload)
            .await
    }

    async fn ingest_into(
        &self,
        root: &Path,
        original_file_name: &str,
        mut upload: impl AsyncRead + Unpin,
    ) -> Result<IngestReport, ChunkError> {
        let file_name = Path::new(original_file_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let staged = tempfile::NamedTempFile::new()?;
        let mut staging = tokio::fs::File::from_std(staged.reopen()?);
        let file_size = tokio::io::copy(&mut upload, &mut staging).await?;
        staging.flush().await?;
        drop(staging);

        if file_size == 0 {
            return Err(ChunkError::EmptyInput);
        }

        let output_dir = root.join(utils::random_id());
        let result = self
            .chunker
            .create_chunks_named(staged.path(), &output_dir, &file_name)
            .await?;

        if let Err(e) = staged.close() {
            warn!(error = %e, "could not remove staged upload");
        }

        info!(
            file = original_file_name,
            size = file_size,
            chunks = result.total_chunks(),
            dir = %output_dir.display(),
            "file chunked successfully"
        );

        Ok(IngestReport {
            original_file_name: original_file_name.to_string(),
            file_size,
            result,
        })
    }

    /// Verify and rebuild a file, reporting the outcome and the output size.
    pub async fn assemble(
        &self,
        metadata_path: &Path,
        output_path: &Path,
    ) -> Result<AssemblyReport, ChunkError> {
        let outcome = self
            .assembler
            .assemble_file(metadata_path, output_path)
            .await?;
        // Only these outcomes wrote the file now at `output_path`.
        let output_size = match &outcome {
            AssemblyOutcome::Assembled { size } => Some(*size),
            AssemblyOutcome::Failed(AssemblyFailure::SizeMismatch { actual, .. }) => Some(*actual),
            AssemblyOutcome::Failed(_) => None,
        };
        Ok(AssemblyReport {
            outcome,
            output_size,
        })
    }

    pub async fn verify(&self, metadata_path: &Path) -> Result<Verification, ChunkError> {
        self.assembler.verify_chunks(metadata_path).await
    }

    /// Chunk a small built-in sample and assemble it back.
    pub async fn self_test(&self) -> Result<SelfTestReport, ChunkError> {
        let root = self.config.store_root.join("selftest");
        let ingest = self
            .ingest_into(&root, "selftest.txt", SELF_TEST_CONTENT.as_bytes())
            .await?;

        let output_path = ingest.result.chunk_directory.join("selftest.restored");
        let assembly = self
            .assemble(&ingest.result.metadata_file_path, &output_path)
            .await?;

        let round_trip_matches = assembly.is_success()
            && tokio::fs::read(&output_path).await? == SELF_TEST_CONTENT.as_bytes();

        Ok(SelfTestReport {
            test_file_size: ingest.file_size,
            result: ingest.result,
            assembly,
            round_trip_matches,
        })
    }
}
