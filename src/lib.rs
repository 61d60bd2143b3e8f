//! Split files into hash-verified chunks and put them back together.

pub mod node;

pub use node::assembler::{Assembler, AssemblyOutcome, Verification};
pub use node::chunker::{ChunkResult, Chunker, ChunkerConfig, CHUNK_SIZE};
pub use node::error::{AssemblyFailure, ChunkError};
pub use node::metadata::Metadata;
pub use node::{Node, NodeConfig};
