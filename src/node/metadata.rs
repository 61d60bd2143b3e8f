//! The persisted description of a chunked file.
//!
//! Metadata is written next to the chunks as `{fileName}.metadata.json` and is
//! enough, together with the directory it lives in, to find, verify and
//! reassemble every chunk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::node::error::{ChunkError, LoadError};
use crate::node::utils;

/// Describes how a file was split.
///
/// The chunk count is always derived from `chunk_hashes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Logical name used to derive chunk file names.
    pub file_name: String,
    /// Exact byte length of the original file.
    pub total_size: u64,
    /// Maximum byte length of a chunk.
    pub chunk_size: u64,
    /// One digest per chunk, index-aligned with chunk position.
    pub chunk_hashes: Vec<String>,
}

impl Metadata {
    pub fn new(file_name: impl Into<String>, chunk_size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            total_size: 0,
            chunk_size,
            chunk_hashes: Vec::new(),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_hashes.len()
    }

    /// Path of chunk `index` inside `dir`.
    pub fn chunk_path(&self, dir: &Path, index: usize) -> PathBuf {
        dir.join(chunk_file_name(&self.file_name, index))
    }

    /// Path of the metadata file inside `dir`.
    pub fn metadata_path(&self, dir: &Path) -> PathBuf {
        dir.join(metadata_file_name(&self.file_name))
    }

    /// Checks the fields a parsed file must satisfy before any chunk is touched.
    pub fn validate(&self) -> Result<(), String> {
        if !is_safe_file_name(&self.file_name) {
            return Err(format!("unsafe file name {:?}", self.file_name));
        }
        if self.chunk_size == 0 {
            return Err("chunk size must be positive".to_string());
        }
        if let Some(index) = self
            .chunk_hashes
            .iter()
            .position(|digest| !utils::is_well_formed_digest(digest))
        {
            return Err(format!("chunk hash {index} is not a base64 SHA-256 digest"));
        }
        Ok(())
    }

    /// Write the metadata as indented JSON into `dir`, returning the file path.
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, ChunkError> {
        let path = self.metadata_path(dir);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ChunkError::Serialization(e.to_string()))?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }

    /// Read and validate a metadata file.
    pub async fn load(path: &Path) -> Result<Self, LoadError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LoadError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(LoadError::Io(e)),
        };
        let metadata: Metadata =
            serde_json::from_slice(&bytes).map_err(|e| LoadError::Malformed(e.to_string()))?;
        metadata.validate().map_err(LoadError::Malformed)?;
        Ok(metadata)
    }
}

/// `{file_name}.chunk_{index}`, no zero padding.
pub fn chunk_file_name(file_name: &str, index: usize) -> String {
    format!("{}.chunk_{}", file_name, index)
}

pub fn metadata_file_name(file_name: &str) -> String {
    format!("{}.metadata.json", file_name)
}

/// A name that stays inside its directory when joined onto it.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(|c| matches!(c, '/' | '\\' | '\0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata {
            file_name: "report".to_string(),
            total_size: 5,
            chunk_size: 4,
            chunk_hashes: vec![utils::hash_data(b"abcd"), utils::hash_data(b"e")],
        }
    }

    #[test]
    fn test_chunk_names() {
        assert_eq!(chunk_file_name("report", 0), "report.chunk_0");
        assert_eq!(chunk_file_name("report", 12), "report.chunk_12");
        assert_eq!(metadata_file_name("report"), "report.metadata.json");

        let meta = sample();
        assert_eq!(
            meta.chunk_path(Path::new("/tmp/x"), 1),
            PathBuf::from("/tmp/x/report.chunk_1")
        );
    }

    #[test]
    fn test_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["fileName"], "report");
        assert_eq!(json["totalSize"], 5);
        assert_eq!(json["chunkSize"], 4);
        assert_eq!(json["chunkHashes"].as_array().unwrap().len(), 2);
        assert!(json.get("chunkCount").is_none());
    }

    #[test]
    fn test_chunk_count_is_derived() {
        // A stray count field is ignored, never trusted.
        let json = format!(
            r#"{{"fileName":"a","totalSize":1,"chunkSize":4,"chunkCount":9,"chunkHashes":["{}"]}}"#,
            utils::hash_data(b"a")
        );
        let meta: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta.chunk_count(), 1);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut meta = sample();
        meta.file_name = "../escape".to_string();
        assert!(meta.validate().is_err());

        let mut meta = sample();
        meta.chunk_size = 0;
        assert!(meta.validate().is_err());

        let mut meta = sample();
        meta.chunk_hashes[1] = "garbage".to_string();
        assert!(meta.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let meta = sample();
        let path = meta.save(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("report.metadata.json"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"fileName\": \"report\""));

        let loaded = Metadata::load(&path).await.unwrap();
        assert_eq!(loaded, meta);
    }

    #[tokio::test]
    async fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.metadata.json");
        assert!(matches!(
            Metadata::load(&missing).await,
            Err(LoadError::NotFound(_))
        ));

        let bad = dir.path().join("bad.metadata.json");
        std::fs::write(&bad, r#"{"fileName":"bad","totalSize":3}"#).unwrap();
        assert!(matches!(
            Metadata::load(&bad).await,
            Err(LoadError::Malformed(_))
        ));

        std::fs::write(&bad, "not json at all").unwrap();
        assert!(matches!(
            Metadata::load(&bad).await,
            Err(LoadError::Malformed(_))
        ));
    }
}
