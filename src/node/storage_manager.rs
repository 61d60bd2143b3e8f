use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Save a chunk to `output_dir` under `chunk_filename`, returning its path.
pub async fn save_chunk(
    chunk_data: &[u8],
    output_dir: &Path,
    chunk_filename: &str,
) -> io::Result<PathBuf> {
    let chunk_path = output_dir.join(chunk_filename);
    let mut file = tokio::fs::File::create(&chunk_path).await?;
    file.write_all(chunk_data).await?;
    file.flush().await?;
    Ok(chunk_path)
}

/// Load a chunk by path. A missing file is `Ok(None)`.
pub async fn load_chunk(chunk_path: &Path) -> io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(chunk_path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Byte length of a chunk file without reading it. A missing file is `Ok(None)`.
pub async fn chunk_len(chunk_path: &Path) -> io::Result<Option<u64>> {
    match tokio::fs::metadata(chunk_path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
