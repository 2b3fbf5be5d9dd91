//! File chunking with a fixed chunk size.
//!
//! Chunks are positional: chunk `i` of a file becomes leaf `i` of its Merkle
//! tree. Only the last chunk may be shorter than the chunk size, and no chunk
//! is ever empty.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Split the file at `path` into chunks of `chunk_size` bytes.
///
/// An empty file yields no chunks. A file whose length is an exact multiple
/// of `chunk_size` does not get a trailing empty chunk.
pub fn chunk_file<P: AsRef<Path>>(path: P, chunk_size: u64) -> Result<Vec<Vec<u8>>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize);
    }

    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let mut chunks = Vec::new();

    loop {
        let mut chunk = Vec::new();
        let read = (&mut reader).take(chunk_size).read_to_end(&mut chunk)?;
        if read == 0 {
            break;
        }
        chunks.push(chunk);
    }

    debug!(path = %path.display(), chunks = chunks.len(), chunk_size, "file chunked");
    Ok(chunks)
}

/// Split an in-memory buffer the same way [`chunk_file`] splits a file.
pub fn chunk_bytes(data: &[u8], chunk_size: usize) -> Result<Vec<Vec<u8>>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize);
    }
    Ok(data.chunks(chunk_size).map(<[u8]>::to_vec).collect())
}

/// Write `chunks` in order to `path`, creating or truncating the file.
pub fn build_file<P: AsRef<Path>>(path: P, chunks: &[Vec<u8>]) -> Result<(), ChunkError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    for chunk in chunks {
        writer.write_all(chunk)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), chunks = chunks.len(), "file rebuilt");
    Ok(())
}
