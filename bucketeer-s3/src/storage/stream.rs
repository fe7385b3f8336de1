//! Reading upload streams of a declared length

use super::traits::{ObjectReader, StorageError};
use std::io;
use tokio::io::AsyncReadExt;

/// Read exactly `len` bytes; a shorter stream is an `UnexpectedEof` error
pub(super) async fn read_part(
    reader: &mut ObjectReader,
    len: u64,
) -> Result<Vec<u8>, StorageError> {
    let mut data = Vec::new();
    (&mut *reader).take(len).read_to_end(&mut data).await?;

    if (data.len() as u64) < len {
        return Err(StorageError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("stream ended after {} of {len} bytes", data.len()),
        )));
    }
    Ok(data)
}

/// Fail with `InvalidData` if `reader` still has bytes after `total_size`
pub(super) async fn ensure_exhausted(
    reader: &mut ObjectReader,
    total_size: u64,
) -> Result<(), StorageError> {
    let mut byte = [0u8; 1];
    if reader.read(&mut byte).await? > 0 {
        return Err(StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("stream longer than total_size {total_size}"),
        )));
    }
    Ok(())
}
