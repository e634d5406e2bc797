/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
use crate::v4::errors::BynderError;
use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// A fixed size slice of a file being uploaded
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 1-based position of the chunk in the file
    pub sequence_number: u32,
    pub data: Bytes,
    /// Hex encoded SHA-256 of `data`
    pub sha256: String,
}

/// Number of chunks a file of `file_size` bytes is split into
pub fn chunk_count(file_size: u64, chunk_size: usize) -> u64 {
    file_size.div_ceil(chunk_size.max(1) as u64)
}

/// Reads the file sequentially and yields its chunks in order.
///
/// The file is opened on first poll and closed once the last chunk was read. Restarting means
/// calling this again.
pub fn read_chunks(
    path: PathBuf,
    chunk_size: usize,
) -> impl Stream<Item = Result<Chunk, BynderError>> {
    let chunk_size = chunk_size.max(1);
    try_stream! {
        let mut file = File::open(&path).await?;
        let mut sequence_number: u32 = 0;
        loop {
            let mut data = Vec::with_capacity(chunk_size);
            (&mut file).take(chunk_size as u64).read_to_end(&mut data).await?;
            if data.is_empty() {
                break;
            }
            sequence_number += 1;
            let sha256 = hex::encode(Sha256::digest(&data));
            yield Chunk {
                sequence_number,
                data: Bytes::from(data),
                sha256,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, pin_mut};
    use std::io::Write;

    #[test]
    fn counts() {
        assert_eq!(chunk_count(0, 5), 0);
        assert_eq!(chunk_count(20, 1024 * 1024 * 5), 1);
        assert_eq!(chunk_count(10, 5), 2);
        assert_eq!(chunk_count(11, 5), 3);
    }

    #[tokio::test]
    async fn chunks_are_sequential_and_hashed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"test content in file").unwrap();

        let chunks = read_chunks(file.path().to_path_buf(), 8);
        pin_mut!(chunks);
        let mut seen = Vec::new();
        while let Some(chunk) = chunks.next().await {
            seen.push(chunk.unwrap());
        }

        assert_eq!(seen.len(), 3);
        assert_eq!(
            seen.iter().map(|c| c.sequence_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(&seen[0].data[..], b"test con");
        assert_eq!(&seen[2].data[..], b"file");
        assert_eq!(seen[1].sha256, hex::encode(Sha256::digest(b"tent in ")));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let chunks = read_chunks(PathBuf::from("/definitely/not/here.bin"), 8);
        pin_mut!(chunks);
        assert!(matches!(chunks.next().await, Some(Err(BynderError::Io(_)))));
    }
}
