use std::cmp;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::TransferError;
use crate::source::{BodyLength, ChunkSource};
use crate::utils::ensure;

/// Chunk size for file reads.
pub const FILE_CHUNK_SIZE: usize = 100 * 1024;

/// A source reading a file in [`FILE_CHUNK_SIZE`] chunks.
///
/// The file's byte size is captured once at open time and committed as the
/// body length. A read that returns no data before the offset reaches that
/// size means the file shrank underneath the transfer, which is a hard error
/// rather than a silent early end-of-body.
#[derive(Debug)]
pub struct FileChunkSource {
    file: Option<File>,
    size: u64,
    offset: u64,
    reading: bool,
}

impl FileChunkSource {
    /// Opens `path` for reading and commits its current size as the body length.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TransferError> {
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        Ok(Self { file: Some(file), size, offset: 0, reading: false })
    }

    fn fail(&mut self, error: TransferError) -> TransferError {
        debug!("closing file on error");
        self.file = None;
        self.reading = false;
        error
    }
}

#[async_trait]
impl ChunkSource for FileChunkSource {
    fn has_more(&mut self) -> Result<bool, TransferError> {
        ensure!(!self.reading, TransferError::ReadInProgress);

        let has_more = self.file.is_some() && self.offset < self.size;
        if !has_more && self.file.is_some() {
            debug!(offset = self.offset, size = self.size, "closing file in has_more");
            self.file = None;
        }
        Ok(has_more)
    }

    async fn produce_next(&mut self) -> Result<Bytes, TransferError> {
        ensure!(!self.reading, TransferError::ReadInProgress);

        if self.offset >= self.size {
            self.file = None;
            return Err(TransferError::SourceExhausted);
        }
        let Some(file) = self.file.as_mut() else {
            return Err(TransferError::SourceExhausted);
        };

        self.reading = true;

        // never read past the size committed at open time
        let want = cmp::min(FILE_CHUNK_SIZE as u64, self.size - self.offset) as usize;
        let mut buf = vec![0u8; want];
        let read = file.read(&mut buf).await;

        match read {
            Ok(0) => Err(self.fail(TransferError::FileTruncated { offset: self.offset, size: self.size })),
            Ok(n) => {
                self.offset += n as u64;
                self.reading = false;
                debug!(read = n, offset = self.offset, "read file chunk");
                buf.truncate(n);
                Ok(Bytes::from(buf))
            }
            Err(e) => Err(self.fail(TransferError::io(e))),
        }
    }

    fn body_length(&self) -> BodyLength {
        BodyLength::new(self.size)
    }
}
