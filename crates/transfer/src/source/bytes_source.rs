use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransferError;
use crate::source::{BodyLength, ChunkSource};

/// A source over a single in-memory buffer, produced as one chunk.
#[derive(Debug)]
pub struct BytesChunkSource {
    bytes: Option<Bytes>,
    length: u64,
}

impl BytesChunkSource {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let length = bytes.len() as u64;
        // an empty buffer is an empty body, not a body of one empty chunk
        let bytes = if bytes.is_empty() { None } else { Some(bytes) };
        Self { bytes, length }
    }
}

#[async_trait]
impl ChunkSource for BytesChunkSource {
    fn has_more(&mut self) -> Result<bool, TransferError> {
        Ok(self.bytes.is_some())
    }

    async fn produce_next(&mut self) -> Result<Bytes, TransferError> {
        self.bytes.take().ok_or(TransferError::SourceExhausted)
    }

    fn body_length(&self) -> BodyLength {
        BodyLength::new(self.length)
    }
}
