use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::TransferError;
use crate::source::{BodyLength, ChunkSource};
use crate::utils::ensure;

/// Chunk size for generic byte-stream reads. Smaller than the file chunk
/// size because the source is not seekable.
pub const STREAM_CHUNK_SIZE: usize = 4 * 1024;

/// A source over a generic sequential byte stream with unknown total length.
///
/// An empty item from the inner stream is forwarded as an empty chunk ("try
/// again"), not an error and not end-of-stream. The end of the inner stream
/// sets exhaustion; a stream error is terminal and drops the inner stream.
#[derive(Debug)]
pub struct StreamChunkSource<S> {
    stream: Option<S>,
    reading: bool,
}

impl<S> StreamChunkSource<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream: Some(stream), reading: false }
    }
}

impl<R> StreamChunkSource<ReaderStream<R>>
where
    R: AsyncRead + Send,
{
    /// Wraps any [`AsyncRead`] into a source producing chunks of at most
    /// [`STREAM_CHUNK_SIZE`] bytes.
    pub fn from_reader(reader: R) -> Self {
        Self { stream: Some(ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE)), reading: false }
    }
}

#[async_trait]
impl<S> ChunkSource for StreamChunkSource<S>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin + Send,
{
    fn has_more(&mut self) -> Result<bool, TransferError> {
        ensure!(!self.reading, TransferError::ReadInProgress);
        Ok(self.stream.is_some())
    }

    async fn produce_next(&mut self) -> Result<Bytes, TransferError> {
        ensure!(!self.reading, TransferError::ReadInProgress);

        let Some(stream) = self.stream.as_mut() else {
            return Err(TransferError::SourceExhausted);
        };

        self.reading = true;
        let item = stream.next().await;
        self.reading = false;

        match item {
            // an empty chunk means "try again", it is not end-of-stream
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(e)) => {
                debug!("closing stream on read error");
                self.stream = None;
                Err(TransferError::io(e))
            }
            None => {
                debug!("closing stream at end of input");
                self.stream = None;
                Ok(Bytes::new())
            }
        }
    }

    fn body_length(&self) -> BodyLength {
        BodyLength::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    #[tokio::test]
    async fn reader_is_chunked_and_reassembles() {
        let content: Vec<u8> = (0..10_000).map(|i| (i % 241) as u8).collect();
        let mut source = StreamChunkSource::from_reader(&content[..]);
        assert!(source.body_length().is_unknown());

        let mut body = Vec::new();
        while source.has_more().unwrap() {
            let chunk = source.produce_next().await.unwrap();
            assert!(chunk.len() <= STREAM_CHUNK_SIZE);
            body.extend_from_slice(&chunk);
        }

        assert_eq!(body, content);
        assert!(matches!(source.produce_next().await, Err(TransferError::SourceExhausted)));
    }

    #[tokio::test]
    async fn empty_item_is_try_again_not_eof() {
        let items = vec![Ok(Bytes::new()), Ok(Bytes::from_static(b"data"))];
        let mut source = StreamChunkSource::new(futures::stream::iter(items));

        assert!(source.has_more().unwrap());
        assert!(source.produce_next().await.unwrap().is_empty());

        // still not exhausted after the empty chunk
        assert!(source.has_more().unwrap());
        assert_eq!(source.produce_next().await.unwrap(), Bytes::from_static(b"data"));
    }

    #[tokio::test]
    async fn read_error_is_terminal() {
        let items = vec![Ok(Bytes::from_static(b"ok")), Err(io::Error::other("boom"))];
        let mut source = StreamChunkSource::new(futures::stream::iter(items));

        assert_eq!(source.produce_next().await.unwrap(), Bytes::from_static(b"ok"));
        assert!(matches!(source.produce_next().await, Err(TransferError::Io { .. })));
        assert!(!source.has_more().unwrap());
    }

    #[tokio::test]
    async fn dropped_produce_poisons_the_source() {
        let mut source = StreamChunkSource::new(futures::stream::pending());

        // start a produce operation and drop it before it completes
        assert!(source.produce_next().now_or_never().is_none());

        assert!(matches!(source.has_more(), Err(TransferError::ReadInProgress)));
        assert!(matches!(source.produce_next().await, Err(TransferError::ReadInProgress)));
    }
}
