//! Chunk sources: the producer side of a body transfer.
//!
//! A [`ChunkSource`] yields a lazy, non-restartable sequence of byte chunks,
//! and reports the body's total length up front when it is known. Sources are
//! single-consumer: at most one `produce_next` operation may be outstanding
//! at any time, and a source that observes a violation of that rule fails
//! fast instead of corrupting its state.
//!
//! Concrete sources:
//!
//! - [`FileChunkSource`]: reads a file in 100 KiB chunks, length committed at
//!   open time
//! - [`StreamChunkSource`]: reads a generic byte stream in 4 KiB chunks,
//!   length unknown
//! - [`BytesChunkSource`]: a single in-memory chunk
//! - [`ContentTypeSource`]: delegating wrapper attaching a content type

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransferError;

mod bytes_source;
mod file;
mod stream;

pub use bytes_source::BytesChunkSource;
pub use file::{FILE_CHUNK_SIZE, FileChunkSource};
pub use stream::{STREAM_CHUNK_SIZE, StreamChunkSource};

/// The total length of a body, fixed at source creation.
///
/// Zero-length bodies are a distinct case: no transfer is attempted for an
/// `Empty` body, so a pump never even starts for one.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodyLength {
    /// Body with known length in bytes (always non-zero)
    Length(u64),
    /// Body whose total length is not known up front
    Unknown,
    /// Empty body (no transfer attempted)
    Empty,
}

impl BodyLength {
    /// Builds a `BodyLength` from a known byte count, mapping zero to `Empty`.
    pub fn new(length: u64) -> Self {
        if length == 0 { BodyLength::Empty } else { BodyLength::Length(length) }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, BodyLength::Empty)
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, BodyLength::Unknown)
    }

    /// Returns the known byte count, if any.
    pub fn known(&self) -> Option<u64> {
        match self {
            BodyLength::Length(length) => Some(*length),
            BodyLength::Unknown => None,
            BodyLength::Empty => Some(0),
        }
    }
}

/// An asynchronous producer of body chunks.
///
/// The sequence is lazy, finite unless the length is unknown, and never
/// restartable. Exclusive access (`&mut self`) rules out concurrent calls;
/// the remaining hazard is a `produce_next` future that was started and then
/// dropped before completing, which leaves the source poisoned and makes
/// every later call fail with [`TransferError::ReadInProgress`].
///
/// On exhaustion the source releases its underlying resource before
/// reporting "no more". A failure while producing a chunk is terminal: the
/// source closes its resource and yields that failure once; afterwards
/// `has_more` reports `false`.
#[async_trait]
pub trait ChunkSource: Send {
    /// Returns whether another chunk can be produced, closing the underlying
    /// resource as a side effect when the answer turns `false` (idempotent).
    fn has_more(&mut self) -> Result<bool, TransferError>;

    /// Produces the next chunk. Fails with [`TransferError::SourceExhausted`]
    /// when called after exhaustion.
    async fn produce_next(&mut self) -> Result<Bytes, TransferError>;

    /// The total body length, fixed at source creation.
    fn body_length(&self) -> BodyLength;

    /// An optional content type for the body. Taken into account by the
    /// surrounding system only if no user-set content type is present.
    fn content_type(&self) -> Option<&str> {
        None
    }
}

/// Delegating wrapper that attaches a content type to any source.
#[derive(Debug)]
pub struct ContentTypeSource<S> {
    content_type: String,
    inner: S,
}

impl<S: ChunkSource> ContentTypeSource<S> {
    pub fn new(content_type: impl Into<String>, inner: S) -> Self {
        Self { content_type: content_type.into(), inner }
    }
}

#[async_trait]
impl<S: ChunkSource> ChunkSource for ContentTypeSource<S> {
    fn has_more(&mut self) -> Result<bool, TransferError> {
        self.inner.has_more()
    }

    async fn produce_next(&mut self) -> Result<Bytes, TransferError> {
        self.inner.produce_next().await
    }

    fn body_length(&self) -> BodyLength {
        self.inner.body_length()
    }

    fn content_type(&self) -> Option<&str> {
        Some(&self.content_type)
    }
}
