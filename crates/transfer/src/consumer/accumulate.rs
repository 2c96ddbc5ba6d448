use bytes::{BufMut, Bytes, BytesMut};

use crate::consumer::BodyConsumer;
use crate::error::TransferError;

/// Accumulates body chunks and concatenates them into one buffer.
///
/// The running total is checked against the platform's representable size on
/// every chunk; exceeding it is a [`TransferError::BodyOverflow`].
#[derive(Debug, Default)]
pub struct BytesConsumer {
    chunks: Vec<Bytes>,
    length: usize,
}

impl BytesConsumer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BodyConsumer for BytesConsumer {
    type Body = Bytes;

    fn on_next(&mut self, content: Bytes) -> Result<(), TransferError> {
        self.length = self
            .length
            .checked_add(content.len())
            .ok_or(TransferError::BodyOverflow { max: usize::MAX })?;
        self.chunks.push(content);
        Ok(())
    }

    fn on_complete(&mut self) -> Result<(), TransferError> {
        Ok(())
    }

    fn take_body(&mut self) -> Result<Bytes, TransferError> {
        let mut body = BytesMut::with_capacity(self.length);
        for chunk in self.chunks.drain(..) {
            body.put(chunk);
        }
        self.length = 0;
        Ok(body.freeze())
    }

    fn close(&mut self) -> Result<(), TransferError> {
        self.chunks.clear();
        self.length = 0;
        Ok(())
    }
}
