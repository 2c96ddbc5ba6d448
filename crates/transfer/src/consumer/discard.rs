use bytes::Bytes;

use crate::consumer::BodyConsumer;
use crate::error::TransferError;

/// Ignores every body chunk and yields a fixed, configured value.
#[derive(Debug)]
pub struct DiscardConsumer<U> {
    value: Option<U>,
}

impl<U: Send> DiscardConsumer<U> {
    pub fn new(value: U) -> Self {
        Self { value: Some(value) }
    }
}

impl<U: Send> BodyConsumer for DiscardConsumer<U> {
    type Body = U;

    fn on_next(&mut self, _content: Bytes) -> Result<(), TransferError> {
        Ok(())
    }

    fn on_complete(&mut self) -> Result<(), TransferError> {
        Ok(())
    }

    fn take_body(&mut self) -> Result<U, TransferError> {
        self.value.take().ok_or_else(|| TransferError::consumer("discard body already taken"))
    }

    fn close(&mut self) -> Result<(), TransferError> {
        Ok(())
    }
}
