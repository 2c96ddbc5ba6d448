use bytes::Bytes;
use encoding_rs::Encoding;

use crate::consumer::{BodyConsumer, BytesConsumer};
use crate::error::TransferError;

/// Decodes an accumulated body with a charset resolved up front.
///
/// Wraps a [`BytesConsumer`]; decoding happens once, when the body is
/// complete. Malformed sequences are replaced, never fatal. See
/// [`handlers::resolve_charset`](crate::consumer::handlers::resolve_charset)
/// for how the charset is picked from the response headers.
#[derive(Debug)]
pub struct TextConsumer {
    bytes: BytesConsumer,
    encoding: &'static Encoding,
    body: Option<String>,
}

impl TextConsumer {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { bytes: BytesConsumer::new(), encoding, body: None }
    }
}

impl BodyConsumer for TextConsumer {
    type Body = String;

    fn on_next(&mut self, content: Bytes) -> Result<(), TransferError> {
        self.bytes.on_next(content)
    }

    fn on_complete(&mut self) -> Result<(), TransferError> {
        self.bytes.on_complete()?;
        let buffer = self.bytes.take_body()?;
        let (text, _, _) = self.encoding.decode(&buffer);
        self.body = Some(text.into_owned());
        self.bytes.close()
    }

    fn take_body(&mut self) -> Result<String, TransferError> {
        self.body.take().ok_or_else(|| TransferError::consumer("text body not available"))
    }

    fn close(&mut self) -> Result<(), TransferError> {
        self.body = None;
        self.bytes.close()
    }
}
