//! Ready-made body handler factories.
//!
//! Mirrors the consumer variants: [`as_bytes`], [`as_text`], [`as_file`] and
//! [`discard`]/[`discard_with`] each build the matching [`BodyConsumer`] once
//! the response head is known.

use std::path::PathBuf;

use bytes::Bytes;
use encoding_rs::{Encoding, UTF_8};
use http::{HeaderMap, StatusCode, header};
use mime::Mime;
use tracing::warn;

use crate::consumer::{BodyConsumer, BodyHandler, BytesConsumer, DiscardConsumer, FileConsumer, TextConsumer};
use crate::error::TransferError;
use crate::fields::HeaderMapExt;

/// Resolves the response charset from the `Content-Type` header.
///
/// An absent header, an unparsable value, a missing `charset` parameter or
/// an unknown charset name all fall back to UTF-8. This is a recoverable
/// condition, logged but never an error.
pub fn resolve_charset(headers: &HeaderMap) -> &'static Encoding {
    let Some(content_type) = headers.first_value(header::CONTENT_TYPE.as_str()) else {
        warn!("no content-type header in response, assuming {}", UTF_8.name());
        return UTF_8;
    };

    let Ok(mime) = content_type.parse::<Mime>() else {
        warn!(content_type, "unparsable content-type header, assuming {}", UTF_8.name());
        return UTF_8;
    };

    let Some(charset) = mime.get_param(mime::CHARSET) else {
        warn!(content_type, "no charset parameter in content-type header, assuming {}", UTF_8.name());
        return UTF_8;
    };

    match Encoding::for_label(charset.as_str().as_bytes()) {
        Some(encoding) => encoding,
        None => {
            warn!(charset = charset.as_str(), "unknown charset in content-type header, assuming {}", UTF_8.name());
            UTF_8
        }
    }
}

/// Accumulates the body into one [`Bytes`] buffer.
pub fn as_bytes() -> BytesHandler {
    BytesHandler
}

/// Decodes the body as text, charset taken from the response headers.
pub fn as_text() -> TextHandler {
    TextHandler
}

/// Writes the body to `path` (create-or-truncate), yielding the path.
pub fn as_file(path: impl Into<PathBuf>) -> FileHandler {
    FileHandler { path: path.into() }
}

/// Discards the body, yielding nothing.
pub fn discard() -> DiscardHandler<()> {
    DiscardHandler { value: () }
}

/// Discards the body, yielding the given value.
pub fn discard_with<U: Clone + Send + 'static>(value: U) -> DiscardHandler<U> {
    DiscardHandler { value }
}

#[derive(Debug)]
pub struct BytesHandler;

impl BodyHandler<Bytes> for BytesHandler {
    fn create(
        &mut self,
        _status: StatusCode,
        _headers: &HeaderMap,
    ) -> Result<Box<dyn BodyConsumer<Body = Bytes>>, TransferError> {
        Ok(Box::new(BytesConsumer::new()))
    }
}

#[derive(Debug)]
pub struct TextHandler;

impl BodyHandler<String> for TextHandler {
    fn create(
        &mut self,
        _status: StatusCode,
        headers: &HeaderMap,
    ) -> Result<Box<dyn BodyConsumer<Body = String>>, TransferError> {
        Ok(Box::new(TextConsumer::new(resolve_charset(headers))))
    }
}

#[derive(Debug)]
pub struct FileHandler {
    path: PathBuf,
}

impl BodyHandler<PathBuf> for FileHandler {
    fn create(
        &mut self,
        _status: StatusCode,
        _headers: &HeaderMap,
    ) -> Result<Box<dyn BodyConsumer<Body = PathBuf>>, TransferError> {
        Ok(Box::new(FileConsumer::new(self.path.clone())))
    }
}

#[derive(Debug)]
pub struct DiscardHandler<U> {
    value: U,
}

impl<U: Clone + Send + 'static> BodyHandler<U> for DiscardHandler<U> {
    fn create(
        &mut self,
        _status: StatusCode,
        _headers: &HeaderMap,
    ) -> Result<Box<dyn BodyConsumer<Body = U>>, TransferError> {
        Ok(Box::new(DiscardConsumer::new(self.value.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, HeaderValue};

    fn headers_with_content_type(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn charset_parameter_selects_the_encoding() {
        let headers = headers_with_content_type("text/plain; charset=ISO-8859-1");
        assert_eq!(resolve_charset(&headers), encoding_rs::WINDOWS_1252);
    }

    #[test]
    fn charset_match_is_case_insensitive() {
        let headers = headers_with_content_type("text/plain; CHARSET=utf-16be");
        assert_eq!(resolve_charset(&headers), encoding_rs::UTF_16BE);
    }

    #[test]
    fn missing_charset_parameter_falls_back_to_utf8() {
        let headers = headers_with_content_type("text/plain");
        assert_eq!(resolve_charset(&headers), UTF_8);
    }

    #[test]
    fn absent_header_falls_back_to_utf8() {
        assert_eq!(resolve_charset(&HeaderMap::new()), UTF_8);
    }

    #[test]
    fn unknown_charset_name_falls_back_to_utf8() {
        let headers = headers_with_content_type("text/plain; charset=ebcdic-ancient");
        assert_eq!(resolve_charset(&headers), UTF_8);
    }

    #[test]
    fn unparsable_content_type_falls_back_to_utf8() {
        let headers = headers_with_content_type("not a mime type at all;;;");
        assert_eq!(resolve_charset(&headers), UTF_8);
    }

    #[test]
    fn text_handler_builds_a_decoding_consumer() {
        let headers = headers_with_content_type("text/plain; charset=ISO-8859-1");
        let mut consumer = as_text().create(StatusCode::OK, &headers).unwrap();

        consumer.on_next(Bytes::from_static(&[0xE9])).unwrap();
        consumer.on_complete().unwrap();
        assert_eq!(consumer.take_body().unwrap(), "é");
        consumer.close().unwrap();
    }

    #[test]
    fn discard_handler_yields_the_configured_value() {
        let mut consumer = discard_with("done").create(StatusCode::OK, &HeaderMap::new()).unwrap();
        consumer.on_next(Bytes::from_static(b"ignored")).unwrap();
        consumer.on_complete().unwrap();
        assert_eq!(consumer.take_body().unwrap(), "done");
    }
}
