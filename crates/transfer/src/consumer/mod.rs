//! Body consumers: the pluggable receiving end of a response body.
//!
//! A [`BodyConsumer`] is created exactly once per exchange, by a
//! [`BodyHandler`] factory, after the response head is known and before any
//! body byte arrives. It owns whatever it buffers (chunks, an open file
//! handle) for the duration of the exchange. The response assembler closes
//! it exactly once, on every path.
//!
//! Provided consumers:
//!
//! - [`BytesConsumer`]: accumulates chunks into one buffer
//! - [`TextConsumer`]: accumulates and decodes with a resolved charset
//! - [`FileConsumer`]: writes chunks to a destination file
//! - [`DiscardConsumer`]: ignores the body, yields a fixed value
//!
//! The [`handlers`] module has the matching factories.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::error::TransferError;

mod accumulate;
mod discard;
mod file;
pub mod handlers;
mod text;

pub use accumulate::BytesConsumer;
pub use discard::DiscardConsumer;
pub use file::FileConsumer;
pub use text::TextConsumer;

/// The receiving end of one exchange's body.
///
/// Callbacks are only ever invoked from the exchange's own listener, which
/// the transport never calls concurrently, so implementations need no
/// locking. `close` is called exactly once by the owner; calling it twice is
/// outside the contract.
pub trait BodyConsumer: Send {
    /// The value this consumer turns the body into.
    type Body;

    /// One chunk of body data, in arrival order.
    fn on_next(&mut self, content: Bytes) -> Result<(), TransferError>;

    /// The body is complete; finalize any pending work.
    fn on_complete(&mut self) -> Result<(), TransferError>;

    /// Takes the final body value. Valid once, after `on_complete`.
    fn take_body(&mut self) -> Result<Self::Body, TransferError>;

    /// Releases everything the consumer owns.
    fn close(&mut self) -> Result<(), TransferError>;
}

/// The pluggable factory turning a response head into a body consumer.
///
/// Invoked exactly once per exchange, after headers are known and before any
/// body byte is delivered. A factory failure fails the exchange immediately;
/// no body bytes are ever delivered to a consumer that failed to construct.
pub trait BodyHandler<T>: Send {
    fn create(&mut self, status: StatusCode, headers: &HeaderMap)
    -> Result<Box<dyn BodyConsumer<Body = T>>, TransferError>;
}

impl<T, F> BodyHandler<T> for F
where
    F: FnMut(StatusCode, &HeaderMap) -> Result<Box<dyn BodyConsumer<Body = T>>, TransferError> + Send,
{
    fn create(
        &mut self,
        status: StatusCode,
        headers: &HeaderMap,
    ) -> Result<Box<dyn BodyConsumer<Body = T>>, TransferError> {
        self(status, headers)
    }
}
