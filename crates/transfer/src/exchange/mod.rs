//! Per-exchange response handling.
//!
//! An exchange is the complete lifecycle of one request and its response.
//! The transport drives it by calling a [`ResponseListener`] in order, per
//! exchange: zero-or-one headers event, zero-or-more content events, exactly
//! one completion event. It accepts an [`AbortExchange`] request at any
//! point before completion, after which it still delivers exactly one
//! completion event reporting the abort as the failure.
//!
//! [`ResponseAssembler`] is the listener that turns those events into a
//! single asynchronous [`ExchangeResult`], delegating body bytes to a
//! pluggable body consumer. [`DeadlineGuard`] decorates any listener with a
//! one-shot deadline that aborts a stalled exchange.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::channel::oneshot;
use http::{HeaderMap, StatusCode};

use crate::error::{ExchangeError, TransferError};

mod assembler;
mod deadline;

pub use assembler::{ExchangeState, ResponseAssembler};
pub use deadline::DeadlineGuard;

/// A cancellation handle into the transport for one in-flight exchange.
///
/// Aborting is best-effort: the transport must still deliver exactly one
/// completion event afterwards, reporting the abort as the failure.
pub trait AbortExchange: Send + Sync {
    fn abort(&self, error: TransferError);
}

/// The event-listener contract the transport drives, one instance per
/// exchange. The transport guarantees event ordering and never invokes the
/// listener concurrently for one exchange.
pub trait ResponseListener: Send {
    /// Status and headers arrived; always precedes any content.
    fn on_headers(&mut self, status: StatusCode, headers: HeaderMap);

    /// One chunk of response body data.
    fn on_content(&mut self, content: Bytes);

    /// The exchange finished, successfully or not. Delivered exactly once.
    fn on_complete(&mut self, result: Result<(), TransferError>);
}

/// The successful outcome of an exchange: response head plus the value the
/// body consumer produced.
#[derive(Debug)]
pub struct ExchangeOutcome<T> {
    status: StatusCode,
    headers: HeaderMap,
    body: T,
}

impl<T> ExchangeOutcome<T> {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: T) -> Self {
        Self { status, headers, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn into_body(self) -> T {
        self.body
    }
}

/// The caller-side future of one exchange.
///
/// Resolves exactly once, with the outcome or with the exchange's primary
/// error. Resolution goes through a oneshot channel, so the caller's
/// continuation always runs on the caller's own task and can never hold up
/// the transport callback that completed the exchange.
#[derive(Debug)]
pub struct ExchangeResult<T> {
    receiver: oneshot::Receiver<Result<ExchangeOutcome<T>, ExchangeError>>,
}

pub(crate) type ExchangeResolver<T> = oneshot::Sender<Result<ExchangeOutcome<T>, ExchangeError>>;

pub(crate) fn exchange_result<T>() -> (ExchangeResolver<T>, ExchangeResult<T>) {
    let (sender, receiver) = oneshot::channel();
    (sender, ExchangeResult { receiver })
}

impl<T> Future for ExchangeResult<T> {
    type Output = Result<ExchangeOutcome<T>, ExchangeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_canceled)) => {
                Poll::Ready(Err(ExchangeError::new(TransferError::aborted("exchange dropped before completion"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
