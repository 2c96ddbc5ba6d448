use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::consumer::{BodyConsumer, BodyHandler};
use crate::error::{ExchangeError, TransferError};
use crate::exchange::{AbortExchange, ExchangeOutcome, ExchangeResolver, ExchangeResult, ResponseListener, exchange_result};

/// The lifecycle of one exchange. Terminal states are entered exactly once.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExchangeState {
    AwaitingHeaders,
    StreamingBody,
    Completed,
    Failed,
}

impl ExchangeState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExchangeState::Completed | ExchangeState::Failed)
    }
}

/// Turns transport events into a single asynchronous [`ExchangeResult`].
///
/// One instance per exchange. Headers trigger the body-handler factory; body
/// chunks are forwarded to the consumer it built; the completion event
/// finalizes the consumer and resolves the result. The consumer is closed
/// exactly once on every path, and errors observed while unwinding are
/// attached to the primary error as suppressed, never surfaced separately.
///
/// After a local failure (a factory or consumer error) the assembler has
/// already requested a transport abort; events that still arrive before the
/// abort takes effect are dropped.
pub struct ResponseAssembler<T> {
    handler: Box<dyn BodyHandler<T>>,
    consumer: Option<Box<dyn BodyConsumer<Body = T>>>,
    abort: Arc<dyn AbortExchange>,
    resolver: Option<ExchangeResolver<T>>,
    status: Option<StatusCode>,
    headers: Option<HeaderMap>,
    state: ExchangeState,
}

impl<T: Send> ResponseAssembler<T> {
    /// Creates the assembler and the caller-side future of the exchange.
    pub fn new(handler: impl BodyHandler<T> + 'static, abort: Arc<dyn AbortExchange>) -> (Self, ExchangeResult<T>) {
        let (resolver, result) = exchange_result();
        let assembler = Self {
            handler: Box::new(handler),
            consumer: None,
            abort,
            resolver: Some(resolver),
            status: None,
            headers: None,
            state: ExchangeState::AwaitingHeaders,
        };
        (assembler, result)
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Resolves the exchange's result. The caller-side continuation runs on
    /// the caller's own task, never inside the transport callback.
    fn resolve(&mut self, result: Result<ExchangeOutcome<T>, ExchangeError>) {
        if let Some(resolver) = self.resolver.take() {
            // the receiver may be gone, the outcome is then simply unobserved
            let _ = resolver.send(result);
        }
    }

    /// Error handling: close the consumer (once), request a transport abort
    /// when the exchange may still be in flight, resolve with the primary.
    fn fail(&mut self, mut error: ExchangeError, abort_transport: bool) {
        if let Some(mut consumer) = self.consumer.take() {
            if let Err(e) = consumer.close() {
                error.suppress(e);
            }
        }
        if abort_transport {
            self.abort.abort(error.primary().clone());
        }
        debug!(%error, "exchange failed");
        self.state = ExchangeState::Failed;
        self.resolve(Err(error));
    }

    /// Successful transport completion: finalize the consumer, read the
    /// body, close the consumer, resolve.
    fn finish(&mut self) {
        let Some(mut consumer) = self.consumer.take() else {
            self.fail(ExchangeError::new(TransferError::MissingHeaders), false);
            return;
        };

        let body = consumer.on_complete().and_then(|()| consumer.take_body());
        let closed = consumer.close();

        match (body, closed) {
            (Ok(body), Ok(())) => {
                let (Some(status), Some(headers)) = (self.status.take(), self.headers.take()) else {
                    self.fail(ExchangeError::new(TransferError::MissingHeaders), false);
                    return;
                };
                self.state = ExchangeState::Completed;
                debug!(status = %status, "exchange completed");
                self.resolve(Ok(ExchangeOutcome::new(status, headers, body)));
            }
            // the body resolved but its resources did not release cleanly;
            // the close error becomes the primary rather than disappearing
            (Ok(_), Err(close_error)) => self.fail(ExchangeError::new(close_error), false),
            (Err(e), closed) => {
                let mut error = ExchangeError::new(e);
                if let Err(close_error) = closed {
                    error.suppress(close_error);
                }
                self.fail(error, false);
            }
        }
    }
}

impl<T> std::fmt::Debug for ResponseAssembler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseAssembler")
            .field("state", &self.state)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<T: Send> ResponseListener for ResponseAssembler<T> {
    fn on_headers(&mut self, status: StatusCode, headers: HeaderMap) {
        if self.state.is_terminal() {
            debug!("dropping headers event in terminal state");
            return;
        }

        debug!(status = %status, "response headers received, setting up body handling");
        self.status = Some(status);

        match self.handler.create(status, &headers) {
            Ok(consumer) => {
                self.consumer = Some(consumer);
                self.headers = Some(headers);
                self.state = ExchangeState::StreamingBody;
            }
            Err(e) => {
                self.headers = Some(headers);
                self.fail(ExchangeError::new(e), true);
            }
        }
    }

    fn on_content(&mut self, content: Bytes) {
        if self.state.is_terminal() {
            debug!(len = content.len(), "dropping content event in terminal state");
            return;
        }

        let Some(consumer) = self.consumer.as_mut() else {
            // content before headers breaks the transport's ordering contract
            self.fail(ExchangeError::new(TransferError::MissingHeaders), true);
            return;
        };

        if let Err(e) = consumer.on_next(content) {
            self.fail(ExchangeError::new(e), true);
        }
    }

    fn on_complete(&mut self, result: Result<(), TransferError>) {
        if self.state.is_terminal() {
            // a locally failed exchange still receives the transport's
            // completion event after the abort, nothing left to do
            debug!("dropping completion event in terminal state");
            return;
        }

        match result {
            Ok(()) => self.finish(),
            Err(e) => self.fail(ExchangeError::new(e), false),
        }
    }
}
