use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::channel::oneshot;
use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::error::TransferError;
use crate::exchange::{AbortExchange, ResponseListener};

/// Enforces an overall deadline on one exchange.
///
/// Wraps the exchange's listener and arms a timer when created. If the timer
/// fires before the completion event arrives, the transport is asked to abort
/// with [`TransferError::Timeout`]; the abort then surfaces through the
/// wrapped listener as a regular failed completion. The completion event
/// cancels the timer before it is forwarded, so an exchange that finishes
/// just ahead of its deadline can never lose the race against its own timer.
pub struct DeadlineGuard<L> {
    inner: L,
    cancel: Option<oneshot::Sender<()>>,
}

impl<L: ResponseListener> DeadlineGuard<L> {
    /// `None` disables the deadline, the guard is then a pure passthrough.
    pub fn new(inner: L, timeout: Option<Duration>, abort: Arc<dyn AbortExchange>) -> Self {
        let cancel = timeout.map(|timeout| {
            let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
            tokio::spawn(async move {
                tokio::select! {
                    () = tokio::time::sleep(timeout) => {
                        debug!(?timeout, "exchange deadline expired, aborting");
                        abort.abort(TransferError::timeout(timeout));
                    }
                    _ = cancel_rx => {}
                }
            });
            cancel_tx
        });
        Self { inner, cancel }
    }
}

impl<L: std::fmt::Debug> std::fmt::Debug for DeadlineGuard<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineGuard")
            .field("inner", &self.inner)
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

impl<L: ResponseListener> ResponseListener for DeadlineGuard<L> {
    fn on_headers(&mut self, status: StatusCode, headers: HeaderMap) {
        self.inner.on_headers(status, headers);
    }

    fn on_content(&mut self, content: Bytes) {
        self.inner.on_content(content);
    }

    fn on_complete(&mut self, result: Result<(), TransferError>) {
        // disarm first, then forward: once completion is in, the timer
        // must not be able to fire anymore
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.inner.on_complete(result);
    }
}
