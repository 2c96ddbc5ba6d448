use std::error::Error;
use std::fmt::{self, Display};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The error taxonomy of a body transfer.
///
/// `TransferError` is `Clone` (I/O errors are shared behind an `Arc`) because
/// the same failure typically travels two ways at once: back to the caller as
/// the exchange result, and into the transport as the reason for an abort
/// request.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: Arc<io::Error>,
    },

    #[error("read already in progress")]
    ReadInProgress,

    #[error("source already exhausted")]
    SourceExhausted,

    #[error("file shrank during transfer: {offset} of {size} bytes read")]
    FileTruncated { offset: u64, size: u64 },

    #[error("sink rejected offered chunk")]
    SinkRejected,

    #[error("offer was never acknowledged")]
    AckDropped,

    #[error("body consumer error: {reason}")]
    Consumer { reason: String },

    #[error("accumulated body length exceeds {max} bytes")]
    BodyOverflow { max: usize },

    #[error("transfer timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("exchange completed without response headers")]
    MissingHeaders,

    #[error("exchange aborted: {reason}")]
    Aborted { reason: String },
}

impl TransferError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: Arc::new(e.into()) }
    }

    pub fn consumer<S: ToString>(reason: S) -> Self {
        Self::Consumer { reason: reason.to_string() }
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    pub fn aborted<S: ToString>(reason: S) -> Self {
        Self::Aborted { reason: reason.to_string() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<io::Error> for TransferError {
    fn from(e: io::Error) -> Self {
        Self::io(e)
    }
}

/// The failure of one exchange: a primary error plus every secondary error
/// observed while unwinding (closing a consumer, aborting the transport,
/// releasing a source's resource).
///
/// The first error recorded for an exchange stays primary; later errors are
/// attached via [`suppress`](Self::suppress) instead of replacing it or
/// surfacing separately.
#[derive(Debug, Clone)]
pub struct ExchangeError {
    primary: TransferError,
    suppressed: Vec<TransferError>,
}

impl ExchangeError {
    pub fn new(primary: TransferError) -> Self {
        Self { primary, suppressed: Vec::new() }
    }

    /// Attaches a secondary error observed during unwind.
    pub fn suppress(&mut self, error: TransferError) {
        self.suppressed.push(error);
    }

    pub fn primary(&self) -> &TransferError {
        &self.primary
    }

    pub fn suppressed(&self) -> &[TransferError] {
        &self.suppressed
    }

    pub fn is_timeout(&self) -> bool {
        self.primary.is_timeout()
    }
}

impl From<TransferError> for ExchangeError {
    fn from(primary: TransferError) -> Self {
        Self::new(primary)
    }
}

impl Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary)?;
        if !self.suppressed.is_empty() {
            write!(f, " ({} suppressed)", self.suppressed.len())?;
        }
        Ok(())
    }
}

impl Error for ExchangeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.primary)
    }
}
