//! The outbound side of a body transfer.
//!
//! A [`TransferSink`] is the transport's outbound buffer: it accepts offered
//! chunks and signals end-of-body through [`close`](TransferSink::close).
//! Every accepted offer is acknowledged exactly once through an
//! [`Acknowledger`], which is how the transport reports that it has taken
//! ownership of the chunk (or failed to transmit it) and how the pump paces
//! its reads.
//!
//! [`ChannelSink`] is the in-tree implementation: it forwards chunks and the
//! end-of-body marker over an mpsc channel to whatever task performs the
//! actual wire I/O.

use bytes::Bytes;
use futures::channel::{mpsc, oneshot};
use tracing::warn;

use crate::error::TransferError;

/// The receiving half of one offer's acknowledgment.
///
/// Resolves exactly once per accepted offer. A transport that drops its
/// [`Acknowledger`] without answering shows up as a cancellation, which the
/// pump reports as [`TransferError::AckDropped`].
pub type Acknowledgment = oneshot::Receiver<Result<(), TransferError>>;

/// The answering half of one offer's acknowledgment, consumed on use.
#[derive(Debug)]
pub struct Acknowledger {
    sender: oneshot::Sender<Result<(), TransferError>>,
}

impl Acknowledger {
    /// Creates a connected acknowledger/acknowledgment pair.
    pub fn pair() -> (Acknowledger, Acknowledgment) {
        let (sender, receiver) = oneshot::channel();
        (Acknowledger { sender }, receiver)
    }

    /// Reports that the offered chunk was taken over successfully.
    pub fn success(self) {
        let _ = self.sender.send(Ok(()));
    }

    /// Reports that the offered chunk could not be transmitted.
    pub fn failure(self, error: TransferError) {
        let _ = self.sender.send(Err(error));
    }
}

/// The transport's outbound buffer for one exchange.
pub trait TransferSink: Send {
    /// Offers a chunk to the sink.
    ///
    /// `Ok` means the chunk was accepted and the returned acknowledgment will
    /// resolve exactly once. `Err` means the sink rejected the chunk outright
    /// and no acknowledgment exists for it.
    fn offer(&mut self, chunk: Bytes) -> Result<Acknowledgment, TransferError>;

    /// Signals end-of-body. Must be called exactly once per exchange.
    fn close(&mut self);
}

/// One item traveling from a [`ChannelSink`] to the transport task.
#[derive(Debug)]
pub enum OutboundItem {
    /// A chunk of body data, to be acknowledged through the paired
    /// [`Acknowledger`] once the transport has taken it over.
    Chunk(Bytes, Acknowledger),
    /// Marks the end of the body.
    Eof,
}

impl OutboundItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, OutboundItem::Eof)
    }
}

/// A sink forwarding offers to a transport task over an mpsc channel.
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<OutboundItem>,
    closed: bool,
}

impl ChannelSink {
    /// Creates a sink together with the receiving end for the transport task.
    pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<OutboundItem>) {
        let (sender, receiver) = mpsc::unbounded();
        (ChannelSink { sender, closed: false }, receiver)
    }
}

impl TransferSink for ChannelSink {
    fn offer(&mut self, chunk: Bytes) -> Result<Acknowledgment, TransferError> {
        if self.closed {
            return Err(TransferError::SinkRejected);
        }

        let (acknowledger, acknowledgment) = Acknowledger::pair();
        self.sender
            .unbounded_send(OutboundItem::Chunk(chunk, acknowledger))
            .map_err(|_| TransferError::SinkRejected)?;
        Ok(acknowledgment)
    }

    fn close(&mut self) {
        if self.closed {
            warn!("sink closed more than once");
            return;
        }
        self.closed = true;
        // the transport side may already be gone, nothing left to signal then
        let _ = self.sender.unbounded_send(OutboundItem::Eof);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn offers_travel_in_order_and_resolve_acknowledgments() {
        let (mut sink, mut receiver) = ChannelSink::channel();

        let first_ack = sink.offer(Bytes::from_static(b"first")).unwrap();
        let second_ack = sink.offer(Bytes::from_static(b"second")).unwrap();
        sink.close();

        match receiver.next().await {
            Some(OutboundItem::Chunk(bytes, acknowledger)) => {
                assert_eq!(bytes, Bytes::from_static(b"first"));
                acknowledger.success();
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert!(matches!(first_ack.await, Ok(Ok(()))));

        match receiver.next().await {
            Some(OutboundItem::Chunk(bytes, acknowledger)) => {
                assert_eq!(bytes, Bytes::from_static(b"second"));
                acknowledger.failure(TransferError::SinkRejected);
            }
            other => panic!("unexpected item: {other:?}"),
        }
        assert!(matches!(second_ack.await, Ok(Err(TransferError::SinkRejected))));

        assert!(receiver.next().await.unwrap().is_eof());
    }

    #[tokio::test]
    async fn dropped_acknowledger_surfaces_as_cancellation() {
        let (mut sink, mut receiver) = ChannelSink::channel();
        let ack = sink.offer(Bytes::from_static(b"chunk")).unwrap();

        // transport drops the acknowledger without answering
        drop(receiver.next().await);

        assert!(ack.await.is_err());
    }

    #[tokio::test]
    async fn offers_after_close_are_rejected() {
        let (mut sink, _receiver) = ChannelSink::channel();
        sink.close();
        assert!(matches!(sink.offer(Bytes::new()), Err(TransferError::SinkRejected)));
    }
}
