//! The body pump drives chunks from a [`ChunkSource`] into a
//! [`TransferSink`] with a bounded acknowledgment window.
//!
//! The pump owns the source for the duration of the transfer, so source
//! state never needs locking. Backpressure comes from the window: at most
//! [`DEFAULT_MAX_IN_FLIGHT`] offered chunks may be unacknowledged at a time,
//! and production stalls until the sink catches up. A failed acknowledgment,
//! a source error or a rejected offer ends the transfer, aborts the
//! exchange and closes the sink.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, trace};

use crate::error::{ExchangeError, TransferError};
use crate::exchange::AbortExchange;
use crate::sink::{Acknowledgment, TransferSink};
use crate::source::ChunkSource;

/// Upper bound on offered-but-unacknowledged chunks.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 5;

/// Drives one request body from its source into the transport sink.
pub struct BodyPump {
    source: Box<dyn ChunkSource>,
    sink: Box<dyn TransferSink>,
    abort: Arc<dyn AbortExchange>,
    max_in_flight: usize,
    sink_closed: bool,
}

impl BodyPump {
    pub fn new(
        source: impl ChunkSource + 'static,
        sink: impl TransferSink + 'static,
        abort: Arc<dyn AbortExchange>,
    ) -> Self {
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
            abort,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            sink_closed: false,
        }
    }

    /// Overrides the acknowledgment window size. Must be at least 1.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        debug_assert!(max_in_flight >= 1);
        self.max_in_flight = max_in_flight;
        self
    }

    /// Runs the transfer to completion.
    ///
    /// On success every chunk has been produced, offered and acknowledged,
    /// and the sink has received end-of-body. On failure the exchange has
    /// been aborted with the primary error, the sink is closed, and
    /// failures from draining the remaining window ride along as
    /// suppressed errors.
    pub async fn run(mut self) -> Result<(), ExchangeError> {
        let mut pending = FuturesUnordered::new();
        match self.drive(&mut pending).await {
            Ok(()) => {
                debug!("body transfer complete");
                Ok(())
            }
            Err(primary) => {
                let mut error = ExchangeError::new(primary);
                self.abort.abort(error.primary().clone());
                if !self.sink_closed {
                    self.sink.close();
                }
                // drain the window so no acknowledgment outcome is lost
                while let Some(ack) = pending.next().await {
                    if let Err(e) = flatten_ack(ack) {
                        error.suppress(e);
                    }
                }
                debug!(%error, "body transfer failed");
                Err(error)
            }
        }
    }

    async fn drive(
        &mut self,
        pending: &mut FuturesUnordered<Acknowledgment>,
    ) -> Result<(), TransferError> {
        loop {
            // backpressure: a full window stalls production entirely
            while pending.len() >= self.max_in_flight {
                match pending.next().await {
                    Some(ack) => flatten_ack(ack)?,
                    None => break,
                }
            }

            if !self.source.has_more()? {
                break;
            }

            // produce concurrently with acknowledgment arrivals, so a slow
            // source never delays noticing a failed chunk
            let chunk = {
                let mut produce = self.source.produce_next();
                loop {
                    tokio::select! {
                        chunk = &mut produce => break chunk?,
                        Some(ack) = pending.next() => flatten_ack(ack)?,
                    }
                }
            };

            trace!(len = chunk.len(), in_flight = pending.len(), "offering chunk");
            pending.push(self.sink.offer(chunk)?);
        }

        self.sink_closed = true;
        self.sink.close();

        // end-of-body is signalled, but completion still waits for every
        // outstanding acknowledgment
        while let Some(ack) = pending.next().await {
            flatten_ack(ack)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for BodyPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyPump")
            .field("max_in_flight", &self.max_in_flight)
            .field("sink_closed", &self.sink_closed)
            .finish_non_exhaustive()
    }
}

fn flatten_ack(
    ack: Result<Result<(), TransferError>, futures::channel::oneshot::Canceled>,
) -> Result<(), TransferError> {
    match ack {
        Ok(outcome) => outcome,
        Err(_) => Err(TransferError::AckDropped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{ChannelSink, OutboundItem};
    use crate::source::{BodyLength, StreamChunkSource};
    use async_trait::async_trait;
    use bytes::{BufMut, BytesMut};
    use std::io::{self, Cursor};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Default)]
    struct RecordingAbort {
        aborted: Mutex<Vec<TransferError>>,
    }

    impl RecordingAbort {
        fn count(&self) -> usize {
            self.aborted.lock().unwrap().len()
        }
    }

    impl AbortExchange for RecordingAbort {
        fn abort(&self, error: TransferError) {
            self.aborted.lock().unwrap().push(error);
        }
    }

    struct CountingSource {
        remaining: usize,
        produced: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChunkSource for CountingSource {
        fn has_more(&mut self) -> Result<bool, TransferError> {
            Ok(self.remaining > 0)
        }

        async fn produce_next(&mut self) -> Result<Bytes, TransferError> {
            self.remaining -= 1;
            self.produced.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"0123456789"))
        }

        fn body_length(&self) -> BodyLength {
            BodyLength::Unknown
        }
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_window_is_bounded_at_five() {
        let produced = Arc::new(AtomicUsize::new(0));
        let source = CountingSource { remaining: 20, produced: produced.clone() };
        let (sink, mut rx) = ChannelSink::channel();
        let abort = Arc::new(RecordingAbort::default());
        let task = tokio::spawn(BodyPump::new(source, sink, abort.clone()).run());

        // hold the acknowledgers back: exactly the window may arrive
        let mut held = Vec::new();
        while let Ok(Some(item)) = timeout(Duration::from_millis(10), rx.next()).await {
            match item {
                OutboundItem::Chunk(_, ack) => held.push(ack),
                OutboundItem::Eof => panic!("eof before any acknowledgment"),
            }
        }
        assert_eq!(held.len(), DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(produced.load(Ordering::SeqCst), DEFAULT_MAX_IN_FLIGHT);

        // one acknowledgment opens the window for exactly one more chunk
        held.remove(0).success();
        match timeout(Duration::from_millis(10), rx.next()).await {
            Ok(Some(OutboundItem::Chunk(_, ack))) => held.push(ack),
            other => panic!("expected one more chunk, got {other:?}"),
        }
        assert_eq!(produced.load(Ordering::SeqCst), DEFAULT_MAX_IN_FLIGHT + 1);
        assert!(timeout(Duration::from_millis(10), rx.next()).await.is_err());

        // release everything so the pump can finish
        for ack in held {
            ack.success();
        }
        loop {
            match rx.next().await {
                Some(OutboundItem::Chunk(_, ack)) => ack.success(),
                Some(OutboundItem::Eof) | None => break,
            }
        }
        task.await.unwrap().unwrap();
        assert_eq!(abort.count(), 0);
    }

    #[tokio::test]
    async fn pumps_a_large_body_in_order() {
        let data: Vec<u8> = (0..1024 * 1024usize).map(|i| (i % 251) as u8).collect();
        let source = StreamChunkSource::from_reader(Cursor::new(data.clone()));
        let (sink, mut rx) = ChannelSink::channel();
        let abort = Arc::new(RecordingAbort::default());

        let sink_task = tokio::spawn(async move {
            let mut received = BytesMut::new();
            let mut saw_eof = false;
            while let Some(item) = rx.next().await {
                match item {
                    OutboundItem::Chunk(chunk, ack) => {
                        received.put(chunk);
                        ack.success();
                    }
                    OutboundItem::Eof => {
                        saw_eof = true;
                        break;
                    }
                }
            }
            (received.freeze(), saw_eof)
        });

        BodyPump::new(source, sink, abort.clone()).run().await.unwrap();

        let (received, saw_eof) = sink_task.await.unwrap();
        assert!(saw_eof);
        assert_eq!(received.len(), data.len());
        assert_eq!(&received[..], &data[..]);
        assert_eq!(abort.count(), 0);
    }

    #[tokio::test]
    async fn failed_acknowledgment_aborts_the_transfer() {
        let produced = Arc::new(AtomicUsize::new(0));
        let source = CountingSource { remaining: 20, produced };
        let (sink, mut rx) = ChannelSink::channel();
        let abort = Arc::new(RecordingAbort::default());

        let sink_task = tokio::spawn(async move {
            let mut chunks = 0usize;
            let mut saw_eof = false;
            while let Some(item) = rx.next().await {
                match item {
                    OutboundItem::Chunk(_, ack) => {
                        chunks += 1;
                        if chunks == 2 {
                            ack.failure(TransferError::SinkRejected);
                        } else {
                            ack.success();
                        }
                    }
                    OutboundItem::Eof => saw_eof = true,
                }
            }
            saw_eof
        });

        let error = BodyPump::new(source, sink, abort.clone()).run().await.unwrap_err();
        assert!(matches!(error.primary(), TransferError::SinkRejected));
        assert_eq!(abort.count(), 1);

        // the failure path still closes the sink
        assert!(sink_task.await.unwrap());
    }

    struct FailingSource {
        produced: usize,
        fail_after: usize,
    }

    #[async_trait]
    impl ChunkSource for FailingSource {
        fn has_more(&mut self) -> Result<bool, TransferError> {
            Ok(true)
        }

        async fn produce_next(&mut self) -> Result<Bytes, TransferError> {
            if self.produced >= self.fail_after {
                return Err(TransferError::io(io::Error::other("disk gone")));
            }
            self.produced += 1;
            Ok(Bytes::from_static(b"chunk"))
        }

        fn body_length(&self) -> BodyLength {
            BodyLength::Unknown
        }
    }

    #[tokio::test]
    async fn source_error_aborts_and_closes_the_sink() {
        let source = FailingSource { produced: 0, fail_after: 2 };
        let (sink, mut rx) = ChannelSink::channel();
        let abort = Arc::new(RecordingAbort::default());

        let sink_task = tokio::spawn(async move {
            let mut saw_eof = false;
            while let Some(item) = rx.next().await {
                match item {
                    OutboundItem::Chunk(_, ack) => ack.success(),
                    OutboundItem::Eof => saw_eof = true,
                }
            }
            saw_eof
        });

        let error = BodyPump::new(source, sink, abort.clone()).run().await.unwrap_err();
        assert!(matches!(error.primary(), TransferError::Io { .. }));
        assert_eq!(abort.count(), 1);
        assert!(sink_task.await.unwrap());
    }

    #[tokio::test]
    async fn dropped_acknowledger_fails_the_transfer() {
        let produced = Arc::new(AtomicUsize::new(0));
        let source = CountingSource { remaining: 3, produced };
        let (sink, mut rx) = ChannelSink::channel();
        let abort = Arc::new(RecordingAbort::default());

        tokio::spawn(async move {
            while let Some(item) = rx.next().await {
                // dropping the acknowledger without answering
                drop(item);
            }
        });

        let error = BodyPump::new(source, sink, abort.clone()).run().await.unwrap_err();
        assert!(matches!(error.primary(), TransferError::AckDropped));
        assert_eq!(abort.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_waits_for_every_acknowledgment() {
        let produced = Arc::new(AtomicUsize::new(0));
        let source = CountingSource { remaining: 3, produced };
        let (sink, mut rx) = ChannelSink::channel();
        let abort = Arc::new(RecordingAbort::default());
        let mut task = tokio::spawn(BodyPump::new(source, sink, abort).run());

        let mut held = Vec::new();
        let mut saw_eof = false;
        while let Ok(Some(item)) = timeout(Duration::from_millis(10), rx.next()).await {
            match item {
                OutboundItem::Chunk(_, ack) => held.push(ack),
                OutboundItem::Eof => saw_eof = true,
            }
        }
        assert_eq!(held.len(), 3);
        assert!(saw_eof, "end-of-body is signalled before the last acknowledgment");

        // the pump must not report completion while acknowledgments are out
        assert!(timeout(Duration::from_millis(10), &mut task).await.is_err());

        for ack in held {
            ack.success();
        }
        task.await.unwrap().unwrap();
    }
}
