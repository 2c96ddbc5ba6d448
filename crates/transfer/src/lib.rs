//! An asynchronous HTTP body transfer engine
//!
//! This crate provides the body-streaming machinery of an HTTP client: it
//! pumps request bodies from arbitrary sources into a transport with bounded
//! backpressure, and assembles response bodies from transport events into a
//! single asynchronous result. It is transport-agnostic and focuses on
//! correct completion semantics under failure.
//!
//! # Features
//!
//! - Pull-based chunk sources for in-memory bytes, files and async readers
//! - A body pump with a bounded in-flight acknowledgment window
//! - Response assembly from headers/content/complete transport events
//! - Pluggable body consumers: bytes, charset-aware text, file, discard
//! - An overall per-exchange deadline
//! - First-error-wins failure handling with suppressed secondary errors
//!
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use futures::StreamExt;
//! use http::{HeaderMap, StatusCode};
//! use tracing::{info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! use micro_transfer::consumer::handlers;
//! use micro_transfer::error::TransferError;
//! use micro_transfer::exchange::{AbortExchange, DeadlineGuard, ResponseAssembler, ResponseListener};
//! use micro_transfer::pump::BodyPump;
//! use micro_transfer::sink::{ChannelSink, OutboundItem};
//! use micro_transfer::source::FileChunkSource;
//!
//! struct LogAbort;
//!
//! impl AbortExchange for LogAbort {
//!     fn abort(&self, error: TransferError) {
//!         warn!(%error, "aborting exchange");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     let abort: Arc<dyn AbortExchange> = Arc::new(LogAbort);
//!
//!     // Outbound: pump a file body towards the transport task.
//!     let source = FileChunkSource::open("upload.bin").await.expect("open upload");
//!     let (sink, mut outbound) = ChannelSink::channel();
//!
//!     let transport = tokio::spawn(async move {
//!         while let Some(item) = outbound.next().await {
//!             match item {
//!                 OutboundItem::Chunk(chunk, acknowledger) => {
//!                     info!(len = chunk.len(), "writing chunk");
//!                     acknowledger.success();
//!                 }
//!                 OutboundItem::Eof => break,
//!             }
//!         }
//!     });
//!
//!     BodyPump::new(source, sink, abort.clone())
//!         .run()
//!         .await
//!         .expect("body transfer");
//!     transport.await.unwrap();
//!
//!     // Inbound: assemble the response body as text, with a deadline. The
//!     // transport would normally deliver these events as they arrive.
//!     let (assembler, result) = ResponseAssembler::new(handlers::as_text(), abort.clone());
//!     let mut listener = DeadlineGuard::new(assembler, Some(Duration::from_secs(5)), abort);
//!
//!     listener.on_headers(StatusCode::OK, HeaderMap::new());
//!     listener.on_content("hello world".into());
//!     listener.on_complete(Ok(()));
//!
//!     let outcome = result.await.expect("exchange failed");
//!     info!(status = %outcome.status(), body = %outcome.into_body(), "exchange finished");
//! }
//! ```
//!
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`source`]: Pull-based chunk sources for request bodies
//! - [`sink`]: The transport-facing offer/acknowledge surface
//! - [`pump`]: The transfer loop with bounded in-flight chunks
//! - [`exchange`]: Transport events, response assembly and deadlines
//! - [`consumer`]: Response body consumers and their factories
//! - [`error`]: Error types shared by both directions
//!
//!
//! # Core Components
//!
//! ## Request Bodies
//!
//! A request body is a [`source::ChunkSource`]: a pull-based producer that is
//! asked for one chunk at a time. The [`pump::BodyPump`] owns the source for
//! the duration of the transfer, offers each chunk to a [`sink::TransferSink`]
//! and keeps at most [`pump::DEFAULT_MAX_IN_FLIGHT`] offers unacknowledged.
//! The transport answers each offer through an [`sink::Acknowledger`], which
//! is what paces the pump.
//!
//! ## Response Bodies
//!
//! The transport reports one exchange through the three
//! [`exchange::ResponseListener`] events: headers, zero or more content
//! chunks, and exactly one completion. The [`exchange::ResponseAssembler`]
//! turns these into a typed [`exchange::ExchangeOutcome`] by handing body
//! bytes to a [`consumer::BodyConsumer`] chosen per-response by a
//! [`consumer::BodyHandler`]. Built-in handlers live in
//! [`consumer::handlers`].
//!
//! ## Failure Handling
//!
//! The first error on either direction wins: it aborts the exchange through
//! [`exchange::AbortExchange`] and resolves the caller's future. Errors
//! observed while unwinding (consumer close failures, drained
//! acknowledgments) are attached to the primary as suppressed errors on
//! [`error::ExchangeError`], never lost and never surfaced on their own.

pub mod consumer;
pub mod error;
pub mod exchange;
pub mod fields;
pub mod pump;
pub mod sink;
pub mod source;

mod utils;
