// src/exec/sink.rs

//! Output sinks for subprocess output.
//!
//! The engine writes every chunk it reads from the subprocess straight into
//! an [`OutputSink`], one call per chunk, without coalescing. The HTTP layer
//! uses [`ChannelSink`], whose receiving half becomes the response body: each
//! chunk turns into one body frame that hyper writes out as soon as it is
//! produced.

use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Destination for live subprocess output.
///
/// An error from `write_chunk` means the consumer is gone; the engine reacts
/// by cancelling the run.
pub trait OutputSink: Send {
    fn write_chunk(
        &mut self,
        chunk: Bytes,
    ) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>>;
}

/// Sink that forwards chunks over a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

/// Stream of output chunks suitable for `axum::body::Body::from_stream`.
pub type OutputStream = BoxStream<'static, io::Result<Bytes>>;

/// Create a connected sink/stream pair.
///
/// Dropping the stream before it is exhausted (the client disconnected)
/// cancels `cancel`, which in turn kills the subprocess.
pub fn channel(capacity: usize, cancel: &CancellationToken) -> (ChannelSink, OutputStream) {
    let (tx, rx) = mpsc::channel::<Bytes>(capacity);
    let guard = cancel.clone().drop_guard();

    let stream = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let chunk = rx.recv().await?;
        Some((Ok(chunk), (rx, guard)))
    })
    .boxed();

    (ChannelSink { tx }, stream)
}

impl OutputSink for ChannelSink {
    fn write_chunk(
        &mut self,
        chunk: Bytes,
    ) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.tx
                .send(chunk)
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output stream closed"))
        })
    }
}
