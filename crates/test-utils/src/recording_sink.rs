use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use command_server::exec::OutputSink;

/// A sink that keeps every chunk it receives.
///
/// Clones share the same buffer, so a test can hand one clone to the engine
/// and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    chunks: Arc<Mutex<Vec<Bytes>>>,
    fail_writes: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose writes always fail, as if the client disconnected.
    pub fn closed() -> Self {
        Self {
            chunks: Arc::default(),
            fail_writes: true,
        }
    }

    pub fn chunks(&self) -> Vec<Bytes> {
        self.chunks.lock().unwrap().clone()
    }

    /// Everything written so far, concatenated.
    pub fn output(&self) -> String {
        let bytes: Vec<u8> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .flat_map(|c| c.iter().copied())
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl OutputSink for RecordingSink {
    fn write_chunk(
        &mut self,
        chunk: Bytes,
    ) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        let chunks = Arc::clone(&self.chunks);
        let fail = self.fail_writes;

        Box::pin(async move {
            if fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
            }
            chunks.lock().unwrap().push(chunk);
            Ok(())
        })
    }
}

/// A sink whose writes never complete, like a client that stopped reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct StalledSink;

impl OutputSink for StalledSink {
    fn write_chunk(
        &mut self,
        _chunk: Bytes,
    ) -> Pin<Box<dyn Future<Output = io::Result<()>> + Send + '_>> {
        Box::pin(std::future::pending())
    }
}
