use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::PoisonError;

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Bytes read from one of the child's pipes, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    pub stream: OutputStream,
    pub bytes: Vec<u8>,
}

/// Text captured so far on each pipe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSnapshot {
    pub stdout: String,
    pub stderr: String,
}

/// Accumulates both pipes independently while the process runs and fans
/// every chunk out to live subscribers.
#[derive(Debug, Clone)]
pub(crate) struct OutputBuffers {
    stdout: Arc<StdMutex<Vec<u8>>>,
    stderr: Arc<StdMutex<Vec<u8>>>,
    chunks_tx: broadcast::Sender<OutputChunk>,
}

impl OutputBuffers {
    pub(crate) fn new() -> Self {
        let (chunks_tx, _) = broadcast::channel(256);
        Self {
            stdout: Arc::new(StdMutex::new(Vec::new())),
            stderr: Arc::new(StdMutex::new(Vec::new())),
            chunks_tx,
        }
    }

    pub(crate) fn push(&self, stream: OutputStream, bytes: &[u8]) {
        let buffer = match stream {
            OutputStream::Stdout => &self.stdout,
            OutputStream::Stderr => &self.stderr,
        };
        buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        // No subscribers is the common case.
        let _ = self.chunks_tx.send(OutputChunk {
            stream,
            bytes: bytes.to_vec(),
        });
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<OutputChunk> {
        self.chunks_tx.subscribe()
    }

    pub(crate) fn snapshot(&self) -> OutputSnapshot {
        let decode = |buffer: &StdMutex<Vec<u8>>| {
            let guard = buffer.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&guard).into_owned()
        };
        OutputSnapshot {
            stdout: decode(&self.stdout),
            stderr: decode(&self.stderr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_streams_apart_and_broadcasts_chunks() {
        let buffers = OutputBuffers::new();
        let mut rx = buffers.subscribe();

        buffers.push(OutputStream::Stdout, b"hel");
        buffers.push(OutputStream::Stderr, b"oops");
        buffers.push(OutputStream::Stdout, b"lo");

        assert_eq!(
            buffers.snapshot(),
            OutputSnapshot {
                stdout: "hello".to_string(),
                stderr: "oops".to_string(),
            }
        );
        let first = rx.try_recv().unwrap();
        assert_eq!(first.stream, OutputStream::Stdout);
        assert_eq!(first.bytes, b"hel".to_vec());
        assert_eq!(rx.try_recv().unwrap().stream, OutputStream::Stderr);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_dropped() {
        let buffers = OutputBuffers::new();
        buffers.push(OutputStream::Stdout, &[b'o', b'k', 0xff]);
        assert_eq!(buffers.snapshot().stdout, "ok\u{fffd}");
    }
}
