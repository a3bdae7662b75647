//! Bounded capture of a language server's stderr, for failure diagnostics.

use std::collections::VecDeque;
use std::io::Read;
use std::process::ChildStderr;
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::debug;

use super::process::ADAPTER_TARGET;

/// A fixed-capacity byte buffer that drops the oldest bytes once full.
///
/// Shared between the capture thread and anything that wants to read a
/// snapshot (typically error construction after the process has exited).
#[derive(Debug, Clone)]
pub struct StderrRingBuffer {
    inner: Arc<Mutex<VecDeque<u8>>>,
    capacity: usize,
}

impl StderrRingBuffer {
    /// Creates an empty buffer with the given byte capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64 * 1024)))),
            capacity,
        }
    }

    fn push(&self, chunk: &[u8]) {
        let mut buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        buffer.extend(chunk.iter().copied());
        let overflow = buffer.len().saturating_sub(self.capacity);
        if overflow > 0 {
            buffer.drain(..overflow);
        }
    }

    /// Returns the captured bytes decoded lossily as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        let buffer = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let bytes: Vec<u8> = buffer.iter().copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Spawns a background thread that reads `stderr` into this buffer until
    /// the stream closes (the process exits or its stderr handle is dropped).
    pub fn capture(&self, mut stderr: ChildStderr) {
        let buffer = self.clone();
        thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stderr.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => buffer.push(&chunk[..n]),
                    Err(error) => {
                        debug!(
                            target: ADAPTER_TARGET,
                            %error,
                            "stderr capture thread stopped reading"
                        );
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_bytes_within_capacity() {
        let buffer = StderrRingBuffer::new(8);
        buffer.push(b"hello");
        assert_eq!(buffer.contents(), "hello");
    }

    #[test]
    fn drops_oldest_bytes_once_full() {
        let buffer = StderrRingBuffer::new(4);
        buffer.push(b"abcdef");
        assert_eq!(buffer.contents(), "cdef");
        buffer.push(b"gh");
        assert_eq!(buffer.contents(), "efgh");
    }
}
