//! An in-memory loopback [`Channel`], used by this crate's own tests and
//! available to downstream integration tests so the engine, codec,
//! discovery and reset logic can be exercised without real hardware.

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::channel::Channel;

/// A [`Channel`] that records everything written to it and serves reads
/// from a pre-queued byte buffer, timing out once that buffer is drained.
#[derive(Default)]
pub struct LoopbackChannel {
    written: Vec<u8>,
    pending_in: VecDeque<u8>,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes a simulated module will "reply" with.
    pub fn queue_input(&mut self, bytes: &[u8]) {
        self.pending_in.extend(bytes.iter().copied());
    }

    /// Drain and return everything written so far.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Peek at everything written so far without draining it.
    pub fn written(&self) -> &[u8] {
        &self.written
    }
}

impl Channel for LoopbackChannel {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.written.push(byte);
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn flush_out(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read_byte(&mut self, _timeout: Duration) -> io::Result<u8> {
        self.pending_in
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "loopback channel starved"))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.pending_in.clear();
        Ok(())
    }
}
