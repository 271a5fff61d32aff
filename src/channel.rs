//! The serial device abstraction the bus engine is built on top of.
//!
//! This is the serial channel adapter collaborator: a thin, byte-oriented
//! full-duplex stream with a configurable read timeout
//! and an explicit output flush. The engine never talks to a concrete
//! serial port directly — it only ever sees this trait, which keeps the
//! core protocol logic testable without hardware (see the in-memory
//! loopback channel used throughout this crate's tests).

use std::io;
use std::time::Duration;

/// Byte-oriented full-duplex channel used by [`crate::engine::MakerBus`].
pub trait Channel {
    /// Write a single byte. Buffered until [`Channel::flush_out`] is called.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Write a run of bytes. Default implementation writes one byte at a
    /// time; a real transport should override this for efficiency.
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Drain the channel's output buffer so far, blocking until done.
    fn flush_out(&mut self) -> io::Result<()>;

    /// Block for up to `timeout` waiting for one byte. Returns
    /// `Err(io::ErrorKind::TimedOut)` if none arrives in time.
    fn read_byte(&mut self, timeout: Duration) -> io::Result<u8>;

    /// Discard any bytes currently buffered on the input side, so a fresh
    /// exchange does not see a stale reply (used by `reset`/`discover`
    /// callers that want to resynchronise after a protocol fault).
    fn clear_input(&mut self) -> io::Result<()>;
}
