//! The real-hardware [`Channel`] implementation, backed by the `serialport`
//! crate the way the rest of this codebase's serial daemon opens and reads
//! ports (`serialport::new(..).timeout(..).open()`).

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::channel::Channel;

/// A [`Channel`] over a real OS serial device.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialChannel {
    /// Open `path` at `baud` 8N1, with an initial read timeout of
    /// `timeout`.
    pub fn open(path: &str, baud: u32, timeout: Duration) -> io::Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .map_err(to_io_error)?;
        Ok(Self { port, timeout })
    }

    /// Wrap an already-open port (e.g. one configured by the caller with
    /// non-default parity/stop bits) as a channel.
    pub fn from_port(port: Box<dyn SerialPort>, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Channel for SerialChannel {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.port.write_all(&[byte])
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn flush_out(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn read_byte(&mut self, timeout: Duration) -> io::Result<u8> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout).map_err(to_io_error)?;
            self.timeout = timeout;
        }
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Err(io::Error::new(io::ErrorKind::TimedOut, "no byte available")),
            Ok(_) => Ok(buf[0]),
            Err(err) => Err(err),
        }
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(to_io_error)
    }
}

fn to_io_error(err: serialport::Error) -> io::Error {
    match err.kind {
        serialport::ErrorKind::Io(kind) => io::Error::new(kind, err.description),
        _ => io::Error::new(io::ErrorKind::Other, err.description),
    }
}
