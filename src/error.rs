//! Recoverable error kinds surfaced by the bus engine.
//!
//! Protocol-misuse conditions (closing an oversized request, leaving bytes
//! in the response buffer past `response_end`, ...) are programmer errors
//! and are raised as panics instead — see the assertions in [`crate::engine`].

use std::io;

use thiserror::Error;

/// Everything that can go wrong talking to the bus that the caller is
/// expected to recover from (as opposed to a programmer-error panic).
///
/// Cloneable so the engine can both return an error from the operation that
/// hit it and remember it as `last_error` for accessors that don't return
/// `Result`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// No byte arrived from the channel within the configured read timeout.
    #[error("transport timeout waiting for a byte from the bus")]
    Timeout,

    /// The checksum recomputed over a received reply did not match the
    /// checksum nibble carried in its header. The response buffer is left
    /// empty.
    #[error("reply checksum mismatch: header said {expected:#03x}, computed {got:#03x}")]
    ChecksumMismatch { expected: u8, got: u8 },

    /// A bus reset (`0xC5`) did not elicit the `0xA5` acknowledgement.
    /// `None` when the reset reply itself timed out.
    #[error("bus reset was not acknowledged (got {0:?})")]
    ResetFailed(Option<u8>),

    /// The channel adapter itself reported an I/O failure that was not a
    /// plain timeout.
    #[error("channel error: {0}")]
    Channel(String),
}

impl BusError {
    /// `true` for the errors that invalidate the selected address: these are
    /// fatal for the in-progress exchange, and the next request must reselect.
    pub fn invalidates_selected_address(&self) -> bool {
        matches!(self, BusError::Timeout)
    }
}

impl From<io::Error> for BusError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::TimedOut {
            BusError::Timeout
        } else {
            BusError::Channel(err.to_string())
        }
    }
}
