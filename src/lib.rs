//! MakerBus — a framed 8/9-bit serial protocol engine for multiplexing
//! request/response RPC traffic to addressed microcontroller modules over a
//! single UART-style bus.
//!
//! This crate is the protocol core only: channel framing and escaping,
//! bus addressing with the acknowledged/broadcast handshake, auto-flush
//! batching with overflow-safe partial flushing, discovery, reset, and the
//! typed request/response codec. The serial device itself, any module
//! registry/configuration layer, and any GUI or code generator built on
//! top of this engine are out of scope and treated as collaborators — see
//! [`Channel`] for the one trait this crate needs from its host.
//!
//! ```no_run
//! use std::time::Duration;
//! use makerbus::{Channel, MakerBus, SerialChannel};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = SerialChannel::open("/dev/ttyUSB0", 115_200, Duration::from_secs(1))?;
//! let mut bus = MakerBus::new(channel, Duration::from_secs(1));
//!
//! bus.request_begin(0x12, 0x03);
//! bus.put_ubyte(0x42);
//! bus.request_end();
//!
//! let reply = bus.get_ubyte();
//! bus.response_end();
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod codec;
pub mod engine;
pub mod error;
pub mod frame;
pub mod module;
pub mod serial_channel;
pub mod testing;

pub use channel::Channel;
pub use engine::MakerBus;
pub use error::BusError;
pub use module::Module;
pub use serial_channel::SerialChannel;
