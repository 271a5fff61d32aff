//! The 8-to-9-bit frame codec.
//!
//! A *frame* is a 9-bit value (0..511). On the 8-bit wire it is either a
//! single literal byte, or — for the reserved window `0xC1..0xC5` and for
//! any value with bit 8 set (addresses) — a two-byte escape pair.

use std::io;
use std::time::Duration;

use crate::channel::Channel;

/// First reserved single byte: escape prefixes start here.
pub const ESCAPE_PREFIX_BASE: u8 = 0xC0;
/// Low end of the reserved single-byte window that forces an escape pair.
pub const RESERVED_MIN: u16 = 0xC1;
/// High end of the reserved single-byte window that forces an escape pair.
pub const RESERVED_MAX: u16 = 0xC5;
/// Broadcast trigger that starts discovery mode.
pub const DISCOVERY_TRIGGER: u8 = 0xC4;
/// Broadcast trigger that resets the bus.
pub const RESET_TRIGGER: u8 = 0xC5;
/// Reply byte a module sends to acknowledge a bus reset.
pub const RESET_ACK: u8 = 0xA5;

/// `true` when `frame` cannot be sent as a single literal byte and must be
/// escaped: it has bit 8 set (9-bit value, e.g. an address frame) or it
/// falls in the reserved single-byte window `0xC1..0xC5`.
pub fn needs_escape(frame: u16) -> bool {
    frame > 0xFF || (RESERVED_MIN..=RESERVED_MAX).contains(&frame)
}

/// Emit a 9-bit `frame` onto `channel`, escaping it when required.
pub fn emit(channel: &mut dyn Channel, frame: u16) -> io::Result<()> {
    if needs_escape(frame) {
        let byte1 = ESCAPE_PREFIX_BASE | (((frame >> 7) & 0x03) as u8);
        let byte2 = (frame & 0x7F) as u8;
        channel.write_byte(byte1)?;
        channel.write_byte(byte2)?;
    } else {
        channel.write_byte((frame & 0xFF) as u8)?;
    }
    Ok(())
}

/// Read the next frame from `channel`. The protocol is asymmetric: a
/// module never sends an escape pair back to the host, only plain bytes in
/// frame headers and payload, so this is just a single timed byte read.
pub fn decode_next(channel: &mut dyn Channel, timeout: Duration) -> io::Result<u8> {
    channel.read_byte(timeout)
}

/// Fold a payload byte sum into the 4-bit header checksum nibble:
/// `c := (s + (s >> 4)) & 0x0F`.
pub fn checksum(payload: &[u8]) -> u8 {
    let sum: u32 = payload.iter().map(|&b| b as u32).sum();
    ((sum + (sum >> 4)) & 0x0F) as u8
}
