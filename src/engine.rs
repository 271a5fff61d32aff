//! The bus engine: owns the channel, the selected address, the
//! request/response buffers, and the auto-flush policy.

use std::collections::VecDeque;
use std::time::Duration;

use crate::channel::Channel;
use crate::codec;
use crate::error::BusError;
use crate::frame;

/// The MakerBus engine. Generic over the [`Channel`] it talks through, so
/// the protocol logic below is testable with [`crate::testing::LoopbackChannel`]
/// without any real serial hardware.
///
/// Not internally synchronised: a `MakerBus` is used from exactly one
/// thread at a time. `Module` handles built on top of it use
/// `Rc<RefCell<_>>` rather than `Arc<Mutex<_>>` for exactly this reason —
/// see `crate::module`.
pub struct MakerBus<C: Channel> {
    channel: C,
    read_timeout: Duration,
    selected_address: Option<u8>,
    request: Vec<u8>,
    safe_len: usize,
    response: VecDeque<u8>,
    auto_flush: bool,
    last_error: Option<BusError>,
    last_discovery: Vec<String>,
}

impl<C: Channel> MakerBus<C> {
    /// Build an engine over `channel`. `read_timeout` governs every
    /// blocking read (1 second is a reasonable default for a UART bus).
    /// Auto-flush starts enabled.
    pub fn new(channel: C, read_timeout: Duration) -> Self {
        Self {
            channel,
            read_timeout,
            selected_address: None,
            request: Vec::new(),
            safe_len: 0,
            response: VecDeque::new(),
            auto_flush: true,
            last_error: None,
            last_discovery: Vec::new(),
        }
    }

    /// Consume the engine and hand back its channel.
    pub fn into_channel(self) -> C {
        self.channel
    }

    pub fn auto_flush(&self) -> bool {
        self.auto_flush
    }

    /// Set the auto-flush policy. Turning it on immediately flushes any
    /// queued requests.
    pub fn set_auto_flush(&mut self, flush_mode: bool) {
        log::debug!("set_auto_flush({flush_mode})");
        self.auto_flush = flush_mode;
        if flush_mode {
            let _ = self.flush();
        }
    }

    /// The most recent recoverable error, for accessors that swallow
    /// errors rather than returning `Result`.
    pub fn last_error(&self) -> Option<&BusError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Identifiers collected by the most recent [`MakerBus::discover`]
    /// call, including any partial results left behind by a timeout.
    pub fn last_discovery(&self) -> &[String] {
        &self.last_discovery
    }

    pub fn selected_address(&self) -> Option<u8> {
        self.selected_address
    }

    fn note_error(&mut self, err: BusError) -> BusError {
        if err.invalidates_selected_address() {
            self.selected_address = None;
        }
        self.last_error = Some(err.clone());
        err
    }

    /// Select `address` on the bus. Addresses with bit 7 clear require a
    /// one-byte acknowledgement from the module, which is read and
    /// discarded — its value is never interpreted.
    pub fn select_address(&mut self, address: u8) -> Result<(), BusError> {
        log::debug!("select_address({address:#04x})");
        if let Err(e) = frame::emit(&mut self.channel, address as u16 | 0x100) {
            return Err(self.note_error(BusError::from(e)));
        }
        self.selected_address = Some(address);
        if address & 0x80 == 0 {
            match frame::decode_next(&mut self.channel, self.read_timeout) {
                Ok(_ack) => {}
                Err(e) => return Err(self.note_error(BusError::from(e))),
            }
        }
        Ok(())
    }

    /// Open a request addressed to `address` with command byte `command`
    /// (already offset-biased by the caller's [`crate::module::Module`], if
    /// any). Emits an address frame first when the bus isn't already
    /// pointed at `address`.
    pub fn request_begin(&mut self, address: u8, command: u8) {
        log::trace!("request_begin(address={address:#04x}, command={command:#04x})");
        self.safe_len = self.request.len();
        if self.auto_flush && !self.request.is_empty() {
            let _ = self.flush();
        }
        if self.selected_address != Some(address) {
            if let Err(err) = self.select_address(address) {
                log::warn!("address select failed: {err}");
            }
        }
        self.request.push(command);
    }

    pub fn put_ubyte(&mut self, value: u8) {
        codec::put_ubyte(&mut self.request, value);
    }
    pub fn put_byte(&mut self, value: i8) {
        codec::put_byte(&mut self.request, value);
    }
    pub fn put_ushort(&mut self, value: u16) {
        codec::put_ushort(&mut self.request, value);
    }
    pub fn put_short(&mut self, value: i16) {
        codec::put_short(&mut self.request, value);
    }
    pub fn put_uint(&mut self, value: u32) {
        codec::put_uint(&mut self.request, value);
    }
    pub fn put_int(&mut self, value: i32) {
        codec::put_int(&mut self.request, value);
    }
    pub fn put_logical(&mut self, value: bool) {
        codec::put_logical(&mut self.request, value);
    }
    pub fn put_character(&mut self, value: char) {
        codec::put_character(&mut self.request, value);
    }

    /// Close the current request. A request that grew past 15 bytes is
    /// flushed immediately so the just-closed request starts from a clean
    /// buffer; closing an empty request is a no-op.
    pub fn request_end(&mut self) {
        log::trace!("request_end(); request.len()={}", self.request.len());
        if self.request.len() >= 16 {
            let _ = self.flush();
        }
        self.safe_len = self.request.len();
        if self.auto_flush {
            let _ = self.flush();
        }
    }

    /// Flush every fully-closed request in the buffer, one 1..=15-byte
    /// frame at a time, reading back each frame's reply.
    pub fn flush(&mut self) -> Result<(), BusError> {
        let mut result: Result<(), BusError> = Ok(());
        while !self.request.is_empty() {
            let n = if self.request.len() < 16 {
                self.request.len()
            } else {
                self.safe_len
            };
            assert!(
                n > 0 && n < 16,
                "closed request is {} bytes; a single frame must be 1..=15 bytes (did you forget to call request_end before it grew past 15 bytes?)",
                self.request.len()
            );

            let payload: Vec<u8> = self.request.drain(0..n).collect();
            self.safe_len = self.safe_len.saturating_sub(n);

            let c = frame::checksum(&payload);
            let header = ((n as u16) << 4) | c as u16;

            if let Err(e) = frame::emit(&mut self.channel, header) {
                result = Err(self.note_error(BusError::from(e)));
                break;
            }
            for &byte in &payload {
                if let Err(e) = frame::emit(&mut self.channel, byte as u16) {
                    result = Err(self.note_error(BusError::from(e)));
                    break;
                }
            }
            if result.is_err() {
                break;
            }
            if let Err(e) = self.channel.flush_out() {
                result = Err(self.note_error(BusError::from(e)));
                break;
            }

            let response_header = match frame::decode_next(&mut self.channel, self.read_timeout) {
                Ok(b) => b,
                Err(e) => {
                    log::warn!("response header timeout");
                    result = Err(self.note_error(BusError::from(e)));
                    break;
                }
            };
            let response_len = (response_header >> 4) as usize;
            let response_checksum = response_header & 0x0F;

            self.response.clear();
            let mut received = Vec::with_capacity(response_len);
            let mut byte_timed_out = false;
            for _ in 0..response_len {
                match frame::decode_next(&mut self.channel, self.read_timeout) {
                    Ok(b) => received.push(b),
                    Err(e) => {
                        log::warn!("response byte timeout");
                        result = Err(self.note_error(BusError::from(e)));
                        byte_timed_out = true;
                        break;
                    }
                }
            }

            let got = frame::checksum(&received);
            if got != response_checksum {
                log::warn!("response checksum mismatch: header said {response_checksum:#03x}, computed {got:#03x}");
                self.response.clear();
                result = Err(self.note_error(BusError::ChecksumMismatch {
                    expected: response_checksum,
                    got,
                }));
            } else if !byte_timed_out {
                self.response.extend(received);
            }
        }
        if result.is_ok() {
            self.last_error = None;
        }
        result
    }

    /// Alias for [`MakerBus::flush`], named to mirror `request_begin`/
    /// `request_end` on the response side.
    pub fn response_begin(&mut self) -> Result<(), BusError> {
        self.flush()
    }

    pub fn get_ubyte(&mut self) -> u8 {
        codec::get_ubyte(&mut self.response)
    }
    pub fn get_byte(&mut self) -> i8 {
        codec::get_byte(&mut self.response)
    }
    pub fn get_ushort(&mut self) -> u16 {
        codec::get_ushort(&mut self.response)
    }
    pub fn get_short(&mut self) -> i16 {
        codec::get_short(&mut self.response)
    }
    pub fn get_uint(&mut self) -> u32 {
        codec::get_uint(&mut self.response)
    }
    pub fn get_int(&mut self) -> i32 {
        codec::get_int(&mut self.response)
    }
    pub fn get_logical(&mut self) -> bool {
        codec::get_logical(&mut self.response)
    }
    pub fn get_character(&mut self) -> char {
        codec::get_character(&mut self.response)
    }

    /// Assert the response buffer has been fully consumed. Under-consuming
    /// a reply is a programmer error, not a recoverable fault.
    pub fn response_end(&self) {
        assert!(
            self.response.is_empty(),
            "{} bytes left over from response",
            self.response.len()
        );
    }

    /// Broadcast a bus reset and wait for the `0xA5` acknowledgement.
    /// Invalidates the selected address regardless of outcome.
    pub fn reset(&mut self) -> Result<(), BusError> {
        log::debug!("reset()");
        // Invalidated regardless of outcome, including a write/flush failure below.
        self.selected_address = None;

        if let Err(e) = self.channel.write_byte(frame::RESET_TRIGGER) {
            return Err(self.note_error(BusError::from(e)));
        }
        if let Err(e) = self.channel.flush_out() {
            return Err(self.note_error(BusError::from(e)));
        }

        let result = match frame::decode_next(&mut self.channel, self.read_timeout) {
            Ok(byte) if byte == frame::RESET_ACK => Ok(()),
            Ok(byte) => Err(BusError::ResetFailed(Some(byte))),
            Err(e) => match BusError::from(e) {
                BusError::Timeout => Err(BusError::ResetFailed(None)),
                other => Err(other),
            },
        };
        self.last_error = result.clone().err();
        result
    }

    /// Broadcast a discovery scan and collect the newline-delimited list of
    /// module identifiers. On a read timeout, returns whatever identifiers
    /// were collected so far via
    /// [`MakerBus::last_discovery`] and an error.
    pub fn discover(&mut self) -> Result<Vec<String>, BusError> {
        log::debug!("discover()");
        if let Err(e) = self.channel.write_byte(frame::DISCOVERY_TRIGGER) {
            return Err(self.note_error(BusError::from(e)));
        }
        if let Err(e) = self.channel.flush_out() {
            return Err(self.note_error(BusError::from(e)));
        }

        let mut ids: Vec<String> = Vec::new();
        let mut line: Vec<u8> = Vec::new();
        loop {
            let byte = match frame::decode_next(&mut self.channel, self.read_timeout) {
                Ok(b) => b,
                Err(e) => {
                    self.last_discovery = ids.clone();
                    return Err(self.note_error(BusError::from(e)));
                }
            };
            if byte == b'\n' {
                let is_sentinel = line.first() == Some(&b'!');
                if line.len() > 1 {
                    ids.push(String::from_utf8_lossy(&line[1..]).into_owned());
                }
                line.clear();
                if is_sentinel {
                    break;
                }
            } else {
                line.push(byte);
            }
        }
        self.last_discovery = ids.clone();
        self.last_error = None;
        Ok(ids)
    }
}
