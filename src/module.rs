//! The per-module handle: a stateless forwarder bound to
//! `(engine, address, offset)` that biases command numbers and routes
//! every typed operation through the shared engine.

use std::cell::RefCell;
use std::rc::Rc;

use crate::channel::Channel;
use crate::engine::MakerBus;
use crate::error::BusError;

/// A view onto one module living at `address` on the bus, with its
/// function/register numbers biased by `offset`.
///
/// Module handles are cheap to clone (`Rc::clone`) and share one engine.
/// The bus is single-threaded and not internally synchronised, which is
/// exactly what `Rc<RefCell<_>>` models; a multi-threaded caller would need
/// its own external synchronisation around the shared engine.
#[derive(Clone)]
pub struct Module<C: Channel> {
    engine: Rc<RefCell<MakerBus<C>>>,
    address: u8,
    offset: u8,
}

impl<C: Channel> Module<C> {
    pub fn new(engine: Rc<RefCell<MakerBus<C>>>, address: u8, offset: u8) -> Self {
        Self {
            engine,
            address,
            offset,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn offset(&self) -> u8 {
        self.offset
    }

    pub fn set_auto_flush(&self, flush_mode: bool) {
        self.engine.borrow_mut().set_auto_flush(flush_mode);
    }

    pub fn flush(&self) -> Result<(), BusError> {
        self.engine.borrow_mut().flush()
    }

    pub fn last_error(&self) -> Option<BusError> {
        self.engine.borrow().last_error().cloned()
    }

    /// Open a request for `command`, biased by this module's offset.
    /// `offset + command` is expected to fit in a byte.
    pub fn request_begin(&self, command: u8) {
        debug_assert!(
            self.offset.checked_add(command).is_some(),
            "module command {command:#04x} + offset {:#04x} overflows a byte",
            self.offset
        );
        let biased = self.offset.wrapping_add(command);
        self.engine.borrow_mut().request_begin(self.address, biased);
    }

    pub fn request_end(&self) {
        self.engine.borrow_mut().request_end();
    }

    pub fn put_ubyte(&self, value: u8) {
        self.engine.borrow_mut().put_ubyte(value);
    }
    pub fn put_byte(&self, value: i8) {
        self.engine.borrow_mut().put_byte(value);
    }
    pub fn put_ushort(&self, value: u16) {
        self.engine.borrow_mut().put_ushort(value);
    }
    pub fn put_short(&self, value: i16) {
        self.engine.borrow_mut().put_short(value);
    }
    pub fn put_uint(&self, value: u32) {
        self.engine.borrow_mut().put_uint(value);
    }
    pub fn put_int(&self, value: i32) {
        self.engine.borrow_mut().put_int(value);
    }
    pub fn put_logical(&self, value: bool) {
        self.engine.borrow_mut().put_logical(value);
    }
    pub fn put_character(&self, value: char) {
        self.engine.borrow_mut().put_character(value);
    }

    pub fn response_begin(&self) -> Result<(), BusError> {
        self.engine.borrow_mut().response_begin()
    }

    pub fn get_ubyte(&self) -> u8 {
        self.engine.borrow_mut().get_ubyte()
    }
    pub fn get_byte(&self) -> i8 {
        self.engine.borrow_mut().get_byte()
    }
    pub fn get_ushort(&self) -> u16 {
        self.engine.borrow_mut().get_ushort()
    }
    pub fn get_short(&self) -> i16 {
        self.engine.borrow_mut().get_short()
    }
    pub fn get_uint(&self) -> u32 {
        self.engine.borrow_mut().get_uint()
    }
    pub fn get_int(&self) -> i32 {
        self.engine.borrow_mut().get_int()
    }
    pub fn get_logical(&self) -> bool {
        self.engine.borrow_mut().get_logical()
    }
    pub fn get_character(&self) -> char {
        self.engine.borrow_mut().get_character()
    }

    pub fn response_end(&self) {
        self.engine.borrow().response_end();
    }
}
