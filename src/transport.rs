//! # UART transport and receive path
//!
//! The TX side of the UART is abstracted by [Transport]. The RX side is push-based: the UART
//! interrupt hands every received byte to [ReceivePath::on_byte], which routes it to the currently
//! active [Consumer]. Exactly one consumer is active at any time:
//!
//! * [Consumer::Capture] while a command exchange waits for its response
//! * [Consumer::Frames] while a TCP session is open
//! * [Consumer::Discard] otherwise
//!
//! The receive path is shared between interrupt and thread context and guarded by a critical
//! section mutex. It is usually placed in a static:
//!
//! ````
//! # use esp_at_link::transport::ReceivePath;
//! static RX: ReceivePath<'static, 128> = ReceivePath::new();
//!
//! // UART RX interrupt
//! fn on_uart_rx(byte: u8) {
//!     RX.on_byte(byte);
//! }
//! # on_uart_rx(b'O');
//! ````
use crate::buffer::ResponseBuffer;
use crate::frame::{FrameHandler, FrameParser, ParserState};
use core::cell::RefCell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::String;

/// Max. length of the remote host of a TCP session
pub const MAX_HOST_LEN: usize = 64;

/// TX side of the serial line connected to the modem
pub trait Transport: embedded_io::ErrorType {
    /// Applies the line settings
    fn configure(&mut self, baudrate: u32) -> Result<(), Self::Error>;

    /// Writes all bytes and blocks until they are handed to the UART
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Queues all bytes for transmission and returns immediately
    fn write_nonblocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// Receiver of incoming bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Consumer {
    /// Bytes get dropped
    Discard,

    /// Bytes get appended to the response buffer of the running command
    Capture,

    /// Bytes get fed to the frame parser of the open TCP session
    Frames,
}

/// Open TCP session
pub(crate) struct Session<'a> {
    /// Remote host as passed to the connect command
    pub(crate) host: String<MAX_HOST_LEN>,

    /// Remote port
    pub(crate) port: u16,

    /// Optional consumer of complete frames
    handler: Option<&'a mut (dyn FrameHandler + Send)>,

    /// Destination of frame payloads
    buffer: &'a mut [u8],

    parser: FrameParser,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        host: String<MAX_HOST_LEN>,
        port: u16,
        handler: Option<&'a mut (dyn FrameHandler + Send)>,
        buffer: &'a mut [u8],
    ) -> Self {
        Self {
            host,
            port,
            handler,
            buffer,
            parser: FrameParser::new(),
        }
    }

    /// Returns the caller supplied handler and buffer
    pub(crate) fn into_parts(self) -> (Option<&'a mut (dyn FrameHandler + Send)>, &'a mut [u8]) {
        (self.handler, self.buffer)
    }

    /// Feeds a byte to the parser. Returns the payload length if a frame got completed.
    fn feed(&mut self, byte: u8) -> Option<usize> {
        self.parser.feed(byte, self.buffer)
    }

    /// Lends handler and buffer out for the duration of the frame callback
    fn lend(&mut self, length: usize) -> Option<Delivery<'a>> {
        let handler = self.handler.take()?;

        Some(Delivery {
            handler,
            buffer: core::mem::take(&mut self.buffer),
            length,
        })
    }

    fn restore(&mut self, delivery: Delivery<'a>) {
        self.handler = Some(delivery.handler);
        self.buffer = delivery.buffer;
    }
}

/// Completed frame, handed to the handler outside of the state borrow
struct Delivery<'a> {
    handler: &'a mut (dyn FrameHandler + Send),
    buffer: &'a mut [u8],
    length: usize,
}

impl Delivery<'_> {
    fn deliver(&mut self) {
        self.handler.on_frame(&self.buffer[..self.length]);
    }
}

/// State shared between the byte delivery context and the adapter
pub(crate) struct ReceiveState<'a, const N: usize> {
    pub(crate) consumer: Consumer,
    pub(crate) response: ResponseBuffer<N>,
    pub(crate) session: Option<Session<'a>>,
}

impl<'a, const N: usize> ReceiveState<'a, N> {
    /// Routes the byte. Returns the frame to deliver if a frame with handler got completed.
    fn dispatch(&mut self, byte: u8) -> Option<Delivery<'a>> {
        match self.consumer {
            Consumer::Discard => None,
            Consumer::Capture => {
                let overflowed = self.response.has_overflowed();
                self.response.push(byte);

                if !overflowed && self.response.has_overflowed() {
                    warn!("Response exceeds buffer size of {} bytes, dropping oldest bytes", N);
                }
                None
            }
            Consumer::Frames => {
                let session = self.session.as_mut()?;
                let length = session.feed(byte)?;

                self.response.clear();
                session.lend(length)
            }
        }
    }

    /// Hands the lent handler and buffer back, unless the session is gone meanwhile
    fn restore(&mut self, delivery: Delivery<'a>) {
        if let Some(session) = self.session.as_mut() {
            session.restore(delivery);
        }
    }
}

/// Receive side of the modem connection
///
/// N: Capacity of the command response buffer in bytes
pub struct ReceivePath<'a, const N: usize> {
    state: Mutex<CriticalSectionRawMutex, RefCell<ReceiveState<'a, N>>>,
}

impl<'a, const N: usize> ReceivePath<'a, N> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(ReceiveState {
                consumer: Consumer::Discard,
                response: ResponseBuffer::new(),
                session: None,
            })),
        }
    }

    /// Delivers a single received byte to the active consumer
    ///
    /// The frame handler is called after the internal state is released, so it may query the
    /// receive path, e.g. [ReceivePath::consumer].
    pub fn on_byte(&self, byte: u8) {
        self.state.lock(|state| {
            let delivery = state.borrow_mut().dispatch(byte);

            if let Some(mut delivery) = delivery {
                delivery.deliver();
                state.borrow_mut().restore(delivery);
            }
        });
    }

    /// Delivers the received bytes in order to the active consumer
    pub fn on_bytes(&self, bytes: &[u8]) {
        for byte in bytes {
            self.on_byte(*byte);
        }
    }

    /// Currently active consumer
    pub fn consumer(&self) -> Consumer {
        self.with(|state| state.consumer)
    }

    /// Frame parser state of the open session, None if no session is open
    pub fn parser_state(&self) -> Option<ParserState> {
        self.with(|state| state.session.as_ref().map(|session| session.parser.state()))
    }

    /// True if no response bytes are held
    pub fn is_response_cleared(&self) -> bool {
        self.with(|state| state.response.is_empty() && !state.response.has_overflowed())
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut ReceiveState<'a, N>) -> R) -> R {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }

    /// Drops any captured bytes and deactivates all consumers
    pub(crate) fn reset(&self) {
        self.with(|state| {
            state.response.clear();
            state.consumer = Consumer::Discard;
        });
    }

    /// Hands the byte stream to the frame parser of the given session
    pub(crate) fn open_session(&self, session: Session<'a>) {
        self.with(|state| {
            state.response.clear();
            state.session = Some(session);
            state.consumer = Consumer::Frames;
        });
    }

    /// Takes the session out and returns to command mode
    pub(crate) fn close_session(&self) -> Option<Session<'a>> {
        self.with(|state| {
            state.consumer = Consumer::Discard;
            state.session.take()
        })
    }

    pub(crate) fn has_session(&self) -> bool {
        self.with(|state| state.session.is_some())
    }

    /// Remote host and port of the open session
    pub(crate) fn session_remote(&self) -> Option<(String<MAX_HOST_LEN>, u16)> {
        self.with(|state| {
            state
                .session
                .as_ref()
                .map(|session| (session.host.clone(), session.port))
        })
    }
}

impl<const N: usize> Default for ReceivePath<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrows the consumer slot for capturing a command response
///
/// The previously active consumer is restored and the response buffer is cleared when the guard
/// gets dropped, regardless of the exchange outcome.
pub(crate) struct CaptureGuard<'p, 'a, const N: usize> {
    path: &'p ReceivePath<'a, N>,
    previous: Consumer,
}

impl<'p, 'a, const N: usize> CaptureGuard<'p, 'a, N> {
    pub(crate) fn install(path: &'p ReceivePath<'a, N>) -> Self {
        let previous = path.with(|state| {
            state.response.clear();
            core::mem::replace(&mut state.consumer, Consumer::Capture)
        });

        Self { path, previous }
    }

    /// Grants access to the captured response
    pub(crate) fn response<R>(&self, f: impl FnOnce(&ResponseBuffer<N>) -> R) -> R {
        self.path.with(|state| f(&state.response))
    }
}

impl<const N: usize> Drop for CaptureGuard<'_, '_, N> {
    fn drop(&mut self) {
        let previous = self.previous;
        self.path.with(|state| {
            state.response.clear();
            state.consumer = previous;
        });
    }
}
