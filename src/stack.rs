//! # TCP session
//!
//! A single TCP connection is supported. While the connection is open, received socket data is
//! pushed by the modem as `+IPD` frames, which get parsed byte by byte and delivered to the
//! [FrameHandler] and receive buffer given on connect.
//!
//! Commands sent during an open session (e.g. by [Adapter::send]) borrow the receive path for
//! their response and hand it back to the frame parser afterwards.
use crate::adapter::{Adapter, Error};
use crate::commands::{bounded, CloseSocketCommand, ConnectCommand, TransmissionPrepareCommand};
use crate::frame::FrameHandler;
use crate::transport::{Session, Transport, MAX_HOST_LEN};
use core::fmt::{Debug, Formatter};
use fugit_timer::Timer;
use heapless::String;

/// Max. number of bytes the modem accepts per CIPSEND command
pub const MAX_SEND_LEN: usize = 2048;

/// Frame handler and receive buffer handed back when a TCP session ends
pub struct Released<'a> {
    pub handler: Option<&'a mut (dyn FrameHandler + Send)>,
    pub buffer: &'a mut [u8],
}

impl<'a> Released<'a> {
    fn from_session(session: Session<'a>) -> Self {
        let (handler, buffer) = session.into_parts();
        Self { handler, buffer }
    }
}

impl Debug for Released<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Released")
            .field("handler", &self.handler.is_some())
            .field("buffer_len", &self.buffer.len())
            .finish()
    }
}

/// Failed close of a TCP session
///
/// If a session was open it is closed nevertheless, its resources are then contained.
#[derive(Debug)]
pub struct CloseError<'a> {
    pub error: Error,
    pub released: Option<Released<'a>>,
}

impl<'a> CloseError<'a> {
    fn not_connected() -> Self {
        Self {
            error: Error::NotConnected,
            released: None,
        }
    }

    pub fn into_parts(self) -> (Error, Option<Released<'a>>) {
        (self.error, self.released)
    }
}

impl From<CloseError<'_>> for Error {
    fn from(error: CloseError<'_>) -> Self {
        error.error
    }
}

impl<'p, 'a, T: Transport, TM: Timer<TIMER_HZ>, const TIMER_HZ: u32, const N: usize>
    Adapter<'p, 'a, T, TM, TIMER_HZ, N>
{
    /// Opens a TCP connection to the given remote.
    ///
    /// On success all bytes received afterwards are fed to the frame parser. Frame payloads are
    /// written to the start of `buffer` (followed by a NUL byte) and passed to the handler.
    /// Frames not fitting into `buffer` including the NUL byte get dropped.
    ///
    /// On failure the receive path is left untouched.
    pub fn create_tcp_connection(
        &mut self,
        host: &str,
        port: u16,
        handler: Option<&'a mut (dyn FrameHandler + Send)>,
        buffer: &'a mut [u8],
    ) -> Result<(), Error> {
        if self.receiver.has_session() {
            return Err(Error::AlreadyConnected);
        }

        let host: String<MAX_HOST_LEN> = bounded(host).ok_or(Error::InvalidHostLength)?;
        self.send_command(&ConnectCommand::tcp(host.clone(), port))?;

        self.receiver.open_session(Session::new(host, port, handler, buffer));
        info!("TCP connection to port {} established", port);
        Ok(())
    }

    /// Sends the given data and returns the number of bytes sent.
    ///
    /// Data is split into blocks of [MAX_SEND_LEN]. Each block is announced by a CIPSEND command
    /// and then written raw to the transport, bypassing the response capturing.
    /// Empty data sends nothing, as the modem rejects `AT+CIPSEND=0`.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, Error> {
        if !self.receiver.has_session() {
            return Err(Error::NotConnected);
        }

        for chunk in data.chunks(MAX_SEND_LEN) {
            self.send_command(&TransmissionPrepareCommand::new(chunk.len()))?;
            self.transport.write_nonblocking(chunk).map_err(Error::transport)?;
        }

        Ok(data.len())
    }

    /// Closes the TCP connection and hands back the frame handler and receive buffer
    ///
    /// The session is dropped and the frame parser deactivated even if the command failed, so the
    /// adapter is back in command mode in any case. The resources are then part of the error.
    pub fn close_tcp_connection(&mut self) -> Result<Released<'a>, CloseError<'a>> {
        if !self.receiver.has_session() {
            return Err(CloseError::not_connected());
        }

        let result = self.send_command(&CloseSocketCommand);
        let released = self.abort_tcp_connection();

        match (result, released) {
            (Ok(()), Some(released)) => Ok(released),
            (Ok(()), None) => Err(CloseError::not_connected()),
            (Err(error), released) => {
                warn!("Closing TCP connection failed: {:?}", error);
                Err(CloseError { error, released })
            }
        }
    }

    /// Drops the session locally without informing the modem, e.g. after the modem was reset.
    /// Returns None if no session is open.
    pub fn abort_tcp_connection(&mut self) -> Option<Released<'a>> {
        self.receiver.close_session().map(Released::from_session)
    }

    /// True if a TCP connection is open
    pub fn is_connected(&self) -> bool {
        self.receiver.has_session()
    }

    /// Remote host and port of the open TCP connection
    pub fn remote(&self) -> Option<(String<MAX_HOST_LEN>, u16)> {
        self.receiver.session_remote()
    }
}
