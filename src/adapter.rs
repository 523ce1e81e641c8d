//! # Command exchange
//!
//! A single exchange sends one AT command and waits for its response:
//!
//! 1. The consumer slot of the [ReceivePath] gets borrowed and set to capturing
//! 2. The command line (terminated by CRLF) is written to the transport
//! 3. The response buffer is polled in fixed intervals until `OK\r\n` shows up or the timeout elapses
//! 4. The captured response is classified
//! 5. Response buffer is cleared and the previous consumer restored, on every exit path
//!
//! Classification is done in the following order: no bytes at all, `OK`, `ERROR`, `FAIL`, anything else.
//! So a response containing `OK` is successful, even if `ERROR` or `FAIL` is part of it as well.
use crate::buffer::contains;
use crate::transport::{CaptureGuard, ReceivePath, Transport};
use atat::AtatCmd;
use fugit::{ExtU32, TimerDurationU32};
use fugit_timer::Timer;
use heapless::Vec;

/// Max. length of a raw command line including CRLF
pub const MAX_COMMAND_LEN: usize = 128;

/// Serialization buffer size for typed commands
const COMMAND_BUFFER_SIZE: usize = 256;

/// Default baud rate applied by [Adapter::init]
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Token ending the response polling early
const TERMINATOR: &[u8] = b"OK\r\n";

/// Central client for the modem communication
///
/// TIMER_HZ: Frequency of the timer used for the response polling
///
/// N: Capacity of the command response buffer
pub struct Adapter<'p, 'a, T: Transport, TM: Timer<TIMER_HZ>, const TIMER_HZ: u32, const N: usize> {
    /// TX side of the serial line
    pub(crate) transport: T,

    /// Timer used for the response polling
    pub(crate) timer: TM,

    /// RX side of the serial line, shared with the byte delivery context
    pub(crate) receiver: &'p ReceivePath<'a, N>,

    /// Baud rate applied on init()
    baudrate: u32,

    /// Wait time between two checks of the response buffer
    poll_interval: TimerDurationU32<TIMER_HZ>,
}

/// Unsuccessful outcome of a command exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Modem explicitly rejected the command (`FAIL`)
    Fail,

    /// Modem responded with `ERROR`
    ReceivedError,

    /// Response present, but no terminal token recognized
    ReceivingGarbage,

    /// No bytes received before the timeout
    NotReceiving,
}

/// Driver errors
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Modem did not confirm the command
    Command(CommandError),

    /// Command line exceeds [MAX_COMMAND_LEN]
    CommandTooLong,

    /// Given SSID is longer then the max. size of 32 chars
    InvalidSsidLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,

    /// Given host name is longer then the max. size of 64 chars
    InvalidHostLength,

    /// Command succeeded, but the expected value is missing or malformed
    AddressParseError,

    /// A TCP session is already open. It needs to be closed first.
    AlreadyConnected,

    /// No TCP session is open
    NotConnected,

    /// Upstream transport error
    Transport(embedded_io::ErrorKind),

    /// Upstream timer error
    TimerError,
}

impl Error {
    pub(crate) fn transport<E: embedded_io::Error>(error: E) -> Self {
        Self::Transport(error.kind())
    }
}

impl From<CommandError> for Error {
    fn from(error: CommandError) -> Self {
        Self::Command(error)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Command(e) => defmt::write!(f, "Error::Command({})", e),
            Error::CommandTooLong => defmt::write!(f, "Error::CommandTooLong"),
            Error::InvalidSsidLength => defmt::write!(f, "Error::InvalidSsidLength"),
            Error::InvalidPasswordLength => defmt::write!(f, "Error::InvalidPasswordLength"),
            Error::InvalidHostLength => defmt::write!(f, "Error::InvalidHostLength"),
            Error::AddressParseError => defmt::write!(f, "Error::AddressParseError"),
            Error::AlreadyConnected => defmt::write!(f, "Error::AlreadyConnected"),
            Error::NotConnected => defmt::write!(f, "Error::NotConnected"),
            Error::Transport(_) => defmt::write!(f, "Error::Transport"),
            Error::TimerError => defmt::write!(f, "Error::TimerError"),
        }
    }
}

/// Classifies a complete response
pub(crate) fn classify(response: &[u8]) -> Result<(), CommandError> {
    if response.is_empty() {
        return Err(CommandError::NotReceiving);
    }

    if contains(response, b"OK") {
        return Ok(());
    }

    if contains(response, b"ERROR") {
        return Err(CommandError::ReceivedError);
    }

    if contains(response, b"FAIL") {
        return Err(CommandError::Fail);
    }

    Err(CommandError::ReceivingGarbage)
}

impl<'p, 'a, T: Transport, TM: Timer<TIMER_HZ>, const TIMER_HZ: u32, const N: usize>
    Adapter<'p, 'a, T, TM, TIMER_HZ, N>
{
    /// Creates a new adapter. Bytes received by the UART need to be passed to the given receive path.
    pub fn new(transport: T, timer: TM, receiver: &'p ReceivePath<'a, N>) -> Self {
        Self {
            transport,
            timer,
            receiver,
            baudrate: DEFAULT_BAUDRATE,
            poll_interval: 10.millis(),
        }
    }

    /// Configures the transport and resets the receive path to its idle state
    ///
    /// Fails with [Error::AlreadyConnected] while a TCP session is open, as its buffer and handler
    /// would get lost. Close or abort the session first.
    pub fn init(&mut self) -> Result<(), Error> {
        if self.receiver.has_session() {
            return Err(Error::AlreadyConnected);
        }

        self.receiver.reset();
        self.transport.configure(self.baudrate).map_err(Error::transport)?;
        info!("Modem transport initialized with {} baud", self.baudrate);
        Ok(())
    }

    /// Sets the baud rate applied by the next init() call
    pub fn set_baudrate(&mut self, baudrate: u32) {
        self.baudrate = baudrate;
    }

    /// Sets the wait time between two checks of the response buffer in ms
    pub fn set_poll_interval_ms(&mut self, interval: u32) {
        self.poll_interval = TimerDurationU32::millis(interval);
    }

    /// Sends a raw command (without CRLF, which gets appended) and classifies the response.
    ///
    /// The timeout is converted to a number of poll intervals, at least one poll is done.
    pub fn execute(&mut self, command: &str, timeout: TimerDurationU32<TIMER_HZ>) -> Result<(), Error> {
        let mut line: Vec<u8, MAX_COMMAND_LEN> = Vec::new();
        line.extend_from_slice(command.as_bytes()).map_err(|_| Error::CommandTooLong)?;
        line.extend_from_slice(b"\r\n").map_err(|_| Error::CommandTooLong)?;

        self.exchange(&line, timeout, |_| ())
    }

    /// Sends a typed command and classifies the response
    pub(crate) fn send_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<(), Error> {
        self.send_command_with(command, |_| ())
    }

    /// Sends a typed command. If successful, the response is passed to the given closure.
    pub(crate) fn send_command_with<Cmd: AtatCmd, R>(
        &mut self,
        command: &Cmd,
        inspect: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, Error> {
        let mut buffer = [0x0; COMMAND_BUFFER_SIZE];
        let length = command.write(&mut buffer);

        self.exchange(&buffer[..length], TimerDurationU32::millis(Cmd::MAX_TIMEOUT_MS), inspect)
    }

    /// Runs a full exchange for the given (CRLF terminated) line
    fn exchange<R>(
        &mut self,
        line: &[u8],
        timeout: TimerDurationU32<TIMER_HZ>,
        inspect: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, Error> {
        trace!("Sending command: {}", printable(line));

        // Restores the previous consumer on drop
        let guard = CaptureGuard::install(self.receiver);

        self.transport.write_blocking(line).map_err(Error::transport)?;
        self.wait_for_response(&guard, timeout)?;

        let result = guard.response(|response| {
            response.with_contiguous(|response| classify(response).map(|_| inspect(response)))
        });
        drop(guard);

        if let Err(error) = &result {
            debug!("Command {} failed: {:?}", printable(line), error);
        }

        Ok(result?)
    }

    /// Polls until the response terminator was received or the timeout elapsed
    fn wait_for_response(
        &mut self,
        guard: &CaptureGuard<'_, 'a, N>,
        timeout: TimerDurationU32<TIMER_HZ>,
    ) -> Result<(), Error> {
        let polls = self.poll_count(timeout);

        for _ in 0..polls {
            self.timer.start(self.poll_interval).map_err(|_| Error::TimerError)?;
            nb::block!(self.timer.wait()).map_err(|_| Error::TimerError)?;

            if guard.response(|response| response.contains(TERMINATOR)) {
                return Ok(());
            }
        }

        warn!("No command confirmation after {} polls", polls);
        Ok(())
    }

    /// Number of poll intervals fitting the given timeout
    fn poll_count(&self, timeout: TimerDurationU32<TIMER_HZ>) -> u32 {
        let interval = self.poll_interval.ticks().max(1);
        (timeout.ticks() / interval).max(1)
    }
}

/// Command line for logging, without line ending
fn printable(line: &[u8]) -> &str {
    let line = line.strip_suffix(b"\r\n").unwrap_or(line);
    core::str::from_utf8(line).unwrap_or("<binary>")
}
