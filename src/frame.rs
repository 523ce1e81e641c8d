//! # Unsolicited TCP frames
//!
//! While a TCP session is open, ESP-AT pushes received socket data as `+IPD,<length>:<data>`.
//! There is no end marker, the frame boundary is solely given by the declared length.
//!
//! The parser is fed one byte at a time (usually from the UART interrupt) and keeps its state
//! between calls. A frame header may show up anywhere in the byte stream, bytes outside of a frame
//! are treated as noise and silently ignored.

/// Frame header prefix
pub(crate) const PREFIX: &[u8] = b"+IPD,";

/// Consumer of completely received frames
pub trait FrameHandler {
    /// Gets called exactly once per complete frame.
    ///
    /// The payload is also located at the start of the session receive buffer, followed by a NUL byte.
    /// Called from the byte delivery context (interrupt), so implementations must not block.
    fn on_frame(&mut self, payload: &[u8]);
}

impl<F: FnMut(&[u8])> FrameHandler for F {
    fn on_frame(&mut self, payload: &[u8]) {
        self(payload)
    }
}

/// Current state of the frame parser
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Waiting for the first prefix byte
    #[default]
    Idle,

    /// The given number of prefix bytes matched
    MatchingPrefix(usize),

    /// Prefix matched, reading the decimal length
    ReadingLength {
        /// Accumulated length
        length: usize,

        /// Number of digits received so far
        digits: usize,
    },

    /// Reading payload bytes into the receive buffer
    ReadingData {
        /// Declared frame length
        length: usize,

        /// Bytes already stored
        written: usize,
    },

    /// Declared length does not fit the receive buffer. Remaining payload bytes get dropped.
    Discarding {
        /// Payload bytes still to be dropped
        remaining: usize,
    },
}

/// Byte-by-byte `+IPD` frame parser
#[derive(Clone, Debug, Default)]
pub struct FrameParser {
    state: ParserState,
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            state: ParserState::Idle,
        }
    }

    /// Current parser state
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Drops any partially received frame
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
    }

    /// Processes a single byte. Payload bytes are written to the start of the given buffer.
    ///
    /// Returns the payload length once a frame is complete. A NUL terminator is then stored right
    /// after the payload.
    pub fn feed(&mut self, byte: u8, buffer: &mut [u8]) -> Option<usize> {
        match self.state {
            ParserState::Idle => {
                self.start_match(byte);
                None
            }
            ParserState::MatchingPrefix(index) => {
                if byte != PREFIX[index] {
                    // A mismatching byte may itself start the next header
                    self.start_match(byte);
                    return None;
                }

                self.state = if index + 1 == PREFIX.len() {
                    ParserState::ReadingLength { length: 0, digits: 0 }
                } else {
                    ParserState::MatchingPrefix(index + 1)
                };
                None
            }
            ParserState::ReadingLength { length, digits } => self.read_length(byte, length, digits, buffer),
            ParserState::ReadingData { length, written } => {
                buffer[written] = byte;
                self.complete_or_continue(length, written + 1, buffer)
            }
            ParserState::Discarding { remaining } => {
                self.state = match remaining {
                    0 | 1 => ParserState::Idle,
                    _ => ParserState::Discarding {
                        remaining: remaining - 1,
                    },
                };
                None
            }
        }
    }

    fn start_match(&mut self, byte: u8) {
        self.state = if byte == PREFIX[0] {
            ParserState::MatchingPrefix(1)
        } else {
            ParserState::Idle
        };
    }

    fn read_length(&mut self, byte: u8, length: usize, digits: usize, buffer: &mut [u8]) -> Option<usize> {
        match byte {
            b'0'..=b'9' => {
                let next = length
                    .checked_mul(10)
                    .and_then(|length| length.checked_add((byte - b'0') as usize));

                self.state = match next {
                    Some(length) => ParserState::ReadingLength {
                        length,
                        digits: digits + 1,
                    },
                    None => {
                        warn!("Dropping +IPD frame with overflowing length");
                        ParserState::Idle
                    }
                };
                None
            }
            b':' if digits > 0 => {
                // Payload and NUL terminator need to fit
                if length >= buffer.len() {
                    warn!("Dropping +IPD frame of {} bytes, receive buffer holds {}", length, buffer.len());
                    self.state = match length {
                        0 => ParserState::Idle,
                        _ => ParserState::Discarding { remaining: length },
                    };
                    return None;
                }

                self.complete_or_continue(length, 0, buffer)
            }
            _ => {
                self.state = ParserState::Idle;
                None
            }
        }
    }

    fn complete_or_continue(&mut self, length: usize, written: usize, buffer: &mut [u8]) -> Option<usize> {
        if written < length {
            self.state = ParserState::ReadingData { length, written };
            return None;
        }

        buffer[length] = 0x0;
        self.state = ParserState::Idle;
        Some(length)
    }
}
