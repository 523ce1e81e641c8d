//! # ESP-AT modem link
//!
//! Driver for ESP-AT Wi-Fi modems connected by a UART, which is shared by two kinds of traffic:
//!
//! * Synchronous AT command exchanges, see [adapter]
//! * Unsolicited TCP data pushed as `+IPD,<length>:<data>` frames, see [frame] and [stack]
//!
//! The UART RX interrupt passes every byte to a [ReceivePath](transport::ReceivePath), which routes it
//! either to the response buffer of the running command or to the frame parser of the open TCP session.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

#[cfg(test)]
extern crate alloc;

pub(crate) mod fmt;

pub mod adapter;
pub mod buffer;
pub(crate) mod commands;
pub mod frame;
pub(crate) mod responses;
pub mod stack;
pub mod transport;
pub mod wifi;

pub use adapter::{Adapter, CommandError, Error};
pub use frame::FrameHandler;
pub use stack::{CloseError, Released};
pub use transport::{ReceivePath, Transport};
pub use wifi::WifiAdapter;

#[cfg(test)]
mod tests;
