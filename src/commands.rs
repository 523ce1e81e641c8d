//! AT command definitions
//!
//! Timeouts are tuned to the expected modem latency: short for local commands, long for joining a
//! network and establishing or feeding TCP connections.
use crate::responses::NoResponse;
use atat::atat_derive::AtatCmd;
use atat::heapless::String;

/// Copies the given string, returns None if it exceeds the capacity
pub(crate) fn bounded<const L: usize>(value: &str) -> Option<String<L>> {
    let mut string = String::new();
    string.push_str(value).ok()?;
    Some(string)
}

/// Plain `AT` for checking that the modem responds
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, timeout_ms = 1_000, termination = "\r\n")]
pub struct PingCommand;

/// Disables echoing of received commands
#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse, timeout_ms = 1_000, termination = "\r\n")]
pub struct DisableEchoCommand;

/// Sets the WIFI mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWMODE", NoResponse, timeout_ms = 1_000, termination = "\r\n")]
pub struct WifiModeCommand {
    /// 0: RF off, 1: station, 2: soft AP, 3: soft AP and station
    #[at_arg(position = 0)]
    mode: u8,
}

impl WifiModeCommand {
    /// Client of an access point
    pub fn station_mode() -> Self {
        Self { mode: 1 }
    }
}

/// Selects between single and multiple connection mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse, timeout_ms = 1_000, termination = "\r\n")]
pub struct SetMultipleConnectionsCommand {
    #[at_arg(position = 0)]
    mode: u8,
}

impl SetMultipleConnectionsCommand {
    /// Restricts the modem to a single connection, so frames carry no link id
    pub fn single() -> Self {
        Self { mode: 0 }
    }
}

/// Command for joining a WIFI access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWJAP", NoResponse, timeout_ms = 20_000, termination = "\r\n")]
pub struct AccessPointConnectCommand {
    #[at_arg(position = 0)]
    ssid: String<32>,

    /// Pre-shared key, max. 63 chars
    #[at_arg(position = 1)]
    password: String<64>,
}

impl AccessPointConnectCommand {
    pub fn new(ssid: String<32>, password: String<64>) -> Self {
        Self { ssid, password }
    }
}

/// Disconnects from the current access point
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWQAP", NoResponse, timeout_ms = 5_000, termination = "\r\n")]
pub struct AccessPointDisconnectCommand;

/// Resolves a domain name by the modem DNS client
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPDOMAIN", NoResponse, timeout_ms = 5_000, termination = "\r\n")]
pub struct ResolveDomainCommand {
    #[at_arg(position = 0)]
    domain: String<64>,
}

impl ResolveDomainCommand {
    pub fn new(domain: String<64>) -> Self {
        Self { domain }
    }
}

/// Queries the station MAC address
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTAMAC?", NoResponse, timeout_ms = 1_000, termination = "\r\n")]
pub struct ObtainMacCommand;

/// Queries the local IP and MAC addresses
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIFSR", NoResponse, timeout_ms = 5_000, termination = "\r\n")]
pub struct ObtainLocalAddressCommand;

/// Establishes the TCP connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 20_000, attempts = 1, termination = "\r\n")]
pub struct ConnectCommand {
    /// Connection type, e.g. TCP, SSL, etc.
    #[at_arg(position = 0)]
    connection_type: String<5>,

    /// Remote IPv4 address or domain
    #[at_arg(position = 1)]
    remote_host: String<64>,

    /// Remote port
    #[at_arg(position = 2)]
    port: u16,
}

impl ConnectCommand {
    /// Establishes a TCP connection
    pub fn tcp(remote_host: String<64>, port: u16) -> Self {
        let mut connection_type = String::new();
        let _ = connection_type.push_str("TCP");

        Self {
            connection_type,
            remote_host,
            port,
        }
    }
}

/// Announces the length of the data to transmit. The data is written raw afterwards.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 20_000, termination = "\r\n")]
pub struct TransmissionPrepareCommand {
    /// Length in bytes, max. 2048
    #[at_arg(position = 0)]
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

/// Closes the TCP connection
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPCLOSE", NoResponse, timeout_ms = 5_000, termination = "\r\n")]
pub struct CloseSocketCommand;
