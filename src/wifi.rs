//! # WIFI access point client
//!
//! Modem setup, joining a network, DNS resolution and obtaining address information.
//!
//! Note: If the connection was not successful or is lost, the ESP-AT will try independently from time
//! to time (by default every second) to establish connection to the network.
use crate::adapter::{Adapter, Error};
use crate::commands::{
    bounded, AccessPointConnectCommand, AccessPointDisconnectCommand, DisableEchoCommand, ObtainLocalAddressCommand,
    ObtainMacCommand, PingCommand, ResolveDomainCommand, SetMultipleConnectionsCommand, WifiModeCommand,
};
use crate::responses::{labeled_value, typed_values};
use crate::transport::Transport;
use core::fmt::Debug;
use core::net::Ipv4Addr;
use core::str::FromStr;
use fugit_timer::Timer;
use heapless::String;

/// Max. length of a textual IPv4 address
pub const MAX_IP_LEN: usize = 15;

/// Length of a textual MAC address
pub const MAC_LEN: usize = 17;

/// Textual IPv4 address as returned by the modem
pub type IpString = String<MAX_IP_LEN>;

/// Wifi network adapter trait
pub trait WifiAdapter {
    /// Error of all WIFI operations
    type Error: Debug;

    /// Checks that the modem is responding (`AT`)
    fn ping(&mut self) -> Result<(), Self::Error>;

    /// Disables the echo of received commands
    fn disable_echo(&mut self) -> Result<(), Self::Error>;

    /// Switches to station mode
    fn set_station_mode(&mut self) -> Result<(), Self::Error>;

    /// Restricts the modem to a single TCP connection
    fn set_single_connection(&mut self) -> Result<(), Self::Error>;

    /// Connects to an WIFI access point
    fn join(&mut self, ssid: &str, key: &str) -> Result<(), Self::Error>;

    /// Disconnects from the current access point
    fn quit(&mut self) -> Result<(), Self::Error>;

    /// Resolves the IPv4 address of the given host name
    fn resolve_hostname(&mut self, host: &str) -> Result<IpString, Self::Error>;

    /// Returns the station MAC address
    fn get_mac(&mut self) -> Result<String<MAC_LEN>, Self::Error>;

    /// Returns local address information
    fn get_local_address(&mut self) -> Result<LocalAddress, Self::Error>;
}

impl<T: Transport, TM: Timer<TIMER_HZ>, const TIMER_HZ: u32, const N: usize> WifiAdapter
    for Adapter<'_, '_, T, TM, TIMER_HZ, N>
{
    type Error = Error;

    fn ping(&mut self) -> Result<(), Error> {
        self.send_command(&PingCommand)
    }

    fn disable_echo(&mut self) -> Result<(), Error> {
        self.send_command(&DisableEchoCommand)
    }

    fn set_station_mode(&mut self) -> Result<(), Error> {
        self.send_command(&WifiModeCommand::station_mode())
    }

    fn set_single_connection(&mut self) -> Result<(), Error> {
        self.send_command(&SetMultipleConnectionsCommand::single())
    }

    /// Connects to an WIFI access point
    ///
    /// SSID is limited to 32 and the key to 63 bytes.
    fn join(&mut self, ssid: &str, key: &str) -> Result<(), Error> {
        if ssid.len() > 32 {
            return Err(Error::InvalidSsidLength);
        }

        if key.len() > 63 {
            return Err(Error::InvalidPasswordLength);
        }

        let ssid = bounded(ssid).ok_or(Error::InvalidSsidLength)?;
        let key = bounded(key).ok_or(Error::InvalidPasswordLength)?;

        self.send_command(&AccessPointConnectCommand::new(ssid, key))?;
        info!("Joined access point");
        Ok(())
    }

    fn quit(&mut self) -> Result<(), Error> {
        self.send_command(&AccessPointDisconnectCommand)
    }

    /// Resolves the IPv4 address of the given host name
    ///
    /// The address is taken from the `+CIPDOMAIN:` line of the response. If the line is missing or the
    /// address exceeds 15 chars [Error::AddressParseError] is returned.
    fn resolve_hostname(&mut self, host: &str) -> Result<IpString, Error> {
        let command = ResolveDomainCommand::new(bounded(host).ok_or(Error::InvalidHostLength)?);

        let address = self.send_command_with(&command, |response| {
            labeled_value(response, b"CIPDOMAIN:").and_then(|value| bytes_to_string::<MAX_IP_LEN>(value))
        })?;

        let address = address.ok_or(Error::AddressParseError)?;
        debug!("Resolved {} to {}", host, address.as_str());
        Ok(address)
    }

    fn get_mac(&mut self) -> Result<String<MAC_LEN>, Error> {
        self.send_command_with(&ObtainMacCommand, |response| {
            labeled_value(response, b"CIPSTAMAC:").and_then(|value| bytes_to_string::<MAC_LEN>(value))
        })?
        .ok_or(Error::AddressParseError)
    }

    fn get_local_address(&mut self) -> Result<LocalAddress, Error> {
        self.send_command_with(&ObtainLocalAddressCommand, LocalAddress::from_response)?
    }
}

impl<T: Transport, TM: Timer<TIMER_HZ>, const TIMER_HZ: u32, const N: usize> Adapter<'_, '_, T, TM, TIMER_HZ, N> {
    /// Runs the usual start-up sequence: echo off, station mode, single connection and joining the
    /// given access point. Stops at the first failing command.
    pub fn bring_up(&mut self, ssid: &str, key: &str) -> Result<(), Error> {
        self.disable_echo()?;
        self.set_station_mode()?;
        self.set_single_connection()?;
        self.join(ssid, key)
    }
}

/// Local IP and MAC addresses
#[derive(Default, Clone, Debug, PartialEq)]
pub struct LocalAddress {
    /// Local IPv4 address if assigned
    pub ipv4: Option<Ipv4Addr>,

    /// Local MAC address
    pub mac: Option<String<MAC_LEN>>,
}

impl LocalAddress {
    /// Parses the `+CIFSR:<type>,"<address>"` lines
    pub(crate) fn from_response(response: &[u8]) -> Result<Self, Error> {
        let mut data = Self::default();

        for (address_type, address) in typed_values(response, b"+CIFSR:") {
            match address_type {
                b"STAIP" => {
                    let address = core::str::from_utf8(address).map_err(|_| Error::AddressParseError)?;
                    data.ipv4 = Some(Ipv4Addr::from_str(address).map_err(|_| Error::AddressParseError)?);
                }
                b"STAMAC" => data.mac = Some(bytes_to_string(address).ok_or(Error::AddressParseError)?),
                _ => {}
            }
        }

        Ok(data)
    }
}

/// Copies UTF-8 bytes to a bounded string. Returns None if invalid or too long.
fn bytes_to_string<const L: usize>(value: &[u8]) -> Option<String<L>> {
    bounded(core::str::from_utf8(value).ok()?)
}
