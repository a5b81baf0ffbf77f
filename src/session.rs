//! # Command session
//!
//! [Session] owns the channel and the timer and issues exactly one command at a time. Each verb
//! writes its AT command and classifies the reply before returning.
//!
//! Device side failures (`FAIL`, `ERROR`, no reply) are returned as `false` or as
//! [ResponseKind]. The classification which decided the last result is available by
//! [Session::last_response]. Commands are never retried.
//!
//! ## States
//!
//! ```text
//! Idle -> Started -> ModeSet -> Joined -> SocketOpen
//!                                     \-> Closed (disconnect, from any state)
//! ```
//!
//! A timeout or an `ERROR` reply moves the session to [SessionState::Error], as the channel
//! position is undefined afterwards. [Session::restart], [Session::disconnect] and a successful
//! [Session::is_started] leave that state.
//!
//! ## Example
//!
//! ````
//! # use esp_at_link::example::{ExampleChannel, ExampleTimer};
//! # use esp_at_link::session::{Protocol, Session, SessionState, WifiMode};
//! #
//! let channel = ExampleChannel::default();
//! let mut session: Session<_, _, 1_000_000> = Session::new(channel, ExampleTimer::default()).unwrap();
//!
//! assert!(session.is_started().unwrap());
//! session.set_mode(WifiMode::STATION).unwrap();
//! session.join("test_wifi", "secret").unwrap();
//!
//! let ip = session.get_ip().unwrap();
//! assert_eq!([10, 0, 0, 181], ip.octets());
//!
//! // Opening a TCP connection and sending data
//! assert!(session.open(Protocol::Tcp, "10.0.0.1", 80).unwrap());
//! assert!(session.send(b"hallo!").unwrap());
//! assert_eq!(SessionState::SocketOpen, session.state());
//!
//! // Receiving data
//! let mut buffer = [0x0; 64];
//! let length = session.receive(&mut buffer, 63, false).unwrap();
//! assert_eq!(b"nice to see you!", &buffer[..length]);
//! ````
use crate::address::{AddressParser, MAC_LENGTH};
use crate::channel::ByteChannel;
use crate::commands::{
    AccessPointConnectCommand, AccessPointDisconnectCommand, AttentionCommand, ConnectCommand, EchoOffCommand,
    EchoOnCommand, LinkTransmissionPrepareCommand, ObtainLocalAddressCommand, RestartCommand, ServerCommand,
    SetMultipleConnectionsCommand, SoftApConfigCommand, TransmissionPrepareCommand, WifiModeCommand,
    COMMAND_BUFFER_SIZE,
};
use crate::frame::{FrameReader, FrameReport};
use crate::matcher::{Catalogue, Matcher, PatternTable};
use crate::responses::ResponseKind;
use crate::Error;
use atat::AtatCmd;
use core::ops::BitOr;
use embedded_nal::{Ipv4Addr, SocketAddrV4};
use fugit::TimerDurationU32;
use fugit_timer::Timer;
use numtoa::NumToA;

/// Default budget of a single wait, in ms
pub const DEFAULT_TIMEOUT_MS: u32 = 6_000;

/// Default max. number of loop iterations of a single wait
pub const DEFAULT_MAX_POLLS: u32 = 100_000_000;

/// Max. payload length of a single transmission
pub const MAX_PAYLOAD_LENGTH: usize = 2048;

/// Max. number of `CONNECT` lines skipped while joining
const MAX_JOIN_STATUS_LINES: usize = 4;

/// Session state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Nothing confirmed yet
    Idle,
    /// Module answered `AT` or restarted
    Started,
    /// WIFI mode was set
    ModeSet,
    /// Joined to an access point
    Joined,
    /// TCP/UDP link established
    SocketOpen,
    /// Disconnected from the access point
    Closed,
    /// Device error or timeout, channel position is undefined
    Error,
}

impl SessionState {
    /// True if the module is known to be up and synchronized
    pub fn is_started(self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Error)
    }
}

/// Bitmask of WIFI modes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WifiMode(u8);

impl WifiMode {
    /// Station mode
    pub const STATION: WifiMode = WifiMode(0x01);

    /// Access point mode
    pub const SOFT_AP: WifiMode = WifiMode(0x02);

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for WifiMode {
    type Output = WifiMode;

    fn bitor(self, rhs: Self) -> Self::Output {
        WifiMode(self.0 | rhs.0)
    }
}

/// Transport protocol of a link
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// Server mode of `AT+CIPSERVER`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServerMode {
    /// Deletes the server, module needs to be restarted afterwards
    Delete = 0,
    /// Creates a server listening on the given port
    Create = 1,
}

/// Encryption of the SoftAP
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Encryption {
    Open = 0,
    WpaPsk = 2,
    Wpa2Psk = 3,
    WpaWpa2Psk = 4,
}

/// Central client for the AT command communication
///
/// TIMER_HZ: Frequency of the timer used for timeout measurement
pub struct Session<C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    /// Byte transport
    pub(crate) channel: C,

    /// Timer used for timeout measurement
    pub(crate) timer: T,

    /// Budget of every single wait
    timeout: TimerDurationU32<TIMER_HZ>,

    /// Max. loop iterations of every single wait
    max_polls: u32,

    /// Terminal responses
    catalogue: Catalogue,

    pub(crate) state: SessionState,

    /// Classification which decided the result of the last command
    last_response: Option<ResponseKind>,

    /// True if multiple connections have been enabled
    pub(crate) multi_connections_enabled: bool,
}

impl<C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> Session<C, T, TIMER_HZ> {
    /// Creates a new session
    pub fn new(channel: C, timer: T) -> Result<Self, Error> {
        Ok(Self {
            channel,
            timer,
            timeout: TimerDurationU32::millis(DEFAULT_TIMEOUT_MS),
            max_polls: DEFAULT_MAX_POLLS,
            catalogue: PatternTable::catalogue()?,
            state: SessionState::Idle,
            last_response: None,
            multi_connections_enabled: false,
        })
    }

    /// Sets the timeout of every single wait in ms
    pub fn set_timeout_ms(&mut self, timeout: u32) {
        self.timeout = TimerDurationU32::millis(timeout);
    }

    /// Sets the max. number of polling iterations of every single wait.
    /// Bounds waits independently of the timer and should exceed the iterations run within the timeout.
    pub fn set_max_polls(&mut self, max_polls: u32) {
        self.max_polls = max_polls;
    }

    /// Returns the current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the classification which decided the result of the last command
    pub fn last_response(&self) -> Option<ResponseKind> {
        self.last_response
    }

    /// Returns channel and timer
    pub fn release(self) -> (C, T) {
        (self.channel, self.timer)
    }

    /// Sends `AT` and returns true if the module responded with OK
    pub fn is_started(&mut self) -> Result<bool, Error> {
        self.send_command(&AttentionCommand)?;
        let response = self.classify()?;
        self.settle(response);

        if response != ResponseKind::Ok {
            return Ok(false);
        }

        if matches!(self.state, SessionState::Idle | SessionState::Error) {
            self.transition(SessionState::Started);
        }

        Ok(true)
    }

    /// Restarts the module. Returns true if the restart was confirmed by OK and ready.
    ///
    /// Some firmware versions skip the OK, so a direct ready is accepted too.
    pub fn restart(&mut self) -> Result<bool, Error> {
        self.send_command(&RestartCommand)?;
        self.multi_connections_enabled = false;

        let mut response = self.classify()?;
        if response == ResponseKind::Ok {
            response = self.classify()?;
        }
        self.settle(response);

        if response != ResponseKind::Ready {
            return Ok(false);
        }

        self.transition(SessionState::Started);
        Ok(true)
    }

    /// Enables or disables the echo of commands
    pub fn set_echo(&mut self, enabled: bool) -> Result<bool, Error> {
        match enabled {
            true => self.send_command(&EchoOnCommand)?,
            false => self.send_command(&EchoOffCommand)?,
        }

        self.expect_ok()
    }

    /// Sets the WIFI mode. Any terminal response is accepted.
    pub fn set_mode(&mut self, mode: WifiMode) -> Result<ResponseKind, Error> {
        self.require_started()?;

        self.send_command(&WifiModeCommand::new(mode.bits()))?;
        let response = self.classify()?;

        if response == ResponseKind::Timeout {
            self.settle(response);
            return Ok(response);
        }

        self.last_response = Some(response);
        self.transition(SessionState::ModeSet);
        Ok(response)
    }

    /// Connects to an access point. Returns the terminal response, [ResponseKind::Ok] on success.
    pub fn join(&mut self, ssid: &str, password: &str) -> Result<ResponseKind, Error> {
        self.require(&[SessionState::ModeSet, SessionState::Joined, SessionState::Closed])?;

        let ssid = fixed_string(ssid, Error::InvalidSsidLength)?;
        let password = fixed_string(password, Error::InvalidPasswordLength)?;
        self.send_command(&AccessPointConnectCommand::new(ssid, password))?;

        // "WIFI CONNECTED" status line precedes the terminal response
        let mut response = self.classify()?;
        for _ in 0..MAX_JOIN_STATUS_LINES {
            if response != ResponseKind::Linked {
                break;
            }
            response = self.classify()?;
        }
        self.settle(response);

        if response == ResponseKind::Ok {
            self.transition(SessionState::Joined);
        }

        Ok(response)
    }

    /// Disconnects from the access point
    pub fn disconnect(&mut self) -> Result<bool, Error> {
        self.send_command(&AccessPointDisconnectCommand)?;
        let response = self.classify()?;
        self.settle(response);

        if response != ResponseKind::Ok {
            return Ok(false);
        }

        self.transition(SessionState::Closed);
        Ok(true)
    }

    /// Returns the first IPv4 address listed by the module
    pub fn get_ip(&mut self) -> Result<Ipv4Addr, Error> {
        self.send_command(&ObtainLocalAddressCommand)?;

        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        let result = AddressParser::new(&mut matcher).parse_ipv4();
        let octets = self.settle_value(result)?;

        Ok(Ipv4Addr::from(octets))
    }

    /// Returns the SoftAP IPv4 address, requires SoftAP mode
    pub fn get_ap_ip(&mut self) -> Result<Ipv4Addr, Error> {
        self.send_command(&ObtainLocalAddressCommand)?;

        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        let result = AddressParser::new(&mut matcher).parse_ap_ipv4();
        let octets = self.settle_value(result)?;

        Ok(Ipv4Addr::from(octets))
    }

    /// Returns the station MAC address as text, e.g. `18:fe:34:a5:75:2f`
    pub fn get_mac(&mut self) -> Result<heapless::String<MAC_LENGTH>, Error> {
        self.send_command(&ObtainLocalAddressCommand)?;

        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        let result = AddressParser::new(&mut matcher).parse_mac();
        self.settle_value(result)
    }

    /// Opens a TCP or UDP link. Returns true if the link was confirmed by OK and CONNECT.
    pub fn open(&mut self, protocol: Protocol, host: &str, port: u16) -> Result<bool, Error> {
        self.require(&[SessionState::Joined])?;

        let mut connection_type = atat::heapless::String::new();
        let _ = connection_type.push_str(protocol.as_str());
        let remote_host = fixed_string(host, Error::InvalidHostLength)?;
        self.send_command(&ConnectCommand::new(connection_type, remote_host, port))?;

        let response = self.classify()?;
        if response != ResponseKind::Ok {
            self.settle(response);
            return Ok(false);
        }

        let response = self.classify()?;
        self.settle(response);

        if response != ResponseKind::Linked {
            return Ok(false);
        }

        self.transition(SessionState::SocketOpen);
        Ok(true)
    }

    /// Opens a link to the given IPv4 socket address
    pub fn open_addr(&mut self, protocol: Protocol, remote: SocketAddrV4) -> Result<bool, Error> {
        let mut host: heapless::String<15> = heapless::String::new();
        let mut buffer = [0x0; 3];

        for (index, octet) in remote.ip().octets().iter().enumerate() {
            if index > 0 {
                let _ = host.push('.');
            }

            for digit in octet.numtoa(10, &mut buffer) {
                let _ = host.push(*digit as char);
            }
        }

        self.open(protocol, host.as_str(), remote.port())
    }

    /// Sends data over the open link. Returns true if confirmed by SEND OK.
    pub fn send(&mut self, data: &[u8]) -> Result<bool, Error> {
        self.require(&[SessionState::SocketOpen])?;
        Self::assert_payload_length(data)?;

        self.send_command(&TransmissionPrepareCommand::new(data.len()))?;
        self.transmit(data)
    }

    /// Sends data over the given link, if multiple connections are enabled
    pub fn send_to(&mut self, link_id: u8, data: &[u8]) -> Result<bool, Error> {
        self.require_multi_connections()?;
        Self::assert_payload_length(data)?;

        self.send_command(&LinkTransmissionPrepareCommand::new(link_id, data.len()))?;
        self.transmit(data)
    }

    /// Waits for inbound data and copies up to `max_length` bytes to the given buffer.
    /// A terminating zero byte is written after the data, so the buffer needs space for one extra byte.
    ///
    /// If `skip_header` is set, everything up to the first empty line is dropped (e.g. HTTP headers).
    /// Returns the number of copied bytes.
    pub fn receive(&mut self, buffer: &mut [u8], max_length: usize, skip_header: bool) -> Result<usize, Error> {
        Ok(self.receive_frame(buffer, max_length, skip_header)?.copied)
    }

    /// Like `receive()`, but returns the details of the received frame
    pub fn receive_frame(
        &mut self,
        buffer: &mut [u8],
        max_length: usize,
        skip_header: bool,
    ) -> Result<FrameReport, Error> {
        match self.multi_connections_enabled {
            true => self.require_multi_connections()?,
            false => self.require(&[SessionState::SocketOpen])?,
        }

        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        let result = FrameReader::new(&mut matcher)
            .multiple_connections(self.multi_connections_enabled)
            .read_frame(buffer, max_length, skip_header);

        match result {
            Ok(report) => {
                self.last_response = Some(report.trailer);
                Ok(report)
            }
            // No frame started, so the channel is still in sync
            Err(Error::Timeout) => {
                self.last_response = Some(ResponseKind::Timeout);
                Err(Error::Timeout)
            }
            Err(error) => {
                self.last_response = Some(ResponseKind::Timeout);
                self.transition(SessionState::Error);
                Err(error)
            }
        }
    }

    /// Configures the SoftAP
    pub fn configure_soft_ap(
        &mut self,
        ssid: &str,
        password: &str,
        channel: u8,
        encryption: Encryption,
    ) -> Result<bool, Error> {
        self.require_started()?;

        let ssid = fixed_string(ssid, Error::InvalidSsidLength)?;
        let password = fixed_string(password, Error::InvalidPasswordLength)?;
        self.send_command(&SoftApConfigCommand::new(ssid, password, channel, encryption as u8))?;

        self.expect_response(ResponseKind::Ok)
    }

    /// Enables or disables multiple connections.
    /// Can only be changed while no link is open.
    pub fn set_multiple_connections(&mut self, enabled: bool) -> Result<bool, Error> {
        self.require_started()?;

        self.send_command(&SetMultipleConnectionsCommand::new(enabled))?;
        let confirmed = self.expect_response(ResponseKind::Ok)?;

        if confirmed {
            self.multi_connections_enabled = enabled;
        }

        Ok(confirmed)
    }

    /// Creates or deletes the TCP server. Requires multiple connections.
    pub fn configure_server(&mut self, mode: ServerMode, port: u16) -> Result<bool, Error> {
        self.require_multi_connections()?;

        self.send_command(&ServerCommand::new(mode as u8, port))?;
        self.expect_response(ResponseKind::Ok)
    }

    /// Waits for the prompt, writes the payload and waits for the confirmation
    fn transmit(&mut self, data: &[u8]) -> Result<bool, Error> {
        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        if !matcher.wait_for_byte(b'>')? {
            self.settle(ResponseKind::Timeout);
            return Ok(false);
        }

        self.channel.send_all(data)?;
        let response = self.classify()?;
        self.settle(response);

        if response == ResponseKind::Unlinked && self.state == SessionState::SocketOpen {
            self.transition(SessionState::Joined);
        }

        Ok(response == ResponseKind::SendOk)
    }

    /// Classifies the next reply and returns true if it matches the expected response
    fn expect_response(&mut self, expected: ResponseKind) -> Result<bool, Error> {
        let response = self.classify()?;
        self.settle(response);
        Ok(response == expected)
    }

    /// Waits for a plain OK
    fn expect_ok(&mut self) -> Result<bool, Error> {
        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        let response = match matcher.wait_for(b"OK")? {
            Some(_) => ResponseKind::Ok,
            None => ResponseKind::Timeout,
        };

        self.settle(response);
        Ok(response == ResponseKind::Ok)
    }

    /// Consumes the final OK of a value reply and records the outcome
    fn settle_value<V>(&mut self, result: Result<V, Error>) -> Result<V, Error> {
        let value = match result {
            Ok(value) => value,
            Err(error) => {
                if error == Error::Timeout {
                    self.settle(ResponseKind::Timeout);
                }
                return Err(error);
            }
        };

        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        match matcher.wait_for(b"OK")? {
            Some(_) => self.last_response = Some(ResponseKind::Ok),
            None => {
                warn!("Missing OK after address reply");
                self.last_response = Some(ResponseKind::Timeout);
            }
        }

        Ok(value)
    }

    /// Classifies the next reply by the response catalogue
    fn classify(&mut self) -> Result<ResponseKind, Error> {
        let mut matcher = Matcher::new(&mut self.channel, &mut self.timer, self.timeout, self.max_polls);
        matcher.classify(&self.catalogue)
    }

    /// Records the response and enters the error state on device errors and timeouts
    fn settle(&mut self, response: ResponseKind) {
        self.last_response = Some(response);

        if matches!(response, ResponseKind::Error | ResponseKind::Timeout) {
            self.transition(SessionState::Error);
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Encodes and sends the given command
    fn send_command<Cmd: AtatCmd>(&mut self, command: &Cmd) -> Result<(), Error> {
        let mut buffer = [0x0; COMMAND_BUFFER_SIZE];
        let length = command.write(&mut buffer);

        trace!("Sending command {:?}", core::str::from_utf8(&buffer[..length]).unwrap_or("<binary>"));
        self.channel.send_all(&buffer[..length])
    }

    fn require(&self, allowed: &[SessionState]) -> Result<(), Error> {
        if allowed.contains(&self.state) {
            return Ok(());
        }

        Err(Error::InvalidState(self.state))
    }

    fn require_started(&self) -> Result<(), Error> {
        if self.state.is_started() {
            return Ok(());
        }

        Err(Error::InvalidState(self.state))
    }

    fn require_multi_connections(&self) -> Result<(), Error> {
        if self.multi_connections_enabled && self.state.is_started() {
            return Ok(());
        }

        Err(Error::InvalidState(self.state))
    }

    fn assert_payload_length(data: &[u8]) -> Result<(), Error> {
        if data.len() > MAX_PAYLOAD_LENGTH {
            return Err(Error::PayloadTooLarge);
        }

        Ok(())
    }
}

/// Copies the given text to a fixed capacity string
fn fixed_string<const N: usize>(text: &str, error: Error) -> Result<atat::heapless::String<N>, Error> {
    let mut string = atat::heapless::String::new();
    string.push_str(text).map_err(|_| error)?;
    Ok(string)
}
