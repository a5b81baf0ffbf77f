use crate::responses::NoResponse;
use atat::atat_derive::AtatCmd;
use atat::heapless::String;

/// Max. encoded length of any command
pub const COMMAND_BUFFER_SIZE: usize = 256;

/// Plain `AT`, responded by OK once the module is up
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, timeout_ms = 1_000)]
pub struct AttentionCommand;

/// Software restart of the module
#[derive(Clone, AtatCmd)]
#[at_cmd("+RST", NoResponse, timeout_ms = 5_000)]
pub struct RestartCommand;

/// Disables the command echo
#[derive(Clone, AtatCmd)]
#[at_cmd("E0", NoResponse, timeout_ms = 1_000)]
pub struct EchoOffCommand;

/// Enables the command echo
#[derive(Clone, AtatCmd)]
#[at_cmd("E1", NoResponse, timeout_ms = 1_000)]
pub struct EchoOnCommand;

/// Sets the WIFI mode
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWMODE", NoResponse, timeout_ms = 1_000)]
pub struct WifiModeCommand {
    /// WIFI mode:
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    #[at_arg(position = 0)]
    mode: u8,
}

impl WifiModeCommand {
    pub fn new(mode: u8) -> Self {
        Self { mode }
    }
}

/// Command for setting the target WIFI access point parameters
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWJAP", NoResponse, timeout_ms = 20_000)]
pub struct AccessPointConnectCommand {
    /// The SSID of the target access point
    #[at_arg(position = 0)]
    ssid: String<32>,

    /// The password/key of the target access point
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
#[at_cmd("+CWQAP", NoResponse, timeout_ms = 1_000)]
pub struct AccessPointDisconnectCommand;

/// Configures the SoftAP of the module
#[derive(Clone, AtatCmd)]
#[at_cmd("+CWSAP", NoResponse, timeout_ms = 5_000)]
pub struct SoftApConfigCommand {
    #[at_arg(position = 0)]
    ssid: String<32>,

    #[at_arg(position = 1)]
    password: String<64>,

    /// WIFI channel
    #[at_arg(position = 2)]
    channel: u8,

    /// 0: open, 2: WPA_PSK, 3: WPA2_PSK, 4: WPA_WPA2_PSK
    #[at_arg(position = 3)]
    encryption: u8,
}

impl SoftApConfigCommand {
    pub fn new(ssid: String<32>, password: String<64>, channel: u8, encryption: u8) -> Self {
        Self {
            ssid,
            password,
            channel,
            encryption,
        }
    }
}

/// Command for receiving local address information including IP and MAC
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIFSR", NoResponse, timeout_ms = 5_000)]
pub struct ObtainLocalAddressCommand;

/// Enables/Disables multiple connections
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPMUX", NoResponse, timeout_ms = 1_000)]
pub struct SetMultipleConnectionsCommand {
    /// 0: single connection, 1: multiple connections
    mode: u8,
}

impl SetMultipleConnectionsCommand {
    pub fn new(enabled: bool) -> Self {
        Self { mode: enabled as u8 }
    }
}

/// Creates or deletes a TCP server
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSERVER", NoResponse, timeout_ms = 1_000)]
pub struct ServerCommand {
    /// 0: delete server, 1: create server
    mode: u8,

    port: u16,
}

impl ServerCommand {
    pub fn new(mode: u8, port: u16) -> Self {
        Self { mode, port }
    }
}

/// Establish TCP Connection or UDP Transmission
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSTART", NoResponse, timeout_ms = 5_000, attempts = 1)]
pub struct ConnectCommand {
    /// Connection type, TCP or UDP
    connection_type: String<3>,

    /// Remote IPv4 address or host name
    remote_host: String<64>,

    /// Remote port
    port: u16,
}

impl ConnectCommand {
    pub fn new(connection_type: String<3>, remote_host: String<64>, port: u16) -> Self {
        Self {
            connection_type,
            remote_host,
            port,
        }
    }
}

/// Initiates the transmission of data, module answers with a `>` prompt
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 5_000)]
pub struct TransmissionPrepareCommand {
    /// Length of the data to send
    length: usize,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

/// Initiates the transmission of data on a link, if multiple connections are enabled
#[derive(Clone, AtatCmd)]
#[at_cmd("+CIPSEND", NoResponse, timeout_ms = 5_000)]
pub struct LinkTransmissionPrepareCommand {
    /// Socket ID
    link_id: u8,

    /// Length of the data to send
    length: usize,
}

impl LinkTransmissionPrepareCommand {
    pub fn new(link_id: u8, length: usize) -> Self {
        Self { link_id, length }
    }
}
