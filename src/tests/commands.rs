use crate::commands::{
    AccessPointConnectCommand, AccessPointDisconnectCommand, AttentionCommand, ConnectCommand, EchoOffCommand,
    LinkTransmissionPrepareCommand, ObtainLocalAddressCommand, RestartCommand, ServerCommand,
    SetMultipleConnectionsCommand, SoftApConfigCommand, TransmissionPrepareCommand, WifiModeCommand,
    COMMAND_BUFFER_SIZE,
};
use alloc::string::String;
use atat::heapless::String as FixedString;
use atat::AtatCmd;

fn encode<Cmd: AtatCmd>(command: &Cmd) -> String {
    let mut buffer = [0x0; COMMAND_BUFFER_SIZE];
    let length = command.write(&mut buffer);
    String::from_utf8(buffer[..length].to_vec()).unwrap()
}

fn fixed<const N: usize>(text: &str) -> FixedString<N> {
    let mut string = FixedString::new();
    string.push_str(text).unwrap();
    string
}

#[test]
fn test_plain_commands() {
    assert_eq!("AT\r\n", encode(&AttentionCommand));
    assert_eq!("AT+RST\r\n", encode(&RestartCommand));
    assert_eq!("ATE0\r\n", encode(&EchoOffCommand));
    assert_eq!("AT+CWQAP\r\n", encode(&AccessPointDisconnectCommand));
    assert_eq!("AT+CIFSR\r\n", encode(&ObtainLocalAddressCommand));
}

#[test]
fn test_wifi_mode_command() {
    assert_eq!("AT+CWMODE=3\r\n", encode(&WifiModeCommand::new(3)));
}

#[test]
fn test_access_point_connect_command() {
    let command = AccessPointConnectCommand::new(fixed("test_wifi"), fixed("secret"));
    assert_eq!("AT+CWJAP=\"test_wifi\",\"secret\"\r\n", encode(&command));
}

#[test]
fn test_soft_ap_config_command() {
    let command = SoftApConfigCommand::new(fixed("esp"), fixed("password"), 5, 3);
    assert_eq!("AT+CWSAP=\"esp\",\"password\",5,3\r\n", encode(&command));
}

#[test]
fn test_connection_commands() {
    assert_eq!("AT+CIPMUX=1\r\n", encode(&SetMultipleConnectionsCommand::new(true)));
    assert_eq!("AT+CIPSERVER=1,80\r\n", encode(&ServerCommand::new(1, 80)));

    let command = ConnectCommand::new(fixed("TCP"), fixed("10.0.0.1"), 8080);
    assert_eq!("AT+CIPSTART=\"TCP\",\"10.0.0.1\",8080\r\n", encode(&command));
}

#[test]
fn test_transmission_commands() {
    assert_eq!("AT+CIPSEND=2048\r\n", encode(&TransmissionPrepareCommand::new(2048)));
    assert_eq!("AT+CIPSEND=3,12\r\n", encode(&LinkTransmissionPrepareCommand::new(3, 12)));
}
