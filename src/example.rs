//! Mocks for doc examples
use crate::channel::ByteChannel;
use crate::Error;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::{Deque, Vec};

/// Scripted peripheral mock, answering a fixed set of commands
#[derive(Default)]
pub struct ExampleChannel {
    /// Command received so far
    command: Vec<u8, 128>,

    /// Remaining payload bytes of an initiated transmission
    pending_payload: usize,

    /// Bytes to be received
    rx: Deque<u8, 512>,
}

impl ExampleChannel {
    fn respond(&mut self, response: &[u8]) {
        for byte in response {
            let _ = self.rx.push_back(*byte);
        }
    }

    fn handle_command(&mut self) {
        match self.command.as_slice() {
            b"AT\r\n" | b"AT+CWMODE=1\r\n" | b"ATE0\r\n" => self.respond(b"\r\nOK\r\n"),
            b"AT+CWJAP=\"test_wifi\",\"secret\"\r\n" => {
                self.respond(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
            }
            b"AT+CIFSR\r\n" => {
                self.respond(b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n\r\nOK\r\n");
            }
            b"AT+CIPSTART=\"TCP\",\"10.0.0.1\",80\r\n" => self.respond(b"\r\nOK\r\nCONNECT\r\n"),
            command if command.starts_with(b"AT+CIPSEND=") => {
                self.pending_payload = command[11..]
                    .iter()
                    .take_while(|byte| byte.is_ascii_digit())
                    .fold(0, |length, byte| length * 10 + (byte - b'0') as usize);
                self.respond(b"\r\nOK\r\n> ");
            }
            _ => self.respond(b"\r\nERROR\r\n"),
        }

        self.command.clear();
    }
}

impl ByteChannel for ExampleChannel {
    fn send_byte(&mut self, byte: u8) -> Result<(), Error> {
        if self.pending_payload > 0 {
            self.pending_payload -= 1;

            if self.pending_payload == 0 {
                self.respond(b"\r\nSEND OK\r\n+IPD,16:nice to see you!\r\nOK\r\n");
            }
            return Ok(());
        }

        let _ = self.command.push(byte);
        if self.command.ends_with(b"\r\n") {
            self.handle_command();
        }

        Ok(())
    }

    fn has_byte_pending(&mut self) -> bool {
        !self.rx.is_empty()
    }

    fn receive_byte(&mut self) -> nb::Result<u8, Error> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

/// Timer mock, never expiring
#[derive(Default)]
pub struct ExampleTimer {}

impl Timer<1_000_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1000000> {
        TimerInstantU32::from_ticks(0)
    }

    fn start(&mut self, _duration: TimerDurationU32<1000000>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        nb::Result::Err(nb::Error::WouldBlock)
    }
}
