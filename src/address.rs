//! # Local address extraction
//!
//! Parses the reply of `AT+CIFSR` directly from the channel:
//!
//! ```text
//! +CIFSR:STAIP,"192.168.0.17"
//! +CIFSR:STAMAC,"18:fe:34:a5:75:2f"
//! ```
//!
//! The IPv4 address is decoded incrementally into binary octets. Each octet is accumulated in 8
//! bits without overflow check, so `299` results in `43`.
//!
//! In SoftAP+Station mode the SoftAP line `+CIFSR:APIP,"..."` comes first. [AddressParser::parse_ap_ipv4]
//! looks for it by tag.
//!
//! The MAC address is kept as text.
use crate::channel::ByteChannel;
use crate::matcher::Matcher;
use crate::Error;
use fugit_timer::Timer;
use heapless::String;

/// Literal preceding the SoftAP IPv4 address
pub const AP_IP_TAG: &[u8] = b"APIP";

/// Literal preceding the station MAC address
pub const MAC_TAG: &[u8] = b"STAMAC";

/// Bytes dropped from the MAC address line
const MAC_EXCLUDED: [u8; 5] = [b'A', b'C', b',', b'"', b'\r'];

/// Text length of a MAC address, e.g. `aa:bb:cc:dd:ee:ff`
pub const MAC_LENGTH: usize = 17;

/// Consumer-style parser for address replies
pub struct AddressParser<'m, 'a, C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    matcher: &'m mut Matcher<'a, C, T, TIMER_HZ>,
}

impl<'m, 'a, C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> AddressParser<'m, 'a, C, T, TIMER_HZ> {
    pub fn new(matcher: &'m mut Matcher<'a, C, T, TIMER_HZ>) -> Self {
        Self { matcher }
    }

    /// Skips all bytes up to the first digit and parses four octets from there.
    ///
    /// Exactly one delimiter byte is expected between two octets.
    pub fn parse_ipv4(&mut self) -> Result<[u8; 4], Error> {
        self.matcher.begin()?;

        let mut received = loop {
            let byte = self.next_byte()?;
            if byte.is_ascii_digit() {
                break byte;
            }
        };

        let mut octets = [0x0; 4];
        for (index, octet) in octets.iter_mut().enumerate() {
            loop {
                *octet = octet.wrapping_mul(10).wrapping_add(received.wrapping_sub(b'0'));
                received = self.next_byte()?;

                if !received.is_ascii_digit() {
                    break;
                }
            }

            // Byte following the delimiter starts the next octet
            if index < octets.len() - 1 {
                received = self.next_byte()?;
            }
        }

        Ok(octets)
    }

    /// Waits for the SoftAP tag and parses the address following it
    pub fn parse_ap_ipv4(&mut self) -> Result<[u8; 4], Error> {
        if self.matcher.wait_for(AP_IP_TAG)?.is_none() {
            return Err(Error::Timeout);
        }

        self.parse_ipv4()
    }

    /// Waits for the MAC tag and collects the address text up to the end of line
    pub fn parse_mac(&mut self) -> Result<String<MAC_LENGTH>, Error> {
        if self.matcher.wait_for(MAC_TAG)?.is_none() {
            return Err(Error::Timeout);
        }

        self.matcher.begin()?;
        let mut address = String::new();

        loop {
            let byte = self.next_byte()?;
            if byte == b'\r' {
                return Ok(address);
            }

            if MAC_EXCLUDED.contains(&byte) {
                continue;
            }

            // Surplus bytes are dropped
            let _ = address.push(byte as char);
        }
    }

    fn next_byte(&mut self) -> Result<u8, Error> {
        self.matcher.next_byte()?.ok_or(Error::Timeout)
    }
}
