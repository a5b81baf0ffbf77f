//! # Inbound data frames
//!
//! Socket data is delivered by the peripheral as an unsolicited notification:
//!
//! ```text
//! +IPD,<length>:<payload>          single connection mode
//! +IPD,<link id>,<length>:<payload> multiple connections mode (AT+CIPMUX=1)
//! ```
//!
//! followed by a trailing `OK`. [FrameReader] waits for the notification, copies up to
//! `max_length` payload bytes to the caller's buffer and reads but drops the remaining ones, so
//! that the channel ends up at the frame boundary again. Truncation is intended behavior.
//!
//! Optionally a header block ending with an empty line (`\r\n\r\n`, e.g. HTTP headers) is
//! skipped. The header must be fully contained in the declared frame length, otherwise
//! [Error::HeaderNotFound] is returned.
use crate::channel::ByteChannel;
use crate::matcher::{Matcher, Within};
use crate::responses::ResponseKind;
use crate::Error;
use core::cmp::min;
use fugit_timer::Timer;

/// Start of an inbound data notification
pub const FRAME_MARKER: &[u8] = b"+IPD,";

/// End of a header block
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Outcome of reading a single frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameReport {
    /// Link ID, only present if multiple connections are enabled
    pub link_id: Option<u8>,

    /// Frame length as declared by the notification
    pub declared: u16,

    /// Length of the skipped header block (terminator included)
    pub header: u16,

    /// Payload bytes copied to the buffer
    pub copied: usize,

    /// Payload bytes read and dropped, as they exceeded the buffer
    pub discarded: usize,

    /// Response following the frame, either [ResponseKind::Ok] or [ResponseKind::Timeout].
    /// A missing trailer does not invalidate the copied payload.
    pub trailer: ResponseKind,
}

/// Reads `+IPD` frames
pub struct FrameReader<'m, 'a, C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> {
    matcher: &'m mut Matcher<'a, C, T, TIMER_HZ>,

    /// True if the notification contains a link ID
    multiple_connections: bool,
}

impl<'m, 'a, C: ByteChannel, T: Timer<TIMER_HZ>, const TIMER_HZ: u32> FrameReader<'m, 'a, C, T, TIMER_HZ> {
    pub fn new(matcher: &'m mut Matcher<'a, C, T, TIMER_HZ>) -> Self {
        Self {
            matcher,
            multiple_connections: false,
        }
    }

    /// Expects link IDs in notifications, as sent if multiple connections are enabled
    pub fn multiple_connections(mut self, enabled: bool) -> Self {
        self.multiple_connections = enabled;
        self
    }

    /// Waits for the next frame and copies its payload to the given buffer.
    ///
    /// At most `min(max_length, buffer.len() - 1)` bytes are copied, followed by a zero byte.
    ///
    /// Returns [Error::Timeout] if no frame started within the timeout budget, and
    /// [Error::IncompleteFrame] if a started frame did not complete.
    pub fn read_frame(
        &mut self,
        buffer: &mut [u8],
        max_length: usize,
        skip_header: bool,
    ) -> Result<FrameReport, Error> {
        if buffer.is_empty() {
            return Err(Error::BufferTooSmall);
        }

        if self.matcher.wait_for(FRAME_MARKER)?.is_none() {
            return Err(Error::Timeout);
        }

        self.matcher.begin()?;
        let mut link_id = None;
        let mut declared = self.read_number()?;

        if self.multiple_connections {
            link_id = Some(declared as u8);
            declared = self.read_number()?;
        }

        let mut header = 0;
        if skip_header {
            header = self.skip_header(declared)?;
        }
        let length = declared - header;

        self.matcher.begin()?;
        let copied = min(length as usize, min(max_length, buffer.len() - 1));
        for slot in buffer.iter_mut().take(copied) {
            *slot = self.next_byte()?;
        }
        buffer[copied] = 0;

        let mut discarded = 0;
        for _ in copied..length as usize {
            self.next_byte()?;
            discarded += 1;
        }

        let trailer = match self.matcher.wait_for(b"OK")? {
            Some(_) => ResponseKind::Ok,
            None => {
                warn!("Missing OK after +IPD frame");
                ResponseKind::Timeout
            }
        };

        debug!(
            "Received +IPD frame: declared {:?}, header {:?}, copied {:?}, discarded {:?}",
            declared,
            header,
            copied,
            discarded
        );

        Ok(FrameReport {
            link_id,
            declared,
            header,
            copied,
            discarded,
            trailer,
        })
    }

    /// Reads ASCII digits until the first non-digit, which is consumed too
    fn read_number(&mut self) -> Result<u16, Error> {
        let mut value: u16 = 0;

        loop {
            let byte = self.next_byte()?;
            if !byte.is_ascii_digit() {
                return Ok(value);
            }

            value = value.wrapping_mul(10).wrapping_add((byte - b'0') as u16);
        }
    }

    /// Consumes bytes up to the header terminator. Returns the number of consumed bytes.
    fn skip_header(&mut self, declared: u16) -> Result<u16, Error> {
        match self.matcher.wait_for_within(HEADER_TERMINATOR, declared as usize)? {
            // Limit ensures the consumed count fits the declared length
            Within::Found(consumed) => Ok(consumed as u16),
            Within::NotFound => {
                warn!("Header terminator not found within {:?} frame bytes", declared);
                Err(Error::HeaderNotFound)
            }
            Within::Timeout => Err(Error::IncompleteFrame),
        }
    }

    fn next_byte(&mut self) -> Result<u8, Error> {
        self.matcher.next_byte()?.ok_or(Error::IncompleteFrame)
    }
}
