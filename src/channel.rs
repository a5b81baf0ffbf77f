//! # Byte transport
//!
//! The engine talks to the peripheral through [ByteChannel]: sending single bytes and polling
//! for received ones. Receiving never blocks, timeouts are handled by the [Matcher](crate::matcher::Matcher).
//!
//! Two adapters are provided:
//!
//! * [SerialChannel] wraps any blocking [embedded_io] serial implementing [ReadReady]
//! * [QueueChannel] consumes bytes from a [heapless::spsc] queue, which is filled by the UART
//!   receive interrupt. Transmission is done by any [embedded_io::Write].
//!
//! ## Example
//!
//! ````
//! # use esp_at_link::channel::{ByteChannel, QueueChannel};
//! # use heapless::spsc::Queue;
//! # struct Uart;
//! # impl embedded_io::ErrorType for Uart { type Error = core::convert::Infallible; }
//! # impl embedded_io::Write for Uart {
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! let mut queue: Queue<u8, 64> = Queue::new();
//! let (mut producer, consumer) = queue.split();
//! let mut channel = QueueChannel::new(consumer, Uart);
//!
//! // Called by the UART receive interrupt
//! producer.enqueue(b'O').unwrap();
//!
//! assert!(channel.has_byte_pending());
//! assert_eq!(b'O', channel.receive_byte().unwrap());
//! ````
use crate::Error;
use embedded_io::{Read, ReadReady, Write};
use heapless::spsc::Consumer;

/// Synchronous byte level access to the peripheral
pub trait ByteChannel {
    /// Sends a single byte
    fn send_byte(&mut self, byte: u8) -> Result<(), Error>;

    /// Sends all given bytes
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for byte in bytes {
            self.send_byte(*byte)?;
        }

        Ok(())
    }

    /// Returns true if at least one received byte is waiting
    fn has_byte_pending(&mut self) -> bool;

    /// Returns the next received byte or [nb::Error::WouldBlock] if none is pending
    fn receive_byte(&mut self) -> nb::Result<u8, Error>;
}

/// Channel on top of a blocking [embedded_io] serial
pub struct SerialChannel<S: Read + Write + ReadReady> {
    serial: S,
}

impl<S: Read + Write + ReadReady> SerialChannel<S> {
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    /// Returns the wrapped serial
    pub fn release(self) -> S {
        self.serial
    }
}

impl<S: Read + Write + ReadReady> ByteChannel for SerialChannel<S> {
    fn send_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.serial.write_all(&[byte]).map_err(|_| Error::Channel)
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.serial.write_all(bytes).map_err(|_| Error::Channel)?;
        self.serial.flush().map_err(|_| Error::Channel)
    }

    fn has_byte_pending(&mut self) -> bool {
        self.serial.read_ready().unwrap_or(false)
    }

    fn receive_byte(&mut self) -> nb::Result<u8, Error> {
        if !self.serial.read_ready().map_err(|_| nb::Error::Other(Error::Channel))? {
            return Err(nb::Error::WouldBlock);
        }

        let mut buffer = [0x0; 1];
        match self.serial.read(&mut buffer) {
            Ok(1) => Ok(buffer[0]),
            Ok(_) => Err(nb::Error::WouldBlock),
            Err(_) => Err(nb::Error::Other(Error::Channel)),
        }
    }
}

/// Channel receiving from a single-producer queue, which gets filled by an interrupt handler
///
/// N: Capacity of the queue
pub struct QueueChannel<'q, W: Write, const N: usize> {
    /// Receiving end of the interrupt queue
    rx: Consumer<'q, u8, N>,

    /// Transmitting serial
    tx: W,
}

impl<'q, W: Write, const N: usize> QueueChannel<'q, W, N> {
    pub fn new(rx: Consumer<'q, u8, N>, tx: W) -> Self {
        Self { rx, tx }
    }

    /// Returns the queue consumer and the transmitting serial
    pub fn release(self) -> (Consumer<'q, u8, N>, W) {
        (self.rx, self.tx)
    }
}

impl<W: Write, const N: usize> ByteChannel for QueueChannel<'_, W, N> {
    fn send_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.tx.write_all(&[byte]).map_err(|_| Error::Channel)
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.tx.write_all(bytes).map_err(|_| Error::Channel)?;
        self.tx.flush().map_err(|_| Error::Channel)
    }

    fn has_byte_pending(&mut self) -> bool {
        self.rx.ready()
    }

    fn receive_byte(&mut self) -> nb::Result<u8, Error> {
        self.rx.dequeue().ok_or(nb::Error::WouldBlock)
    }
}
