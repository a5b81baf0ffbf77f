use crate::matcher::PatternError;
use crate::session::SessionState;
use core::fmt::{Display, Formatter};

/// Errors of the command engine
///
/// Device side failures like `FAIL` or `ERROR` are not errors of this type. They are returned as
/// [ResponseKind](crate::ResponseKind) or as a `false` result of the command.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Reading from or writing to the byte transport failed
    Channel,

    /// Upstream timer error
    Timer,

    /// The timeout budget was exhausted before the expected data arrived
    Timeout,

    /// Inbound frame started, but its bytes stopped arriving within the timeout budget
    IncompleteFrame,

    /// Command is not allowed in the current session state
    InvalidState(SessionState),

    /// The header terminator was not found within the declared frame length
    HeaderNotFound,

    /// Receive buffer has no room for the terminating zero byte
    BufferTooSmall,

    /// Given SSD is longer then the max. size of 32 chars
    InvalidSsidLength,

    /// Given password is longer then the max. size of 64 chars
    InvalidPasswordLength,

    /// Given remote host is longer then the max. size of 64 chars
    InvalidHostLength,

    /// Payload exceeds the max. length of a single transmission (2048 bytes)
    PayloadTooLarge,

    /// Invalid response pattern table
    Pattern(PatternError),
}

impl From<PatternError> for Error {
    fn from(error: PatternError) -> Self {
        Error::Pattern(error)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Channel => write!(f, "byte transport failed"),
            Error::Timer => write!(f, "timer failed"),
            Error::Timeout => write!(f, "timeout"),
            Error::IncompleteFrame => write!(f, "incomplete inbound frame"),
            Error::InvalidState(state) => write!(f, "command not allowed in state {:?}", state),
            Error::HeaderNotFound => write!(f, "header terminator not found within frame"),
            Error::BufferTooSmall => write!(f, "receive buffer too small"),
            Error::InvalidSsidLength => write!(f, "SSID too long"),
            Error::InvalidPasswordLength => write!(f, "password too long"),
            Error::InvalidHostLength => write!(f, "remote host too long"),
            Error::PayloadTooLarge => write!(f, "payload too large"),
            Error::Pattern(error) => write!(f, "invalid pattern table: {:?}", error),
        }
    }
}
