use atat::atat_derive::AtatResp;

/// Commands which gets just responded by OK
#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Terminal response of the peripheral, result of a single classification
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseKind {
    /// `OK`
    Ok,
    /// `ready`, emitted after a restart
    Ready,
    /// `FAIL`
    Fail,
    /// `no change`
    NoChange,
    /// `CONNECT`, link established
    Linked,
    /// `,CLOSE`, link closed
    Unlinked,
    /// `ERROR`
    Error,
    /// `no ip`
    NoIp,
    /// `type error`
    TypeError,
    /// `SEND OK`
    SendOk,
    /// `link is` (not valid)
    NoLink,
    /// No terminal response within the timeout budget. Never present on the wire.
    Timeout,
}

impl ResponseKind {
    /// True for responses which signal a failed command
    pub fn is_failure(self) -> bool {
        matches!(self, ResponseKind::Fail | ResponseKind::Error | ResponseKind::Timeout)
    }

    /// Wire literal of the response, None for [ResponseKind::Timeout]
    pub fn literal(self) -> Option<&'static [u8]> {
        CATALOGUE
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(literal, _)| *literal)
    }
}

/// Terminal responses recognized by the session
pub const CATALOGUE: [(&[u8], ResponseKind); 11] = [
    (b"OK", ResponseKind::Ok),
    (b"ready", ResponseKind::Ready),
    (b"FAIL", ResponseKind::Fail),
    (b"no change", ResponseKind::NoChange),
    (b"CONNECT", ResponseKind::Linked),
    (b",CLOSE", ResponseKind::Unlinked),
    (b"ERROR", ResponseKind::Error),
    (b"no ip", ResponseKind::NoIp),
    (b"type error", ResponseKind::TypeError),
    (b"SEND OK", ResponseKind::SendOk),
    (b"link is", ResponseKind::NoLink),
];

/// Automaton states needed by [CATALOGUE], root included
pub const CATALOGUE_STATES: usize = 80;
