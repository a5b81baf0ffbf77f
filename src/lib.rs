//! # ESP8266 AT-command engine
//!
//! Drives an ESP8266 Wi-Fi co-processor over a plain serial byte stream. The peripheral answers
//! commands with free-form text which ends with one of a few terminal literals (`OK`, `FAIL`,
//! `SEND OK`, ...). This crate classifies that stream in a single pass, frames inbound `+IPD`
//! data notifications and extracts address information.
//!
//! * [matcher]: multi-pattern response classification with timeout and poll bound
//! * [frame]: inbound data frames (`+IPD,<len>:<payload>`)
//! * [address]: IPv4 and MAC address extraction from `AT+CIFSR` replies
//! * [session]: public command verbs and the connection state machine
//! * [channel]: byte transport abstraction and adapters
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

#[cfg(test)]
extern crate alloc;

#[macro_use]
mod fmt;

pub mod address;
pub mod channel;
pub(crate) mod commands;
pub mod error;
#[cfg(feature = "examples")]
pub mod example;
pub mod frame;
pub mod matcher;
pub mod responses;
pub mod session;

pub use error::Error;
pub use responses::ResponseKind;

#[cfg(test)]
mod tests;
