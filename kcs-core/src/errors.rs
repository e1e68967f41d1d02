// kcs-core
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type returned by the decoder pipeline.

use std::fmt;
use std::io;

/// `Error` enumerates every fatal condition the decoder pipeline can report. Conditions that are merely logged and recovered from locally (a failed start-bit
/// midpoint check, a bad stop bit, a refinement class underflow) are not represented here; they
/// are `log::warn!`/`log::debug!` records and ordinary control flow, not errors.
#[derive(Debug)]
pub enum Error {
    /// An IO error occurred while opening, reading, or writing a file.
    Io(io::Error),
    /// The waveform container was structurally malformed or declared an unsupported layout.
    Decode(&'static str),
    /// The decoder configuration (frame layout, window kind, CLI option combination) is invalid.
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Decode(msg) => write!(f, "malformed waveform: {msg}"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Returns a `Result::Err` containing a `Error::Decode` error.
#[macro_export]
macro_rules! decode_error {
    ($msg:expr) => {
        return Err($crate::errors::Error::Decode($msg))
    };
}

/// Returns a `Result::Err` containing a `Error::Config` error.
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        return Err($crate::errors::Error::Config(format!($($arg)*)))
    };
}
