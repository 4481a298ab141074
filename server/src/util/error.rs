/*
 * This file is part of the mpp project.
 * Licensed under the GNU Affero General Public License v3.0 or later.
 */

//! Ambient error type for everything that isn't a protocol-level
//! parser failure code: startup, configuration, and I/O failures.

use std::fmt;
use std::io::Error as IoError;

pub type MppResult<T> = Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IoError(IoError),
    IoErrorExtra(IoError, String),
    ConfigError(String),
}

impl Error {
    pub fn ioerror_extra(ioe: IoError, extra: impl ToString) -> Self {
        Self::IoErrorExtra(ioe, extra.to_string())
    }

    pub fn config(msg: impl ToString) -> Self {
        Self::ConfigError(msg.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "I/O error: {}", e),
            Self::IoErrorExtra(e, extra) => write!(f, "I/O error while {extra}: {e}"),
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::IoError(e)
    }
}
