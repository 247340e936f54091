//! Binding error types

use std::fmt;
use std::io;

use thiserror::Error;

use crate::protocol::os_code;

/// Platform error code captured right after a failed native call
///
/// `GetLastError()` on Windows, `errno` elsewhere. Carried in the return
/// value so nothing depends on thread-local state after the call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsError(pub u32);

impl OsError {
    pub const FILE_NOT_FOUND: OsError = OsError(os_code::FILE_NOT_FOUND);
    pub const ACCESS_DENIED: OsError = OsError(os_code::ACCESS_DENIED);
    pub const INVALID_HANDLE: OsError = OsError(os_code::INVALID_HANDLE);
    pub const BROKEN_PIPE: OsError = OsError(os_code::BROKEN_PIPE);

    /// Raw platform code
    pub fn code(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "os error {}", self.0)
    }
}

impl std::error::Error for OsError {}

impl From<OsError> for io::Error {
    fn from(e: OsError) -> Self {
        io::Error::from_raw_os_error(e.0 as i32)
    }
}

/// Errors from the stream safety layer
#[derive(Error, Debug)]
pub enum McsError {
    #[error("Failed to load MCS module {path}: {source}")]
    LibraryLoad {
        path: String,
        #[source]
        source: libloading::Error,
    },

    #[error("MCS module does not export {symbol}: {source}")]
    SymbolMissing {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("Failed to open channel 0x{channel:04X} (flags 0x{flags:08X}): {code}")]
    OpenFailed { channel: u16, flags: u32, code: OsError },

    #[error("StreamInfo size mismatch: expected {expected} bytes, module reported {actual}")]
    StructSizeMismatch { expected: u32, actual: u32 },

    #[error("Stream I/O failed on channel 0x{channel:04X}: {code}")]
    Io { channel: u16, code: OsError },

    #[error("Failed to release stream on channel 0x{channel:04X}: {code}")]
    CloseFailed { channel: u16, code: OsError },

    #[error("Invalid StreamInfo record: {0}")]
    InvalidRecord(String),
}

impl McsError {
    /// Platform code behind the failure, if any
    pub fn os_error(&self) -> Option<OsError> {
        match self {
            Self::OpenFailed { code, .. }
            | Self::Io { code, .. }
            | Self::CloseFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
