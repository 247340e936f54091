//! Native module constants for the MCS host communications library

/// File name of the dynamic library exporting the stream functions
pub const MODULE_NAME: &str = "nnsmcs.dll";

/// Byte size of the `StreamInfo` layout this crate declares
pub const STREAM_INFO_SIZE: u32 = 8;

/// Exported entry points (NUL-terminated for symbol lookup)
pub mod symbol {
    pub const OPEN_STREAM: &[u8] = b"NNS_McsOpenStream\0";
    pub const OPEN_STREAM_EX: &[u8] = b"NNS_McsOpenStreamEx\0";

    /// Symbol name without the trailing NUL, for messages
    pub fn name(symbol: &[u8]) -> &str {
        let trimmed = symbol.strip_suffix(b"\0").unwrap_or(symbol);
        std::str::from_utf8(trimmed).unwrap_or("<non-utf8 symbol>")
    }
}

/// Raw device type values written into `StreamInfo::device_type`
pub mod device_type {
    pub const UNKNOWN: u32 = 0;
    pub const NITRO_DEBUGGER: u32 = 1;
    pub const NITRO_UIC: u32 = 2;
    pub const ENSATA: u32 = 3;
    pub const TWL: u32 = 4;
}

/// Open flags
///
/// The recognized bits belong to the native module. Only the empty mask is
/// named here; anything else is passed through untouched.
pub mod flags {
    pub const NONE: u32 = 0;
}

/// Platform error codes the binding itself reports or interprets
pub mod os_code {
    /// Channel not served by the module
    pub const FILE_NOT_FOUND: u32 = 2;
    /// Caller lacks permission to open the device
    pub const ACCESS_DENIED: u32 = 5;
    /// Handle was never opened or is already released
    pub const INVALID_HANDLE: u32 = 6;
    /// Peer closed its end of the pipe
    pub const BROKEN_PIPE: u32 = 109;
}
