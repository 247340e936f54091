//! Common types for the stream binding

use std::fmt;

use serde::Serialize;

use crate::protocol::device_type;

/// Raw OS stream handle as returned by the native module
///
/// Pointer-width so it carries a Win32 `HANDLE` or a POSIX descriptor.
pub type RawStream = isize;

/// Sentinel returned by the native open functions on failure
/// (`INVALID_HANDLE_VALUE`)
pub const INVALID_STREAM: RawStream = -1;

/// Class of debug hardware backing an open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DeviceType {
    /// Native module could not classify the device
    #[default]
    Unknown,
    /// IS-NITRO-DEBUGGER hardware
    NitroDebugger,
    /// IS-NITRO-UIC hardware
    NitroUic,
    /// ensata software emulator
    Ensata,
    /// IS-TWL-DEBUGGER hardware
    Twl,
    /// Value outside the known set (newer module or corrupt record)
    Unrecognized(u32),
}

impl DeviceType {
    /// Decode the raw value the native module writes
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            device_type::UNKNOWN => Self::Unknown,
            device_type::NITRO_DEBUGGER => Self::NitroDebugger,
            device_type::NITRO_UIC => Self::NitroUic,
            device_type::ENSATA => Self::Ensata,
            device_type::TWL => Self::Twl,
            other => Self::Unrecognized(other),
        }
    }

    /// Raw value as stored in `StreamInfo`
    pub fn raw(&self) -> u32 {
        match self {
            Self::Unknown => device_type::UNKNOWN,
            Self::NitroDebugger => device_type::NITRO_DEBUGGER,
            Self::NitroUic => device_type::NITRO_UIC,
            Self::Ensata => device_type::ENSATA,
            Self::Twl => device_type::TWL,
            Self::Unrecognized(raw) => *raw,
        }
    }

    /// Check if the stream is served by the software emulator
    pub fn is_emulator(&self) -> bool {
        matches!(self, Self::Ensata)
    }

    /// Check if the value decoded to a known device class
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::NitroDebugger => "IS-NITRO-DEBUGGER",
            Self::NitroUic => "IS-NITRO-UIC",
            Self::Ensata => "ensata",
            Self::Twl => "IS-TWL-DEBUGGER",
            Self::Unrecognized(_) => "Unrecognized",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognized(raw) => write!(f, "Unrecognized ({raw})"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_device_types() {
        assert_eq!(DeviceType::from_raw(0), DeviceType::Unknown);
        assert_eq!(DeviceType::from_raw(1), DeviceType::NitroDebugger);
        assert_eq!(DeviceType::from_raw(2), DeviceType::NitroUic);
        assert_eq!(DeviceType::from_raw(3), DeviceType::Ensata);
        assert_eq!(DeviceType::from_raw(4), DeviceType::Twl);
    }

    #[test]
    fn test_out_of_range_is_unrecognized() {
        for raw in [5, 0x80, u32::MAX] {
            let dt = DeviceType::from_raw(raw);
            assert_eq!(dt, DeviceType::Unrecognized(raw));
            assert!(!dt.is_recognized());
            assert_eq!(dt.raw(), raw);
        }
    }

    #[test]
    fn test_raw_matches_decode() {
        for raw in 0..=4 {
            assert_eq!(DeviceType::from_raw(raw).raw(), raw);
        }
    }

    #[test]
    fn test_only_ensata_is_emulator() {
        assert!(DeviceType::Ensata.is_emulator());
        assert!(!DeviceType::Twl.is_emulator());
        assert!(!DeviceType::NitroDebugger.is_emulator());
    }

    #[test]
    fn test_display() {
        assert_eq!(DeviceType::Twl.to_string(), "IS-TWL-DEBUGGER");
        assert_eq!(DeviceType::Unrecognized(9).to_string(), "Unrecognized (9)");
    }
}
