//! `StreamInfo` record filled in by `NNS_McsOpenStreamEx`
//!
//! The record is versioned by its own size: the caller writes the size of the
//! layout it understands into `struct_size`, and the module echoes the size it
//! actually populated. Only when the two agree is `device_type` meaningful.
//!
//! Two representations exist:
//! - [`StreamInfo`]: explicit little-endian byte layout, independent of the
//!   host's struct layout rules. This is what the rest of the crate handles.
//! - [`NativeStreamInfo`]: the `#[repr(C)]` mirror handed to the FFI call.

use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::McsError;
use crate::protocol::STREAM_INFO_SIZE;
use crate::types::DeviceType;

/// Stream description returned alongside an opened handle
///
/// Wire layout: `struct_size` (u32 LE) followed by `device_type` (u32 LE).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned,
)]
#[repr(C)]
pub struct StreamInfo {
    struct_size: U32,
    device_type: U32,
}

const _: () = assert!(std::mem::size_of::<StreamInfo>() == STREAM_INFO_SIZE as usize);

impl Default for StreamInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamInfo {
    /// Request record for the layout this crate declares
    pub fn new() -> Self {
        Self::with_struct_size(STREAM_INFO_SIZE)
    }

    /// Request record advertising an arbitrary layout size
    pub fn with_struct_size(struct_size: u32) -> Self {
        Self {
            struct_size: U32::new(struct_size),
            device_type: U32::new(0),
        }
    }

    /// Populated record as a module would return it
    pub fn populated(struct_size: u32, device_type: DeviceType) -> Self {
        Self {
            struct_size: U32::new(struct_size),
            device_type: U32::new(device_type.raw()),
        }
    }

    pub fn struct_size(&self) -> u32 {
        self.struct_size.get()
    }

    /// Undecoded device type value
    pub fn raw_device_type(&self) -> u32 {
        self.device_type.get()
    }

    /// Decoded device type
    ///
    /// Does not check `struct_size`; use [`StreamInfo::checked_device_type`]
    /// on records coming back from a module.
    pub fn device_type(&self) -> DeviceType {
        DeviceType::from_raw(self.device_type.get())
    }

    /// Verify the module populated the layout size the caller expects
    pub fn check_size(&self, expected: u32) -> Result<(), McsError> {
        let actual = self.struct_size();
        if actual != expected {
            return Err(McsError::StructSizeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Device type, only after the size check passes
    pub fn checked_device_type(&self) -> Result<DeviceType, McsError> {
        self.check_size(STREAM_INFO_SIZE)?;
        Ok(self.device_type())
    }

    /// Encode to the 8-byte wire form
    pub fn encode(&self) -> [u8; STREAM_INFO_SIZE as usize] {
        let mut out = [0u8; STREAM_INFO_SIZE as usize];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Decode from exactly 8 bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, McsError> {
        Self::read_from_bytes(bytes).map_err(|_| {
            McsError::InvalidRecord(format!(
                "expected {} bytes, got {}",
                STREAM_INFO_SIZE,
                bytes.len()
            ))
        })
    }
}

/// `#[repr(C)]` mirror of the native struct: two `u32` fields in host order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub(crate) struct NativeStreamInfo {
    pub struct_size: u32,
    pub device_type: u32,
}

const _: () = assert!(std::mem::size_of::<NativeStreamInfo>() == STREAM_INFO_SIZE as usize);

impl From<StreamInfo> for NativeStreamInfo {
    fn from(info: StreamInfo) -> Self {
        Self {
            struct_size: info.struct_size(),
            device_type: info.raw_device_type(),
        }
    }
}

impl From<NativeStreamInfo> for StreamInfo {
    fn from(native: NativeStreamInfo) -> Self {
        Self {
            struct_size: U32::new(native.struct_size),
            device_type: U32::new(native.device_type),
        }
    }
}
