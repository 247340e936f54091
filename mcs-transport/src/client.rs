//! Opening channels through an injected backend

use std::sync::Arc;

use tracing::debug;

use crate::error::McsError;
use crate::handle::StreamHandle;
use crate::native::NativeMcs;
use crate::protocol::STREAM_INFO_SIZE;
use crate::stream::McsStream;
use crate::stream_info::StreamInfo;
use crate::types::DeviceType;
use crate::McsApi;

/// Entry point for opening MCS streams
///
/// Holds no session state; every open is an independent request and every
/// returned stream owns its handle.
#[derive(Clone)]
pub struct McsClient {
    api: Arc<dyn McsApi>,
}

impl McsClient {
    /// Use an existing backend (native, fake, or wrapped by a printer)
    pub fn new(api: Arc<dyn McsApi>) -> Self {
        Self { api }
    }

    /// Load `nnsmcs.dll` from the library search path
    pub fn load_native() -> Result<Self, McsError> {
        Ok(Self::new(Arc::new(NativeMcs::load()?)))
    }

    /// Open `channel` with `NNS_McsOpenStream`
    pub fn open(&self, channel: u16, flags: u32) -> Result<McsStream, McsError> {
        let raw = self
            .api
            .open_stream(channel, flags)
            .map_err(|code| McsError::OpenFailed {
                channel,
                flags,
                code,
            })?;
        debug!("Opened channel 0x{:04X} (flags 0x{:08X})", channel, flags);
        let handle = StreamHandle::new(Arc::clone(&self.api), raw, channel);
        Ok(McsStream::new(handle, None))
    }

    /// Open `channel` with `NNS_McsOpenStreamEx` and verify the returned record
    ///
    /// If the module reports a `struct_size` other than the one requested,
    /// the freshly opened handle is released and `StructSizeMismatch` is
    /// returned; the device type is never exposed in that case.
    pub fn open_ex(&self, channel: u16, flags: u32) -> Result<McsStream, McsError> {
        let (raw, info) = self
            .api
            .open_stream_ex(channel, flags, StreamInfo::new())
            .map_err(|code| McsError::OpenFailed {
                channel,
                flags,
                code,
            })?;
        let handle = StreamHandle::new(Arc::clone(&self.api), raw, channel);

        // `handle` drops (and releases) on this error path
        info.check_size(STREAM_INFO_SIZE)?;

        debug!(
            "Opened channel 0x{:04X} (flags 0x{:08X}) on {}",
            channel,
            flags,
            info.device_type()
        );
        Ok(McsStream::new(handle, Some(info)))
    }

    /// Open, read the device type, and close again
    pub fn probe(&self, channel: u16, flags: u32) -> Result<DeviceType, McsError> {
        let stream = self.open_ex(channel, flags)?;
        let device_type = stream.device_type().unwrap_or_default();
        stream.close()?;
        Ok(device_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OsError;
    use crate::fake::FakeMcs;

    fn client(fake: &Arc<FakeMcs>) -> McsClient {
        McsClient::new(fake.clone())
    }

    #[test]
    fn test_open_failure_carries_code() {
        let fake = Arc::new(FakeMcs::new().with_failure(0x10, 5));
        match client(&fake).open(0x10, 3) {
            Err(McsError::OpenFailed {
                channel,
                flags,
                code,
            }) => {
                assert_eq!(channel, 0x10);
                assert_eq!(flags, 3);
                assert_eq!(code, OsError::ACCESS_DENIED);
            }
            other => panic!("expected OpenFailed, got {other:?}"),
        }
        assert_eq!(fake.open_count(), 0);
    }

    #[test]
    fn test_plain_open_has_no_info() {
        let fake = Arc::new(FakeMcs::new().with_device(0, DeviceType::Ensata));
        let stream = client(&fake).open(0, 0).unwrap();
        assert!(stream.info().is_none());
        assert!(stream.device_type().is_none());
    }

    #[test]
    fn test_size_mismatch_releases_handle() {
        let fake = Arc::new(
            FakeMcs::new()
                .with_device(1, DeviceType::Twl)
                .with_struct_size(12),
        );
        let err = client(&fake).open_ex(1, 0).unwrap_err();
        assert!(matches!(
            err,
            McsError::StructSizeMismatch {
                expected: 8,
                actual: 12
            }
        ));
        assert_eq!(fake.total_opens(), 1);
        assert_eq!(fake.open_count(), 0);
        assert_eq!(fake.double_release_count(), 0);
    }

    #[test]
    fn test_probe_closes_stream() {
        let fake = Arc::new(FakeMcs::new().with_device(2, DeviceType::NitroUic));
        assert_eq!(client(&fake).probe(2, 0).unwrap(), DeviceType::NitroUic);
        assert_eq!(fake.open_count(), 0);
        assert_eq!(fake.close_count(), 1);
    }
}
