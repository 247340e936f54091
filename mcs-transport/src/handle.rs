//! Owned stream handle with exactly-once release

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{McsError, OsError};
use crate::types::{RawStream, INVALID_STREAM};
use crate::McsApi;

/// Exclusive owner of a raw handle returned by an `McsApi`
///
/// The handle is released through the backend that produced it, exactly
/// once: by [`StreamHandle::close`], or on drop. [`StreamHandle::into_raw`]
/// hands responsibility back to the caller instead.
pub struct StreamHandle {
    api: Arc<dyn McsApi>,
    raw: Option<RawStream>,
    channel: u16,
}

impl StreamHandle {
    /// Take ownership of a handle freshly returned by `api`
    pub fn new(api: Arc<dyn McsApi>, raw: RawStream, channel: u16) -> Self {
        Self {
            api,
            raw: Some(raw),
            channel,
        }
    }

    /// Raw handle value (still owned by `self`)
    pub fn as_raw(&self) -> RawStream {
        self.raw.unwrap_or(INVALID_STREAM)
    }

    /// Channel this handle was opened on
    pub fn channel(&self) -> u16 {
        self.channel
    }

    /// Read through the owning backend
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, OsError> {
        self.api.read(self.as_raw(), buf)
    }

    /// Bytes readable without blocking, through the owning backend
    pub fn readable_size(&self) -> Result<usize, OsError> {
        self.api.readable_size(self.as_raw())
    }

    /// Write through the owning backend
    pub fn write(&self, buf: &[u8]) -> Result<usize, OsError> {
        self.api.write(self.as_raw(), buf)
    }

    /// Release the handle now and report the outcome
    pub fn close(mut self) -> Result<(), McsError> {
        match self.raw.take() {
            Some(raw) => {
                debug!("Closing stream on channel 0x{:04X}", self.channel);
                self.api.close(raw).map_err(|code| McsError::CloseFailed {
                    channel: self.channel,
                    code,
                })
            }
            None => Ok(()),
        }
    }

    /// Give up ownership without releasing; the caller must close the handle
    pub fn into_raw(mut self) -> RawStream {
        self.raw.take().unwrap_or(INVALID_STREAM)
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            if let Err(code) = self.api.close(raw) {
                warn!(
                    "Failed to release stream on channel 0x{:04X}: {}",
                    self.channel, code
                );
            }
        }
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("backend", &self.api.name())
            .field("raw", &self.raw)
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeMcs;
    use crate::types::DeviceType;

    fn open(fake: &Arc<FakeMcs>, channel: u16) -> StreamHandle {
        let raw = fake.open_stream(channel, 0).unwrap();
        StreamHandle::new(fake.clone(), raw, channel)
    }

    #[test]
    fn test_drop_releases_once() {
        let fake = Arc::new(FakeMcs::new().with_device(1, DeviceType::Ensata));
        {
            let _handle = open(&fake, 1);
            assert_eq!(fake.open_count(), 1);
        }
        assert_eq!(fake.open_count(), 0);
        assert_eq!(fake.close_count(), 1);
        assert_eq!(fake.double_release_count(), 0);
    }

    #[test]
    fn test_explicit_close_does_not_release_again_on_drop() {
        let fake = Arc::new(FakeMcs::new().with_device(1, DeviceType::Ensata));
        let handle = open(&fake, 1);
        handle.close().unwrap();
        assert_eq!(fake.close_count(), 1);
        assert_eq!(fake.double_release_count(), 0);
    }

    #[test]
    fn test_into_raw_transfers_release_duty() {
        let fake = Arc::new(FakeMcs::new().with_device(2, DeviceType::Twl));
        let raw = open(&fake, 2).into_raw();
        assert!(fake.is_open(raw));
        fake.close(raw).unwrap();
        assert!(!fake.is_open(raw));
    }

    #[test]
    fn test_close_after_external_release_is_reported() {
        let fake = Arc::new(FakeMcs::new().with_device(3, DeviceType::Twl));
        let handle = open(&fake, 3);
        fake.close(handle.as_raw()).unwrap();

        match handle.close() {
            Err(McsError::CloseFailed { channel, code }) => {
                assert_eq!(channel, 3);
                assert_eq!(code, OsError::INVALID_HANDLE);
            }
            other => panic!("expected CloseFailed, got {other:?}"),
        }
        assert_eq!(fake.double_release_count(), 1);
    }
}
