//! Byte-stream access to an open MCS channel

use std::io::{self, Read, Write};

use crate::error::McsError;
use crate::handle::StreamHandle;
use crate::platform;
use crate::stream_info::StreamInfo;
use crate::types::{DeviceType, RawStream};

/// An open channel: owned handle plus what the module reported about it
///
/// Implements [`Read`] and [`Write`]. A peer that closed its end of the
/// pipe reads as end of stream.
#[derive(Debug)]
pub struct McsStream {
    handle: StreamHandle,
    info: Option<StreamInfo>,
}

impl McsStream {
    pub(crate) fn new(handle: StreamHandle, info: Option<StreamInfo>) -> Self {
        Self { handle, info }
    }

    /// Channel this stream is bound to
    pub fn channel(&self) -> u16 {
        self.handle.channel()
    }

    /// Size-checked record from `NNS_McsOpenStreamEx` (None if opened without it)
    pub fn info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }

    /// Device backing the stream (None if opened without the Ex call)
    pub fn device_type(&self) -> Option<DeviceType> {
        self.info.map(|info| info.device_type())
    }

    /// Raw handle value (still owned by the stream)
    pub fn as_raw(&self) -> RawStream {
        self.handle.as_raw()
    }

    /// Release the handle now and report the outcome
    pub fn close(self) -> Result<(), McsError> {
        self.handle.close()
    }

    /// Bytes a read would return right now without blocking
    ///
    /// A peer that closed its end reports zero, like [`Read`] reports EOF.
    pub fn readable_size(&self) -> Result<usize, McsError> {
        match self.handle.readable_size() {
            Ok(n) => Ok(n),
            Err(code) if platform::is_end_of_stream(code) => Ok(0),
            Err(code) => Err(McsError::Io {
                channel: self.channel(),
                code,
            }),
        }
    }
}

impl Read for McsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.handle.read(buf) {
            Ok(n) => Ok(n),
            Err(code) if platform::is_end_of_stream(code) => Ok(0),
            Err(code) => Err(code.into()),
        }
    }
}

impl Write for McsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle.write(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Pipe writes are unbuffered on the host side
        Ok(())
    }
}
