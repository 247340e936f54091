//! OS handle primitives for streams returned by the native module
//!
//! On Windows the module hands out pipe `HANDLE`s; elsewhere (Wine-hosted
//! builds, test shims) it hands out file descriptors. Every failing call
//! captures the platform code before returning.

use crate::error::OsError;
use crate::types::RawStream;

#[cfg(windows)]
mod imp {
    use windows_sys::Win32::Foundation::{CloseHandle, GetLastError, HANDLE};
    use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
    use windows_sys::Win32::System::Pipes::PeekNamedPipe;

    use super::*;

    pub fn last_error() -> OsError {
        OsError(unsafe { GetLastError() })
    }

    pub fn is_invalid(stream: RawStream) -> bool {
        stream == 0 || stream == crate::types::INVALID_STREAM
    }

    /// Any non-sentinel value is a usable `HANDLE`
    pub fn check_handle(stream: RawStream) -> Result<RawStream, OsError> {
        Ok(stream)
    }

    pub fn read(stream: RawStream, buf: &mut [u8]) -> Result<usize, OsError> {
        let len = buf.len().min(u32::MAX as usize) as u32;
        let mut read = 0u32;
        let ok = unsafe {
            ReadFile(
                stream as HANDLE,
                buf.as_mut_ptr(),
                len,
                &mut read,
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(read as usize)
    }

    pub fn write(stream: RawStream, buf: &[u8]) -> Result<usize, OsError> {
        let len = buf.len().min(u32::MAX as usize) as u32;
        let mut written = 0u32;
        let ok = unsafe {
            WriteFile(
                stream as HANDLE,
                buf.as_ptr(),
                len,
                &mut written,
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(written as usize)
    }

    pub fn readable_size(stream: RawStream) -> Result<usize, OsError> {
        let mut avail = 0u32;
        let ok = unsafe {
            PeekNamedPipe(
                stream as HANDLE,
                std::ptr::null_mut(),
                0,
                std::ptr::null_mut(),
                &mut avail,
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(last_error());
        }
        Ok(avail as usize)
    }

    pub fn close(stream: RawStream) -> Result<(), OsError> {
        if unsafe { CloseHandle(stream as HANDLE) } == 0 {
            return Err(last_error());
        }
        Ok(())
    }

    /// Peer closed the pipe: read reports ERROR_BROKEN_PIPE
    pub fn is_end_of_stream(code: OsError) -> bool {
        code == OsError::BROKEN_PIPE
    }
}

#[cfg(unix)]
mod imp {
    use super::*;

    pub fn last_error() -> OsError {
        let code = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        OsError(code as u32)
    }

    pub fn is_invalid(stream: RawStream) -> bool {
        stream == crate::types::INVALID_STREAM
    }

    /// Reject values that cannot be a descriptor
    ///
    /// Nothing was opened in that case, so there is nothing to release; the
    /// failure is reported as `EBADF` instead of whatever `errno` holds.
    pub fn check_handle(stream: RawStream) -> Result<RawStream, OsError> {
        match libc::c_int::try_from(stream) {
            Ok(fd) if fd >= 0 => Ok(stream),
            _ => Err(OsError(libc::EBADF as u32)),
        }
    }

    pub fn read(stream: RawStream, buf: &mut [u8]) -> Result<usize, OsError> {
        let n = unsafe { libc::read(stream as libc::c_int, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(last_error());
        }
        Ok(n as usize)
    }

    pub fn write(stream: RawStream, buf: &[u8]) -> Result<usize, OsError> {
        let n = unsafe { libc::write(stream as libc::c_int, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(last_error());
        }
        Ok(n as usize)
    }

    pub fn readable_size(stream: RawStream) -> Result<usize, OsError> {
        let mut avail: libc::c_int = 0;
        let avail_ptr: *mut libc::c_int = &mut avail;
        if unsafe { libc::ioctl(stream as libc::c_int, libc::FIONREAD, avail_ptr) } < 0 {
            return Err(last_error());
        }
        Ok(avail.max(0) as usize)
    }

    pub fn close(stream: RawStream) -> Result<(), OsError> {
        if unsafe { libc::close(stream as libc::c_int) } != 0 {
            return Err(last_error());
        }
        Ok(())
    }

    /// Descriptors report end of stream as a zero-length read
    pub fn is_end_of_stream(_code: OsError) -> bool {
        false
    }
}

pub(crate) use imp::{
    check_handle, close, is_end_of_stream, is_invalid, last_error, read, readable_size, write,
};
