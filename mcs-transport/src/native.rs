//! Binding to the real MCS module loaded at runtime

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info};

use crate::error::{McsError, OsError};
use crate::platform;
use crate::protocol::{symbol, MODULE_NAME};
use crate::stream_info::{NativeStreamInfo, StreamInfo};
use crate::types::RawStream;
use crate::McsApi;

/// `HANDLE NNS_McsOpenStream(u16 channel, u32 flags)`
type OpenStreamFn = unsafe extern "system" fn(channel: u16, flags: u32) -> RawStream;

/// `HANDLE NNS_McsOpenStreamEx(u16 channel, u32 flags, NNSMcsStreamInfo* info)`
type OpenStreamExFn =
    unsafe extern "system" fn(channel: u16, flags: u32, info: *mut NativeStreamInfo) -> RawStream;

/// `McsApi` backed by `nnsmcs.dll`
///
/// Both entry points are resolved once at load time. The library stays
/// mapped for as long as this value lives, so the function pointers remain
/// valid.
pub struct NativeMcs {
    open_stream: OpenStreamFn,
    open_stream_ex: OpenStreamExFn,
    path: PathBuf,
    _library: Option<Library>,
}

impl NativeMcs {
    /// Load the module by name through the platform's library search path
    pub fn load() -> Result<Self, McsError> {
        Self::load_from(MODULE_NAME)
    }

    /// Load the module from an explicit path
    pub fn load_from(path: impl AsRef<OsStr>) -> Result<Self, McsError> {
        let path = PathBuf::from(path.as_ref());
        debug!("Loading MCS module from {}", path.display());

        // SAFETY: loading runs the module's initialisers; nnsmcs.dll has no
        // initialisation requirements beyond being loaded once per process.
        let library = unsafe { Library::new(&path) }.map_err(|source| McsError::LibraryLoad {
            path: path.display().to_string(),
            source,
        })?;

        // SAFETY: signatures match the exported declarations (stdcall,
        // u16/u32 arguments, handle-sized return).
        let open_stream = unsafe { resolve::<OpenStreamFn>(&library, symbol::OPEN_STREAM)? };
        let open_stream_ex =
            unsafe { resolve::<OpenStreamExFn>(&library, symbol::OPEN_STREAM_EX)? };

        info!("Loaded MCS module {}", path.display());
        Ok(Self {
            open_stream,
            open_stream_ex,
            path,
            _library: Some(library),
        })
    }

    /// Bind entry points directly, without a module behind them
    #[cfg(test)]
    fn from_fns(open_stream: OpenStreamFn, open_stream_ex: OpenStreamExFn) -> Self {
        Self {
            open_stream,
            open_stream_ex,
            path: PathBuf::from(MODULE_NAME),
            _library: None,
        }
    }

    /// Path the module was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Look up a symbol and copy the function pointer out of the borrow
unsafe fn resolve<T: Copy>(library: &Library, name: &'static [u8]) -> Result<T, McsError> {
    let sym = library
        .get::<T>(name)
        .map_err(|source| McsError::SymbolMissing {
            symbol: symbol::name(name),
            source,
        })?;
    Ok(*sym)
}

/// Turn a returned handle into a result
///
/// Must run straight after the native call: on the sentinel the last error
/// is read before anything else can overwrite it.
fn checked(stream: RawStream) -> Result<RawStream, OsError> {
    if platform::is_invalid(stream) {
        return Err(platform::last_error());
    }
    platform::check_handle(stream)
}

impl McsApi for NativeMcs {
    fn open_stream(&self, channel: u16, flags: u32) -> Result<RawStream, OsError> {
        checked(unsafe { (self.open_stream)(channel, flags) })
    }

    fn open_stream_ex(
        &self,
        channel: u16,
        flags: u32,
        request: StreamInfo,
    ) -> Result<(RawStream, StreamInfo), OsError> {
        let mut native = NativeStreamInfo::from(request);
        let stream = checked(unsafe { (self.open_stream_ex)(channel, flags, &mut native) })?;
        Ok((stream, StreamInfo::from(native)))
    }

    fn read(&self, stream: RawStream, buf: &mut [u8]) -> Result<usize, OsError> {
        platform::read(stream, buf)
    }

    fn readable_size(&self, stream: RawStream) -> Result<usize, OsError> {
        platform::readable_size(stream)
    }

    fn write(&self, stream: RawStream, buf: &[u8]) -> Result<usize, OsError> {
        platform::write(stream, buf)
    }

    fn close(&self, stream: RawStream) -> Result<(), OsError> {
        platform::close(stream)
    }

    fn name(&self) -> &str {
        MODULE_NAME
    }
}
