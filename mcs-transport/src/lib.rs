//! Stream binding for the MCS host communications module
//!
//! `nnsmcs.dll` opens byte pipes to debug channels served by NITRO/TWL
//! debugger hardware or the ensata emulator. This crate provides:
//!
//! - The raw contract of its two exports as the [`McsApi`] trait, plus the
//!   pipe primitives (read, write, readable size, close)
//! - [`NativeMcs`]: the trait bound to the real module via `libloading`
//! - [`FakeMcs`]: an in-memory module for tests
//! - [`PrinterMcs`]: middleware printing all traffic (monitor mode)
//! - [`McsClient`] / [`McsStream`]: owned handles with `Read`/`Write`
//!
//! ```text
//! [NativeMcs / FakeMcs]   ← implements McsApi (raw handles, OsError)
//!          |
//!     [PrinterMcs]        ← optional monitoring middleware
//!          |
//!     [McsClient]         ← owned McsStream, size-checked StreamInfo
//! ```

pub mod error;
pub mod fake;
pub mod printer;
pub mod protocol;
pub mod stream_info;
pub mod types;

mod client;
mod handle;
mod native;
mod platform;
mod stream;

pub use client::McsClient;
pub use error::{McsError, OsError};
pub use fake::FakeMcs;
pub use handle::StreamHandle;
pub use native::NativeMcs;
pub use printer::{ChannelFilter, OutputFormat, PrinterConfig, PrinterMcs};
pub use stream::McsStream;
pub use stream_info::StreamInfo;
pub use types::{DeviceType, RawStream, INVALID_STREAM};

/// The raw module contract - all backends implement this
///
/// Methods mirror the native exports one-to-one and never log or retry.
/// A failure carries the platform code captured immediately after the call.
/// Handles returned here are unowned; wrap them in [`StreamHandle`] (or go
/// through [`McsClient`]) to get exactly-once release.
pub trait McsApi: Send + Sync {
    /// `NNS_McsOpenStream`
    ///
    /// # Arguments
    /// * `channel` - Channel id; range is defined by the device
    /// * `flags` - Option bits; meaning is defined by the module
    fn open_stream(&self, channel: u16, flags: u32) -> Result<RawStream, OsError>;

    /// `NNS_McsOpenStreamEx`
    ///
    /// `request` carries the `struct_size` the caller understands. The
    /// populated record comes back only on success, so a failed call can
    /// never expose a partially written one.
    fn open_stream_ex(
        &self,
        channel: u16,
        flags: u32,
        request: StreamInfo,
    ) -> Result<(RawStream, StreamInfo), OsError>;

    /// Read from an open stream; `Ok(0)` means end of stream
    fn read(&self, stream: RawStream, buf: &mut [u8]) -> Result<usize, OsError>;

    /// Bytes a read could return right now without blocking
    ///
    /// Lets callers poll a pipe instead of parking in [`McsApi::read`].
    fn readable_size(&self, stream: RawStream) -> Result<usize, OsError>;

    /// Write to an open stream, returning the number of bytes accepted
    fn write(&self, stream: RawStream, buf: &[u8]) -> Result<usize, OsError>;

    /// Release a handle through the platform close mechanism
    ///
    /// Releasing a handle that is not open must fail.
    fn close(&self, stream: RawStream) -> Result<(), OsError>;

    /// Short backend name for diagnostics
    fn name(&self) -> &str {
        "mcs"
    }
}
