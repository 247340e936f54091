//! In-memory MCS module for tests and offline use
//!
//! Channels are registered up front with the device type the module would
//! report. Bytes written by the host collect in a per-channel outbound
//! buffer; bytes queued with [`FakeMcs::push_incoming`] are what the host
//! reads back. Release bookkeeping is strict: closing a handle that is not
//! open fails with `ERROR_INVALID_HANDLE` and is counted.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;

use crate::error::OsError;
use crate::protocol::STREAM_INFO_SIZE;
use crate::stream_info::StreamInfo;
use crate::types::{DeviceType, RawStream};
use crate::McsApi;

/// First handle value handed out (Win32 handles are multiples of 4)
const FIRST_HANDLE: RawStream = 0x100;
const HANDLE_STEP: RawStream = 4;

#[derive(Debug, Default)]
struct FakeChannel {
    device_type: DeviceType,
    failure: Option<OsError>,
    last_flags: Option<u32>,
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
}

#[derive(Debug)]
struct FakeState {
    channels: HashMap<u16, FakeChannel>,
    /// Open handle -> channel
    open: HashMap<RawStream, u16>,
    released: HashSet<RawStream>,
    next_handle: RawStream,
    reported_struct_size: Option<u32>,
    total_opens: usize,
    total_closes: usize,
    double_releases: usize,
}

/// `McsApi` implementation that never touches the OS
#[derive(Debug)]
pub struct FakeMcs {
    state: Mutex<FakeState>,
}

impl Default for FakeMcs {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMcs {
    /// Create a module serving no channels
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                channels: HashMap::new(),
                open: HashMap::new(),
                released: HashSet::new(),
                next_handle: FIRST_HANDLE,
                reported_struct_size: None,
                total_opens: 0,
                total_closes: 0,
                double_releases: 0,
            }),
        }
    }

    /// Serve `channel`, reporting `device_type` from the Ex call
    pub fn with_device(self, channel: u16, device_type: DeviceType) -> Self {
        self.state.lock().channels.entry(channel).or_default().device_type = device_type;
        self
    }

    /// Make every open of `channel` fail with `code`
    pub fn with_failure(self, channel: u16, code: u32) -> Self {
        self.state.lock().channels.entry(channel).or_default().failure = Some(OsError(code));
        self
    }

    /// Report this `struct_size` from the Ex call, as a mis-versioned module would
    pub fn with_struct_size(self, struct_size: u32) -> Self {
        self.state.lock().reported_struct_size = Some(struct_size);
        self
    }

    /// Queue bytes for the host to read from `channel`
    pub fn push_incoming(&self, channel: u16, data: &[u8]) {
        self.state
            .lock()
            .channels
            .entry(channel)
            .or_default()
            .incoming
            .extend(data);
    }

    /// Drain bytes the host has written to `channel`
    pub fn take_outgoing(&self, channel: u16) -> Vec<u8> {
        self.state
            .lock()
            .channels
            .get_mut(&channel)
            .map(|ch| std::mem::take(&mut ch.outgoing))
            .unwrap_or_default()
    }

    /// Flags passed on the most recent open of `channel`
    pub fn last_flags(&self, channel: u16) -> Option<u32> {
        self.state
            .lock()
            .channels
            .get(&channel)
            .and_then(|ch| ch.last_flags)
    }

    /// Number of handles currently open
    pub fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }

    /// Number of successful opens since creation
    pub fn total_opens(&self) -> usize {
        self.state.lock().total_opens
    }

    /// Number of successful releases since creation
    pub fn close_count(&self) -> usize {
        self.state.lock().total_closes
    }

    /// Number of attempts to release an already released handle
    pub fn double_release_count(&self) -> usize {
        self.state.lock().double_releases
    }

    /// Check if `stream` is currently open
    pub fn is_open(&self, stream: RawStream) -> bool {
        self.state.lock().open.contains_key(&stream)
    }

    fn open_inner(&self, channel: u16, flags: u32) -> Result<(RawStream, DeviceType), OsError> {
        let mut state = self.state.lock();
        let ch = state
            .channels
            .get_mut(&channel)
            .ok_or(OsError::FILE_NOT_FOUND)?;
        if let Some(code) = ch.failure {
            return Err(code);
        }
        ch.last_flags = Some(flags);
        let device_type = ch.device_type;

        let raw = state.next_handle;
        state.next_handle += HANDLE_STEP;
        state.open.insert(raw, channel);
        state.total_opens += 1;
        Ok((raw, device_type))
    }

    fn channel_of(state: &FakeState, stream: RawStream) -> Result<u16, OsError> {
        state
            .open
            .get(&stream)
            .copied()
            .ok_or(OsError::INVALID_HANDLE)
    }
}

impl McsApi for FakeMcs {
    fn open_stream(&self, channel: u16, flags: u32) -> Result<RawStream, OsError> {
        self.open_inner(channel, flags).map(|(raw, _)| raw)
    }

    fn open_stream_ex(
        &self,
        channel: u16,
        flags: u32,
        request: StreamInfo,
    ) -> Result<(RawStream, StreamInfo), OsError> {
        let (raw, device_type) = self.open_inner(channel, flags)?;
        let struct_size = self
            .state
            .lock()
            .reported_struct_size
            .unwrap_or_else(|| request.struct_size().min(STREAM_INFO_SIZE));
        Ok((raw, StreamInfo::populated(struct_size, device_type)))
    }

    fn read(&self, stream: RawStream, buf: &mut [u8]) -> Result<usize, OsError> {
        let mut state = self.state.lock();
        let channel = Self::channel_of(&state, stream)?;
        let ch = state.channels.entry(channel).or_default();
        let n = buf.len().min(ch.incoming.len());
        for (dst, src) in buf.iter_mut().zip(ch.incoming.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn readable_size(&self, stream: RawStream) -> Result<usize, OsError> {
        let state = self.state.lock();
        let channel = Self::channel_of(&state, stream)?;
        Ok(state
            .channels
            .get(&channel)
            .map_or(0, |ch| ch.incoming.len()))
    }

    fn write(&self, stream: RawStream, buf: &[u8]) -> Result<usize, OsError> {
        let mut state = self.state.lock();
        let channel = Self::channel_of(&state, stream)?;
        state
            .channels
            .entry(channel)
            .or_default()
            .outgoing
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&self, stream: RawStream) -> Result<(), OsError> {
        let mut state = self.state.lock();
        if state.open.remove(&stream).is_some() {
            state.released.insert(stream);
            state.total_closes += 1;
            return Ok(());
        }
        if state.released.contains(&stream) {
            state.double_releases += 1;
        }
        Err(OsError::INVALID_HANDLE)
    }

    fn name(&self) -> &str {
        "fake"
    }
}
