//! PrinterMcs middleware for monitoring traffic through a backend
//!
//! Wraps any `McsApi` and prints every open, read, peek, write and close to
//! stderr. The wrapped backend is called first and its result passed through
//! untouched, so the platform code is already captured before anything is
//! printed.
//!
//! # Example
//!
//! ```ignore
//! use mcs_transport::{McsClient, NativeMcs, PrinterConfig, PrinterMcs};
//!
//! let native = Arc::new(NativeMcs::load()?);
//! let monitored = PrinterMcs::wrap(native, PrinterConfig::default().with_hex(true));
//! let client = McsClient::new(monitored);
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crossterm::style::Stylize;
use parking_lot::Mutex;
use serde_json::json;

use crate::error::OsError;
use crate::stream_info::StreamInfo;
use crate::types::RawStream;
use crate::McsApi;

/// Output format for the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Channel filter for selective display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelFilter {
    #[default]
    All,
    Channel(u16),
}

impl ChannelFilter {
    fn matches(&self, channel: Option<u16>) -> bool {
        match self {
            Self::All => true,
            Self::Channel(c) => channel == Some(*c),
        }
    }
}

impl FromStr for ChannelFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "all" | "" => Ok(Self::All),
            _ => {
                let value = s.strip_prefix("ch=").unwrap_or(&s);
                let parsed = match value.strip_prefix("0x") {
                    Some(hex) => u16::from_str_radix(hex, 16),
                    None => value.parse::<u16>(),
                };
                parsed
                    .map(Self::Channel)
                    .map_err(|e| format!("Invalid channel filter '{}': {}", s, e))
            }
        }
    }
}

/// Configuration for the PrinterMcs
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Show raw hex dump of payloads
    pub show_hex: bool,
    /// Filter for selective display
    pub filter: ChannelFilter,
    /// Output format
    pub format: OutputFormat,
}

impl PrinterConfig {
    /// Create config with hex output setting
    pub fn with_hex(mut self, show: bool) -> Self {
        self.show_hex = show;
        self
    }

    /// Create config with filter
    pub fn with_filter(mut self, filter: ChannelFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Create config with output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Backend middleware that prints all calls
pub struct PrinterMcs {
    inner: Arc<dyn McsApi>,
    config: PrinterConfig,
    /// Open handle -> channel, so reads and writes can be filtered by channel
    channels: Mutex<HashMap<RawStream, u16>>,
}

impl PrinterMcs {
    /// Wrap a backend with printing middleware
    pub fn wrap(inner: Arc<dyn McsApi>, config: PrinterConfig) -> Arc<dyn McsApi> {
        Arc::new(Self::new(inner, config))
    }

    pub fn new(inner: Arc<dyn McsApi>, config: PrinterConfig) -> Self {
        Self {
            inner,
            config,
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn channel_of(&self, stream: RawStream) -> Option<u16> {
        self.channels.lock().get(&stream).copied()
    }

    /// Format one line for a call
    fn render(
        &self,
        op: &str,
        channel: Option<u16>,
        stream: Option<RawStream>,
        detail: &str,
        payload: Option<&[u8]>,
        result: Result<(), OsError>,
    ) -> String {
        match self.config.format {
            OutputFormat::Json => {
                let mut obj = json!({
                    "op": op,
                    "channel": channel,
                    "stream": stream,
                    "detail": detail,
                    "ok": result.is_ok(),
                });
                if let Err(code) = result {
                    obj["error"] = json!(code.code());
                }
                if self.config.show_hex {
                    if let Some(data) = payload {
                        obj["hex"] = json!(hex(data));
                    }
                }
                obj.to_string()
            }
            OutputFormat::Text => {
                let arrow = match op {
                    "write" => ">>>".cyan(),
                    "read" => "<<<".green(),
                    _ => "---".dark_grey(),
                };
                let ch = channel
                    .map(|c| format!("ch=0x{c:04X}"))
                    .unwrap_or_else(|| "ch=?".to_string());
                let status = match result {
                    Ok(()) => "ok".green().to_string(),
                    Err(code) => format!("{}", code).red().bold().to_string(),
                };
                let mut line = format!(
                    "{} {:<8} {} {} {}",
                    arrow,
                    op.to_uppercase().bold(),
                    ch.yellow(),
                    detail,
                    status
                );
                if self.config.show_hex {
                    if let Some(data) = payload.filter(|d| !d.is_empty()) {
                        line.push_str(&format!("\n    {}  {}", "HEX".dark_grey(), hex(data)));
                    }
                }
                line
            }
        }
    }

    fn emit(
        &self,
        op: &str,
        channel: Option<u16>,
        stream: Option<RawStream>,
        detail: &str,
        payload: Option<&[u8]>,
        result: Result<(), OsError>,
    ) {
        if !self.config.filter.matches(channel) {
            return;
        }
        eprintln!("{}", self.render(op, channel, stream, detail, payload, result));
    }
}

fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl McsApi for PrinterMcs {
    fn open_stream(&self, channel: u16, flags: u32) -> Result<RawStream, OsError> {
        let result = self.inner.open_stream(channel, flags);
        if let Ok(stream) = result {
            self.channels.lock().insert(stream, channel);
        }
        self.emit(
            "open",
            Some(channel),
            result.ok(),
            &format!("flags=0x{flags:08X}"),
            None,
            result.map(|_| ()),
        );
        result
    }

    fn open_stream_ex(
        &self,
        channel: u16,
        flags: u32,
        request: StreamInfo,
    ) -> Result<(RawStream, StreamInfo), OsError> {
        let result = self.inner.open_stream_ex(channel, flags, request);
        let detail = match &result {
            Ok((stream, info)) => {
                self.channels.lock().insert(*stream, channel);
                format!(
                    "flags=0x{flags:08X} size={} device={}",
                    info.struct_size(),
                    info.device_type()
                )
            }
            Err(_) => format!("flags=0x{flags:08X}"),
        };
        let encoded = result.as_ref().ok().map(|(_, info)| info.encode());
        self.emit(
            "open_ex",
            Some(channel),
            result.as_ref().ok().map(|(s, _)| *s),
            &detail,
            encoded.as_ref().map(|b| b.as_slice()),
            result.as_ref().map(|_| ()).map_err(|e| *e),
        );
        result
    }

    fn read(&self, stream: RawStream, buf: &mut [u8]) -> Result<usize, OsError> {
        let result = self.inner.read(stream, buf);
        let (detail, payload) = match result {
            Ok(n) => (format!("{n} bytes"), Some(&buf[..n])),
            Err(_) => (format!("want {} bytes", buf.len()), None),
        };
        self.emit(
            "read",
            self.channel_of(stream),
            Some(stream),
            &detail,
            payload,
            result.map(|_| ()),
        );
        result
    }

    fn readable_size(&self, stream: RawStream) -> Result<usize, OsError> {
        let result = self.inner.readable_size(stream);
        let detail = match result {
            Ok(n) => format!("{n} bytes"),
            Err(_) => String::new(),
        };
        self.emit(
            "peek",
            self.channel_of(stream),
            Some(stream),
            &detail,
            None,
            result.map(|_| ()),
        );
        result
    }

    fn write(&self, stream: RawStream, buf: &[u8]) -> Result<usize, OsError> {
        let result = self.inner.write(stream, buf);
        let detail = match result {
            Ok(n) => format!("{n}/{} bytes", buf.len()),
            Err(_) => format!("{} bytes", buf.len()),
        };
        self.emit(
            "write",
            self.channel_of(stream),
            Some(stream),
            &detail,
            Some(buf),
            result.map(|_| ()),
        );
        result
    }

    fn close(&self, stream: RawStream) -> Result<(), OsError> {
        let result = self.inner.close(stream);
        let channel = if result.is_ok() {
            self.channels.lock().remove(&stream)
        } else {
            self.channel_of(stream)
        };
        self.emit("close", channel, Some(stream), "", None, result);
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
