//! Channel commands: info, send, recv

use std::io::{self, Read, Write};

use serde::Serialize;
use tracing::{debug, info};

use mcs_transport::{DeviceType, McsClient, McsStream};

use super::Target;

/// What `info` reports about a channel
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StreamSummary {
    pub channel: u16,
    pub flags: u32,
    pub device_type: DeviceType,
    pub device_name: String,
    pub struct_size: u32,
    pub emulator: bool,
}

impl StreamSummary {
    /// Human readable multi-line form
    pub fn to_text(&self) -> String {
        format!(
            "Channel:     0x{:04X}\nFlags:       0x{:08X}\nDevice:      {}{}\nStructSize:  {}",
            self.channel,
            self.flags,
            self.device_type,
            if self.emulator { " (emulator)" } else { "" },
            self.struct_size,
        )
    }
}

/// Open the target channel in the configured mode
pub fn open_target(client: &McsClient, target: &Target) -> anyhow::Result<McsStream> {
    let stream = if target.use_ex {
        client.open_ex(target.channel, target.flags)?
    } else {
        client.open(target.channel, target.flags)?
    };
    if let Some(device) = stream.device_type() {
        info!("Channel 0x{:04X} served by {}", target.channel, device);
    }
    Ok(stream)
}

/// Open with the Ex call, describe the stream, close it
pub fn info(client: &McsClient, target: &Target) -> anyhow::Result<StreamSummary> {
    let stream = client.open_ex(target.channel, target.flags)?;
    let info = stream.info().copied().unwrap_or_default();
    let device_type = info.device_type();
    stream.close()?;

    Ok(StreamSummary {
        channel: target.channel,
        flags: target.flags,
        device_type,
        device_name: device_type.name().to_string(),
        struct_size: info.struct_size(),
        emulator: device_type.is_emulator(),
    })
}

/// Copy `input` to the channel; returns bytes written
pub fn send<R: Read>(client: &McsClient, target: &Target, mut input: R) -> anyhow::Result<u64> {
    let mut stream = open_target(client, target)?;
    let written = io::copy(&mut input, &mut stream)?;
    stream.flush()?;
    stream.close()?;
    debug!("Sent {} bytes to channel 0x{:04X}", written, target.channel);
    Ok(written)
}

/// How `recv` reads and prints
#[derive(Debug, Clone, Copy)]
pub struct RecvOptions {
    /// Stop after this many bytes
    pub count: Option<usize>,
    pub chunk_size: usize,
    /// Hex dump instead of raw output
    pub hex: bool,
    /// Stop when nothing is buffered rather than blocking for more
    pub drain: bool,
}

/// Copy channel data to `out` until `count` bytes, end of stream, or (with
/// `drain`) an empty buffer
pub fn recv<W: Write>(
    client: &McsClient,
    target: &Target,
    out: W,
    options: &RecvOptions,
) -> anyhow::Result<u64> {
    let mut stream = open_target(client, target)?;
    let mut buf = vec![0u8; options.chunk_size.max(1)];
    let mut sink = Sink::new(out, options.hex);
    let mut total = 0usize;

    loop {
        let mut want = match options.count {
            Some(limit) if total >= limit => break,
            Some(limit) => (limit - total).min(buf.len()),
            None => buf.len(),
        };
        if options.drain {
            let available = stream.readable_size()?;
            if available == 0 {
                break;
            }
            want = want.min(available);
        }
        let n = stream.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        sink.write(&buf[..n])?;
        total += n;
    }

    sink.finish()?;
    stream.close()?;
    debug!("Received {} bytes from channel 0x{:04X}", total, target.channel);
    Ok(total as u64)
}

/// Output for `recv`: raw passthrough or a 16-bytes-per-line hex dump
struct Sink<W: Write> {
    out: W,
    hex: bool,
    offset: usize,
    pending: Vec<u8>,
}

const HEX_LINE: usize = 16;

impl<W: Write> Sink<W> {
    fn new(out: W, hex: bool) -> Self {
        Self {
            out,
            hex,
            offset: 0,
            pending: Vec::with_capacity(HEX_LINE),
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.hex {
            return self.out.write_all(data);
        }
        for &byte in data {
            self.pending.push(byte);
            if self.pending.len() == HEX_LINE {
                self.emit_line()?;
            }
        }
        Ok(())
    }

    fn emit_line(&mut self) -> io::Result<()> {
        let bytes: Vec<String> = self.pending.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = self
            .pending
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        writeln!(
            self.out,
            "{:08x}  {:<width$}  |{}|",
            self.offset,
            bytes.join(" "),
            ascii,
            width = HEX_LINE * 3 - 1
        )?;
        self.offset += self.pending.len();
        self.pending.clear();
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.emit_line()?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mcs_transport::{FakeMcs, McsError, OsError};

    fn target(channel: u16) -> Target {
        Target {
            channel,
            flags: 0,
            use_ex: true,
        }
    }

    fn options(count: Option<usize>, chunk_size: usize, hex: bool) -> RecvOptions {
        RecvOptions {
            count,
            chunk_size,
            hex,
            drain: false,
        }
    }

    fn setup() -> (Arc<FakeMcs>, McsClient) {
        let fake = Arc::new(
            FakeMcs::new()
                .with_device(0, DeviceType::Ensata)
                .with_device(1, DeviceType::Twl)
                .with_failure(9, 5),
        );
        let client = McsClient::new(fake.clone());
        (fake, client)
    }

    #[test]
    fn test_info_reports_device() {
        let (fake, client) = setup();
        let summary = info(&client, &target(0)).unwrap();
        assert_eq!(summary.device_type, DeviceType::Ensata);
        assert_eq!(summary.device_name, "ensata");
        assert_eq!(summary.struct_size, 8);
        assert!(summary.emulator);
        assert!(summary.to_text().contains("(emulator)"));
        assert_eq!(fake.open_count(), 0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["device_type"], "Ensata");
        assert_eq!(json["channel"], 0);
    }

    #[test]
    fn test_info_open_failure_surfaces_code() {
        let (_fake, client) = setup();
        let err = info(&client, &target(9)).unwrap_err();
        let mcs = err.downcast_ref::<McsError>().unwrap();
        assert_eq!(mcs.os_error(), Some(OsError::ACCESS_DENIED));
    }

    #[test]
    fn test_send_copies_input() {
        let (fake, client) = setup();
        let data: Vec<u8> = (0..=255).collect();
        let sent = send(&client, &target(1), data.as_slice()).unwrap();
        assert_eq!(sent, 256);
        assert_eq!(fake.take_outgoing(1), data);
        assert_eq!(fake.open_count(), 0);
    }

    #[test]
    fn test_send_without_ex() {
        let (fake, client) = setup();
        let t = Target {
            use_ex: false,
            ..target(0)
        };
        send(&client, &t, &b"abc"[..]).unwrap();
        assert_eq!(fake.take_outgoing(0), b"abc");
    }

    #[test]
    fn test_recv_honours_count() {
        let (fake, client) = setup();
        fake.push_incoming(1, b"0123456789");
        let mut out = Vec::new();
        let n = recv(&client, &target(1), &mut out, &options(Some(4), 3, false)).unwrap();
        assert_eq!(n, 4);
        assert_eq!(out, b"0123");
    }

    #[test]
    fn test_recv_until_end_of_stream() {
        let (fake, client) = setup();
        fake.push_incoming(0, b"payload");
        let mut out = Vec::new();
        let n = recv(&client, &target(0), &mut out, &options(None, 2, false)).unwrap();
        assert_eq!(n, 7);
        assert_eq!(out, b"payload");
        assert_eq!(fake.open_count(), 0);
    }

    #[test]
    fn test_recv_drain_stops_at_empty_buffer() {
        let (fake, client) = setup();
        fake.push_incoming(1, b"buffered");
        let mut out = Vec::new();
        let drain = RecvOptions {
            drain: true,
            ..options(None, 3, false)
        };
        let n = recv(&client, &target(1), &mut out, &drain).unwrap();
        assert_eq!(n, 8);
        assert_eq!(out, b"buffered");
        assert_eq!(fake.open_count(), 0);

        // Nothing queued: returns at once
        let mut out = Vec::new();
        assert_eq!(recv(&client, &target(1), &mut out, &drain).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_recv_hex_dump() {
        let (fake, client) = setup();
        let data: Vec<u8> = (0x41..0x41 + 18).collect();
        fake.push_incoming(0, &data);
        let mut out = Vec::new();
        recv(&client, &target(0), &mut out, &options(None, 5, true)).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000000  41 42 43"));
        assert!(lines[0].ends_with("|ABCDEFGHIJKLMNOP|"));
        assert!(lines[1].starts_with("00000010  51 52"));
        assert!(lines[1].ends_with("|QR|"));
    }
}
