//! Stream lifecycle tests against the in-memory module.
//!
//! These run without nnsmcs.dll; `FakeMcs` is injected wherever the native
//! module would be.

use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;

use mcs_transport::{
    DeviceType, FakeMcs, McsApi, McsClient, McsError, OsError, PrinterConfig, PrinterMcs,
    StreamHandle, StreamInfo,
};

fn debugger_module() -> Arc<FakeMcs> {
    Arc::new(
        FakeMcs::new()
            .with_device(0, DeviceType::NitroDebugger)
            .with_device(1, DeviceType::NitroDebugger)
            .with_device(0x4D43, DeviceType::Twl)
            .with_failure(0x0BAD, 5),
    )
}

#[test]
fn open_succeeds_exactly_when_module_accepts() {
    let fake = debugger_module();
    let cases: &[(u16, u32, Option<OsError>)] = &[
        (0, 0, None),
        (1, 0xFFFF_FFFF, None),
        (0x4D43, 1, None),
        (0x0BAD, 0, Some(OsError::ACCESS_DENIED)),
        (2, 0, Some(OsError::FILE_NOT_FOUND)),
    ];

    for &(channel, flags, expected_err) in cases {
        let result = fake.open_stream(channel, flags);
        match (result, expected_err) {
            (Ok(raw), None) => {
                assert!(raw > 0);
                fake.close(raw).unwrap();
            }
            (Err(code), Some(expected)) => assert_eq!(code, expected),
            (other, _) => panic!("channel {channel:#x}: unexpected {other:?}"),
        }
    }
    assert_eq!(fake.open_count(), 0);
}

#[test]
fn failed_ex_open_yields_no_record() {
    let fake = debugger_module();
    let client = McsClient::new(fake.clone());

    let err = client.open_ex(0x0BAD, 0).unwrap_err();
    assert_eq!(err.os_error(), Some(OsError::ACCESS_DENIED));

    let ok = client.open_ex(0x4D43, 0).unwrap();
    let info = ok.info().copied().unwrap();
    assert_eq!(info.struct_size(), 8);
    assert_eq!(info.device_type(), DeviceType::Twl);
}

#[test]
fn mis_versioned_module_never_leaks_a_handle() {
    let fake = Arc::new(
        FakeMcs::new()
            .with_device(0, DeviceType::Ensata)
            .with_struct_size(4),
    );
    let client = McsClient::new(fake.clone());

    for _ in 0..3 {
        assert!(matches!(
            client.open_ex(0, 0),
            Err(McsError::StructSizeMismatch { expected: 8, actual: 4 })
        ));
    }
    assert_eq!(fake.total_opens(), 3);
    assert_eq!(fake.close_count(), 3);
    assert_eq!(fake.open_count(), 0);
}

#[test]
fn double_release_is_detected() {
    let fake = debugger_module();
    let raw = fake.open_stream(0, 0).unwrap();
    let handle = StreamHandle::new(fake.clone(), raw, 0);

    fake.close(raw).unwrap();
    assert!(matches!(
        handle.close(),
        Err(McsError::CloseFailed {
            channel: 0,
            code: OsError::INVALID_HANDLE
        })
    ));
    assert_eq!(fake.double_release_count(), 1);
}

#[test]
fn streams_move_bytes_both_ways() {
    let fake = debugger_module();
    let client = McsClient::new(fake.clone());

    let mut x = client.open(0, 0).unwrap();
    let mut y = client.open(1, 0).unwrap();

    x.write_all(&12i32.to_le_bytes()).unwrap();
    y.write_all(&(-3i32).to_le_bytes()).unwrap();
    assert_eq!(fake.take_outgoing(0), 12i32.to_le_bytes());
    assert_eq!(fake.take_outgoing(1), (-3i32).to_le_bytes());

    assert_eq!(x.readable_size().unwrap(), 0);
    fake.push_incoming(0, &(-1i32).to_le_bytes());
    assert_eq!(x.readable_size().unwrap(), 4);
    assert_eq!(y.readable_size().unwrap(), 0);
    let mut word = [0u8; 4];
    x.read_exact(&mut word).unwrap();
    assert_eq!(i32::from_le_bytes(word), -1);

    drop(x);
    drop(y);
    assert_eq!(fake.open_count(), 0);
    assert_eq!(fake.double_release_count(), 0);
}

#[test]
fn concurrent_callers_own_independent_handles() {
    let fake = Arc::new(
        (0..8u16).fold(FakeMcs::new(), |module, ch| module.with_device(ch, DeviceType::Twl)),
    );
    let client = McsClient::new(fake.clone());

    let workers: Vec<_> = (0..8u16)
        .map(|ch| {
            let client = client.clone();
            thread::spawn(move || {
                let mut stream = client.open_ex(ch, 0).unwrap();
                stream.write_all(&[ch as u8; 16]).unwrap();
                stream.as_raw()
            })
        })
        .collect();

    let mut handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    handles.sort_unstable();
    handles.dedup();
    assert_eq!(handles.len(), 8);

    for ch in 0..8u16 {
        assert_eq!(fake.take_outgoing(ch), vec![ch as u8; 16]);
    }
    assert_eq!(fake.open_count(), 0);
}

#[test]
fn printer_is_transparent_to_the_client() {
    let fake = debugger_module();
    let client = McsClient::new(PrinterMcs::wrap(fake.clone(), PrinterConfig::default()));

    assert_eq!(client.probe(0x4D43, 0).unwrap(), DeviceType::Twl);
    assert!(client.open(2, 0).is_err());
    assert_eq!(fake.open_count(), 0);
}

#[test]
fn stream_info_wire_roundtrip() {
    let info = StreamInfo::populated(8, DeviceType::Ensata);
    let bytes = info.encode();
    assert_eq!(bytes.len(), 8);
    assert_eq!(StreamInfo::decode(&bytes).unwrap(), info);
}
