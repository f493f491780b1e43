//! Tests for Device
//!
//! These tests verify:
//! - Positional read/write round trips
//! - One-quantum cap per call
//! - End-of-data and sparse hole handling
//! - Out-of-memory leaves the device unchanged
//! - Caller buffer faults
//! - Teardown and reuse
//! - Concurrent writers on one device

use qdev::config::{Config, QuantumFill};
use qdev::{Device, QdevError, ReleaseStats, Sink, Source};

// =============================================================================
// Helper Functions
// =============================================================================

/// quantum_size = 8, quantum_per_set = 4 → span = 32
fn small_config(fill: QuantumFill) -> Config {
    Config::builder()
        .quantum_size(8)
        .quantum_per_set(4)
        .fill(fill)
        .build()
}

fn setup_device(fill: QuantumFill) -> Device {
    Device::new(0, &small_config(fill)).unwrap()
}

fn setup_limited_device(fill: QuantumFill, limit: usize) -> Device {
    let config = Config::builder()
        .quantum_size(8)
        .quantum_per_set(4)
        .fill(fill)
        .memory_limit(limit)
        .build();
    Device::new(0, &config).unwrap()
}

/// Accepts at most `accept` bytes per delivery
struct ShortSink {
    buf: Vec<u8>,
    accept: usize,
}

impl Sink for ShortSink {
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn deliver(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.accept);
        self.buf[..n].copy_from_slice(&src[..n]);
        n
    }
}

/// Claims `len` bytes but can never be copied
struct FaultySource {
    len: usize,
}

impl Source for FaultySource {
    fn len(&self) -> usize {
        self.len
    }

    fn fetch(&self, _len: usize) -> qdev::Result<&[u8]> {
        Err(QdevError::AccessFault)
    }
}

// =============================================================================
// Basic Read/Write Tests
// =============================================================================

#[test]
fn test_new_device_is_empty() {
    let device = setup_device(QuantumFill::Eager);

    assert_eq!(device.size(), 0);
    assert_eq!(device.block_set_count(), 0);
    assert_eq!(device.quantum_count(), 0);
    assert_eq!(device.allocated_bytes(), 0);
    assert_eq!(device.name(), "qdev0");
}

#[test]
fn test_write_then_read_same_range() {
    let device = setup_device(QuantumFill::Eager);

    assert_eq!(device.write_at(b"hello", 2).unwrap(), 5);
    assert_eq!(device.size(), 7);

    let mut buf = [0u8; 5];
    assert_eq!(device.read_at(&mut buf, 2).unwrap(), 5);
    assert_eq!(&buf, b"hello");
}

#[test]
fn test_first_write_allocates_one_block_set() {
    let device = setup_device(QuantumFill::Eager);

    device.write_at(b"x", 0).unwrap();

    assert_eq!(device.block_set_count(), 1);
    assert_eq!(device.quantum_count(), 4);
    assert_eq!(device.allocated_bytes(), 32);
}

#[test]
fn test_write_capped_at_quantum_boundary() {
    let device = setup_device(QuantumFill::Eager);

    assert_eq!(device.write_at(b"abcdefgh", 5).unwrap(), 3);
    assert_eq!(device.size(), 8);

    let mut buf = [0u8; 8];
    assert_eq!(device.read_at(&mut buf, 5).unwrap(), 3);
    assert_eq!(&buf[..3], b"abc");
}

#[test]
fn test_read_capped_at_quantum_boundary() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"01234567", 0).unwrap();
    device.write_at(b"89", 8).unwrap();

    let mut buf = [0u8; 10];
    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 8);
    assert_eq!(&buf[..8], b"01234567");
}

#[test]
fn test_two_quanta_via_looped_calls() {
    let device = setup_device(QuantumFill::Eager);
    let data: Vec<u8> = (0u8..16).collect();

    let mut pos = 0;
    while pos < data.len() {
        pos += device.write_at(&data[pos..], pos as u64).unwrap();
    }
    assert_eq!(device.size(), 16);

    let mut out = vec![0u8; 16];
    let mut pos = 0;
    while pos < out.len() {
        let n = device.read_at(&mut out[pos..], pos as u64).unwrap();
        assert!(n > 0);
        pos += n;
    }
    assert_eq!(out, data);
}

#[test]
fn test_zero_length_calls() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"data", 0).unwrap();

    let mut empty: [u8; 0] = [];
    assert_eq!(device.read_at(&mut empty, 0).unwrap(), 0);
    assert_eq!(device.write_at(b"", 100).unwrap(), 0);
    assert_eq!(device.size(), 4);
    assert_eq!(device.block_set_count(), 1);
}

#[test]
fn test_overwrite_is_local_and_size_only_grows() {
    let device = setup_device(QuantumFill::Eager);
    let a = [b'A'; 10];

    assert_eq!(device.write_at(&a, 0).unwrap(), 8);
    assert_eq!(device.write_at(&a[8..], 8).unwrap(), 2);
    assert_eq!(device.write_at(&[b'B'; 5], 0).unwrap(), 5);
    assert_eq!(device.size(), 10);

    let mut buf = [0u8; 5];
    let first = device.read_at(&mut buf, 5).unwrap();
    assert_eq!(first, 3);
    let second = device.read_at(&mut buf[first..], 8).unwrap();
    assert_eq!(second, 2);
    assert_eq!(&buf, b"AAAAA");

    let mut head = [0u8; 5];
    device.read_at(&mut head, 0).unwrap();
    assert_eq!(&head, b"BBBBB");
}

// =============================================================================
// End-of-Data and Hole Tests
// =============================================================================

#[test]
fn test_read_at_or_past_size_returns_zero() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"abcd", 0).unwrap();

    let mut buf = [0u8; 64];
    assert_eq!(device.read_at(&mut buf, 4).unwrap(), 0);
    assert_eq!(device.read_at(&mut buf, 100).unwrap(), 0);
    assert_eq!(device.read_at(&mut buf, u64::MAX).unwrap(), 0);
}

#[test]
fn test_read_on_empty_device_returns_zero() {
    let device = setup_device(QuantumFill::Lazy);

    let mut buf = [0u8; 8];
    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 0);
}

#[test]
fn test_read_clamped_to_size() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"abc", 0).unwrap();

    let mut buf = [0xffu8; 8];
    assert_eq!(device.read_at(&mut buf, 1).unwrap(), 2);
    assert_eq!(&buf[..2], b"bc");
    assert_eq!(buf[2], 0xff);
}

#[test]
fn test_lazy_hole_reads_zero_bytes() {
    let device = setup_device(QuantumFill::Lazy);
    device.write_at(b"x", 20).unwrap();
    assert_eq!(device.size(), 21);
    assert_eq!(device.quantum_count(), 1);

    let mut buf = [0u8; 8];
    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 0);
    assert_eq!(device.read_at(&mut buf, 8).unwrap(), 0);

    // The written quantum reads back zero-filled around the byte
    assert_eq!(device.read_at(&mut buf, 16).unwrap(), 5);
    assert_eq!(&buf[..5], &[0, 0, 0, 0, b'x']);
}

#[test]
fn test_lazy_hole_in_earlier_block_set() {
    let device = setup_device(QuantumFill::Lazy);
    device.write_at(b"far", 40).unwrap();

    assert_eq!(device.block_set_count(), 2);
    assert_eq!(device.quantum_count(), 1);

    let mut buf = [0u8; 8];
    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 0);
    assert_eq!(device.read_at(&mut buf, 40).unwrap(), 3);
    assert_eq!(&buf[..3], b"far");
}

#[test]
fn test_eager_gap_reads_zero_filled() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"x", 40).unwrap();

    assert_eq!(device.block_set_count(), 2);
    assert_eq!(device.quantum_count(), 8);

    let mut buf = [0xaau8; 8];
    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 8);
    assert_eq!(buf, [0u8; 8]);
}

// =============================================================================
// Out-of-Memory Tests
// =============================================================================

#[test]
fn test_oom_on_new_block_set_leaves_device_unchanged() {
    let device = setup_limited_device(QuantumFill::Eager, 32);
    device.write_at(b"abc", 0).unwrap();

    let result = device.write_at(b"zz", 32);

    assert!(matches!(result, Err(QdevError::OutOfMemory { .. })));
    assert_eq!(device.size(), 3);
    assert_eq!(device.block_set_count(), 1);
    assert_eq!(device.allocated_bytes(), 32);

    let mut buf = [0u8; 3];
    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 3);
    assert_eq!(&buf, b"abc");
}

#[test]
fn test_oom_on_first_block_set_allocates_nothing() {
    let device = setup_limited_device(QuantumFill::Eager, 20);

    let result = device.write_at(b"abc", 0);

    assert!(matches!(result, Err(QdevError::OutOfMemory { .. })));
    assert_eq!(device.size(), 0);
    assert_eq!(device.block_set_count(), 0);
    assert_eq!(device.allocated_bytes(), 0);
}

#[test]
fn test_oom_mid_extension_keeps_completed_links() {
    let device = setup_limited_device(QuantumFill::Eager, 64);

    let result = device.write_at(b"deep", 96);

    assert!(matches!(result, Err(QdevError::OutOfMemory { .. })));
    assert_eq!(device.size(), 0);
    assert_eq!(device.block_set_count(), 2);
    assert_eq!(device.allocated_bytes(), 64);

    // The completed links stay usable
    assert_eq!(device.write_at(b"ok", 40).unwrap(), 2);
    assert_eq!(device.size(), 42);
}

#[test]
fn test_lazy_oom_on_quantum() {
    let device = setup_limited_device(QuantumFill::Lazy, 8);
    device.write_at(b"one", 0).unwrap();

    let result = device.write_at(b"two", 8);

    assert!(matches!(result, Err(QdevError::OutOfMemory { requested: 8 })));
    assert_eq!(device.size(), 3);
    assert_eq!(device.quantum_count(), 1);

    // Writing inside the existing quantum still works
    assert_eq!(device.write_at(b"ONE", 0).unwrap(), 3);
}

// =============================================================================
// Caller Buffer Fault Tests
// =============================================================================

#[test]
fn test_partial_delivery_is_short_read() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"abcdef", 0).unwrap();

    let mut sink = ShortSink {
        buf: vec![0u8; 6],
        accept: 3,
    };
    assert_eq!(device.read_into(&mut sink, 0).unwrap(), 3);
    assert_eq!(&sink.buf[..3], b"abc");
}

#[test]
fn test_zero_delivery_is_access_fault() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"abcdef", 0).unwrap();

    let mut sink = ShortSink {
        buf: vec![0u8; 6],
        accept: 0,
    };
    assert!(matches!(
        device.read_into(&mut sink, 0),
        Err(QdevError::AccessFault)
    ));
}

#[test]
fn test_faulting_source_aborts_write() {
    let device = setup_device(QuantumFill::Eager);

    let result = device.write_from(&FaultySource { len: 4 }, 0);

    assert!(matches!(result, Err(QdevError::AccessFault)));
    assert_eq!(device.size(), 0);
    assert_eq!(device.block_set_count(), 0);
}

#[test]
fn test_faulting_source_keeps_existing_data() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"keep", 0).unwrap();

    assert!(device.write_from(&FaultySource { len: 4 }, 0).is_err());

    let mut buf = [0u8; 4];
    device.read_at(&mut buf, 0).unwrap();
    assert_eq!(&buf, b"keep");
    assert_eq!(device.size(), 4);
}

#[test]
fn test_write_past_offset_range_rejected() {
    let device = setup_device(QuantumFill::Lazy);

    let result = device.write_at(b"xy", u64::MAX);

    assert!(matches!(result, Err(QdevError::InvalidArgument(_))));
    assert_eq!(device.block_set_count(), 0);
}

// =============================================================================
// Teardown Tests
// =============================================================================

#[test]
fn test_teardown_resets_device() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(b"abc", 0).unwrap();
    device.write_at(b"def", 40).unwrap();

    let stats = device.teardown();

    assert_eq!(stats.block_sets, 2);
    assert_eq!(stats.quanta, 8);
    assert_eq!(stats.bytes, 64);
    assert_eq!(device.size(), 0);
    assert_eq!(device.block_set_count(), 0);
    assert_eq!(device.allocated_bytes(), 0);

    let mut buf = [0u8; 8];
    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 0);
}

#[test]
fn test_teardown_is_idempotent() {
    let device = setup_device(QuantumFill::Lazy);
    device.write_at(b"abc", 0).unwrap();

    let first = device.teardown();
    let second = device.teardown();

    assert_eq!(first.block_sets, 1);
    assert_eq!(first.quanta, 1);
    assert_eq!(second, ReleaseStats::default());
}

#[test]
fn test_teardown_on_empty_device() {
    let device = setup_device(QuantumFill::Eager);
    assert_eq!(device.teardown(), ReleaseStats::default());
}

#[test]
fn test_write_after_teardown_behaves_like_fresh_device() {
    let used = setup_device(QuantumFill::Eager);
    used.write_at(b"old data", 0).unwrap();
    used.write_at(b"more", 50).unwrap();
    used.teardown();

    let fresh = setup_device(QuantumFill::Eager);

    assert_eq!(used.write_at(b"new", 3).unwrap(), fresh.write_at(b"new", 3).unwrap());
    assert_eq!(used.size(), fresh.size());
    assert_eq!(used.block_set_count(), fresh.block_set_count());
    assert_eq!(used.allocated_bytes(), fresh.allocated_bytes());

    let mut a = [0u8; 6];
    let mut b = [0u8; 6];
    assert_eq!(used.read_at(&mut a, 0).unwrap(), fresh.read_at(&mut b, 0).unwrap());
    assert_eq!(a, b);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers_on_one_device() {
    let device = setup_device(QuantumFill::Lazy);

    crossbeam::thread::scope(|s| {
        for i in 0..16u8 {
            let device = &device;
            s.spawn(move |_| {
                let pos = i as u64 * 8;
                assert_eq!(device.write_at(&[i; 8], pos).unwrap(), 8);
            });
        }
    })
    .unwrap();

    assert_eq!(device.size(), 128);
    assert_eq!(device.block_set_count(), 4);
    assert_eq!(device.quantum_count(), 16);

    for i in 0..16u8 {
        let mut buf = [0u8; 8];
        assert_eq!(device.read_at(&mut buf, i as u64 * 8).unwrap(), 8);
        assert_eq!(buf, [i; 8]);
    }
}

#[test]
fn test_concurrent_readers_and_writer() {
    let device = setup_device(QuantumFill::Eager);
    device.write_at(&[7u8; 8], 0).unwrap();

    crossbeam::thread::scope(|s| {
        let device = &device;
        s.spawn(move |_| {
            for round in 0..100u64 {
                device.write_at(&[7u8; 8], 8 + (round % 4) * 8).unwrap();
            }
        });
        for _ in 0..4 {
            s.spawn(move |_| {
                for _ in 0..100 {
                    let mut buf = [0u8; 8];
                    assert_eq!(device.read_at(&mut buf, 0).unwrap(), 8);
                    assert_eq!(buf, [7u8; 8]);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(device.size(), 40);
}
