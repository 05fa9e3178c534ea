//! Raw Buffer Integration Tests
//!
//! Allocation, resize, fill and copy through the unchecked accessor, the
//! lifetime bookkeeping of the checked wrapper, and the statistics and events
//! every buffer operation leaves behind.
//!
//! Statistics are process-wide and tests in this binary run in parallel, so
//! counter assertions compare deltas with `>=`.

mod common;

use common::{run_concurrently, thread_count, RawFixture};
use ordo::location::{Location, OrderingMode, ValueKind};
use ordo::logging::{recorded_events, RawEvent};
use ordo::memory::{CheckedAccessor, MemoryAccessor};
use ordo::stats::BufferStats;
use ordo::{OrdoConfig, OrdoError};

/// ============================================================================
/// ALLOCATE / RESIZE / FREE
/// ============================================================================

#[test]
fn test_allocate_write_read_free() {
    // Arrange
    let fixture = RawFixture::new();
    let mem = fixture.mem();

    // Act
    let addr = mem.allocate(64).unwrap();

    // Assert
    assert_ne!(addr, 0);
    assert_eq!(addr % 8, 0);
    unsafe {
        for i in 0..8 {
            let slot = Location::address(addr + i * 8, ValueKind::I64);
            mem.put_i64(slot, OrderingMode::Plain, i as i64 * -3);
        }
        let slot = Location::address(addr + 56, ValueKind::I64);
        assert_eq!(mem.get_i64(slot, OrderingMode::Volatile), -21);
        mem.free(addr);
    }
}

#[test]
fn test_zero_byte_allocations_are_distinct() {
    let fixture = RawFixture::new();
    let mem = fixture.mem();

    let a = mem.allocate(0).unwrap();
    let b = mem.allocate(0).unwrap();
    assert_ne!(a, 0);
    assert_ne!(a, b);
    unsafe {
        mem.free(a);
        mem.free(b);
        mem.free(0);
    }
}

#[test]
fn test_negative_size_rejected() {
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    assert!(matches!(
        mem.allocate(-1),
        Err(OrdoError::InvalidArgument(_))
    ));
}

#[test]
fn test_resize_preserves_prefix() {
    // Arrange
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let addr = mem.allocate(16).unwrap();
    unsafe {
        mem.put_i64(Location::address(addr, ValueKind::I64), OrderingMode::Plain, 0x1122);
        mem.put_i64(Location::address(addr + 8, ValueKind::I64), OrderingMode::Plain, 0x3344);
    }

    // Act - grow well past any in-place slack
    let grown = unsafe { mem.resize(addr, 1 << 20) }.unwrap();

    // Assert
    unsafe {
        assert_eq!(mem.get_i64(Location::address(grown, ValueKind::I64), OrderingMode::Plain), 0x1122);
        assert_eq!(
            mem.get_i64(Location::address(grown + 8, ValueKind::I64), OrderingMode::Plain),
            0x3344
        );
        let shrunk = mem.resize(grown, 8).unwrap();
        assert_eq!(mem.get_i64(Location::address(shrunk, ValueKind::I64), OrderingMode::Plain), 0x1122);
        mem.free(shrunk);
    }
}

#[test]
fn test_resize_of_null_allocates() {
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let addr = unsafe { mem.resize(0, 32) }.unwrap();
    assert_ne!(addr, 0);
    unsafe { mem.free(addr) };
}

/// ============================================================================
/// FILL AND COPY
/// ============================================================================

/// Fill and copy over every combination of 1/2/4/8 alignment
#[test]
fn test_fill_and_copy_across_units() {
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let src = mem.allocate(128).unwrap();
    let dst = mem.allocate(128).unwrap();

    for (offset, length) in [(0usize, 64usize), (4, 20), (2, 6), (1, 13), (3, 1), (8, 0)] {
        unsafe {
            mem.fill(Location::address(src, ValueKind::I8), 128, 0);
            mem.fill(Location::address(dst, ValueKind::I8), 128, 0xEE);
            mem.fill(Location::address(src + offset, ValueKind::I8), length, 0x5A);
            mem.copy(
                Location::address(src + offset, ValueKind::I8),
                Location::address(dst + offset, ValueKind::I8),
                length,
            );

            let bytes = std::slice::from_raw_parts(dst as *const u8, 128);
            for (i, &b) in bytes.iter().enumerate() {
                let expected = if (offset..offset + length).contains(&i) { 0x5A } else { 0xEE };
                assert_eq!(b, expected, "offset {} length {} byte {}", offset, length, i);
            }
        }
    }

    unsafe {
        mem.free(src);
        mem.free(dst);
    }
}

#[test]
fn test_overlapping_copy_behaves_like_memmove() {
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let buf = mem.allocate(32).unwrap();

    unsafe {
        let bytes = std::slice::from_raw_parts_mut(buf as *mut u8, 32);
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        mem.copy(
            Location::address(buf, ValueKind::I8),
            Location::address(buf + 8, ValueKind::I8),
            16,
        );
        let bytes = std::slice::from_raw_parts(buf as *const u8, 32);
        assert_eq!(&bytes[8..24], &(0u8..16).collect::<Vec<_>>()[..]);
        mem.free(buf);
    }
}

/// ============================================================================
/// CHECKED WRAPPER
/// ============================================================================

#[test]
fn test_checked_double_free_reported() {
    // Arrange
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let checked = CheckedAccessor::enabled(&mem);
    let addr = checked.allocate(24).unwrap();

    // Act
    checked.free(addr).unwrap();
    let second = checked.free(addr);

    // Assert
    match second {
        Err(OrdoError::ContractViolation { operation, detail }) => {
            assert_eq!(operation, "free");
            assert!(detail.contains("already freed"), "{}", detail);
        },
        other => panic!("expected a contract violation, got {:?}", other),
    }
    assert_eq!(checked.live_buffers(), 0);
}

#[test]
fn test_checked_access_past_end_reported() {
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let checked = CheckedAccessor::enabled(&mem);
    let addr = checked.allocate(12).unwrap();

    unsafe {
        checked
            .put_i32(Location::address(addr + 8, ValueKind::I32), OrderingMode::Volatile, 5)
            .unwrap();
        let past = checked.get_i64(Location::address(addr + 8, ValueKind::I64), OrderingMode::Volatile);
        assert!(matches!(past, Err(OrdoError::ContractViolation { .. })));

        let mismatch = checked.get_i64(Location::address(addr, ValueKind::I32), OrderingMode::Volatile);
        assert!(matches!(mismatch, Err(OrdoError::ContractViolation { .. })));
    }
    checked.free(addr).unwrap();
}

#[test]
fn test_checked_copy_into_freed_buffer_reported() {
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let checked = CheckedAccessor::enabled(&mem);
    let src = checked.allocate(16).unwrap();
    let dst = checked.allocate(16).unwrap();
    checked.free(dst).unwrap();

    let result = unsafe {
        checked.copy(
            Location::address(src, ValueKind::I8),
            Location::address(dst, ValueKind::I8),
            16,
        )
    };
    assert!(matches!(result, Err(OrdoError::ContractViolation { .. })));
    checked.free(src).unwrap();
}

/// ============================================================================
/// STATISTICS AND EVENTS
/// ============================================================================

#[test]
fn test_stats_count_buffer_lifecycle() {
    // Arrange
    let fixture = RawFixture::new();
    let mem = fixture.mem();
    let before = BufferStats::global().snapshot();

    // Act
    let addr = mem.allocate(100).unwrap();
    let addr = unsafe { mem.resize(addr, 200) }.unwrap();
    unsafe { mem.free(addr) };

    // Assert
    let delta = BufferStats::global().snapshot().since(&before);
    assert!(delta.allocations >= 1);
    assert!(delta.resizes >= 1);
    assert!(delta.frees >= 1);
    assert!(delta.bytes_requested >= 300);
    assert!(BufferStats::global().to_json().contains("\"allocations\""));
}

#[test]
fn test_concurrent_allocations_are_unique_and_counted() {
    let threads = thread_count();
    let before = BufferStats::global().snapshot();

    let addresses: Vec<usize> = run_concurrently(threads, |i| {
        let fixture = RawFixture::new();
        let mem = fixture.mem();
        (0..100)
            .map(|_| mem.allocate(16 + i as i64).unwrap())
            .collect::<Vec<_>>()
    })
    .into_iter()
    .flatten()
    .collect();

    common::assert_all_unique(&addresses);
    let delta = BufferStats::global().snapshot().since(&before);
    assert!(delta.allocations >= (threads * 100) as i64);

    let fixture = RawFixture::new();
    let mem = fixture.mem();
    for addr in addresses {
        unsafe { mem.free(addr) };
    }
}

#[test]
fn test_allocation_ceiling_refused_and_logged() {
    // Arrange - a unique request size so the event can be found
    let fixture = RawFixture::new();
    let config = OrdoConfig {
        max_allocation_bytes: 4096,
        ..Default::default()
    };
    let mem = MemoryAccessor::with_config(&fixture.capability, &config).unwrap();
    let requested = 4096 + 777;
    let before = BufferStats::global().snapshot();

    // Act
    let result = mem.allocate(requested);

    // Assert
    assert!(matches!(
        result,
        Err(OrdoError::OutOfResource { requested: r, .. }) if r == requested as usize
    ));
    assert!(result.unwrap_err().is_recoverable());
    assert!(BufferStats::global().snapshot().since(&before).failures >= 1);
    assert!(recorded_events().iter().any(|e| matches!(
        e,
        RawEvent::AllocationFailure { requested: r, .. } if *r == requested as usize
    )));

    // Under the ceiling still works
    let addr = mem.allocate(4096).unwrap();
    unsafe { mem.free(addr) };
}

#[test]
fn test_invalid_config_rejected_by_accessor() {
    let fixture = RawFixture::new();
    let config = OrdoConfig {
        max_allocation_bytes: 0,
        ..Default::default()
    };
    assert!(matches!(
        MemoryAccessor::with_config(&fixture.capability, &config),
        Err(OrdoError::Configuration(_))
    ));
}
