//! Raw Buffers - allocate, resize, free, fill, copy
//!
//! Buffers come from the system allocator (`malloc`/`realloc`/`free`) and are
//! single-owner: the address returned by `allocate` must be freed exactly
//! once, and must not be freed while another thread may still access it.
//!
//! Only size validation fails with an error. Everything else is a contract:
//!
//! ```text
//! negative / unrepresentable size   -> InvalidArgument
//! above max_allocation_bytes        -> OutOfResource
//! system returned null              -> OutOfResource
//! ```
//!
//! A request of zero bytes yields a 1-byte allocation, so every successful
//! `allocate` returns a unique non-zero address.

use super::MemoryAccessor;
use crate::error::{OrdoError, Result};
use crate::location::Location;
use crate::logging::{log_event, RawEvent};
use crate::stats::BUFFER_STATS;
use crate::util::Alignment;
use std::ptr;

impl<'c> MemoryAccessor<'c> {
    /// Convert a signed request into a byte count the system can serve
    fn checked_size(&self, bytes: i64) -> Result<usize> {
        crate::ensure!(
            bytes >= 0,
            OrdoError::InvalidArgument(format!("negative buffer size {}", bytes))
        );

        let size = usize::try_from(bytes)
            .ok()
            .filter(|&s| s <= isize::MAX as usize)
            .ok_or_else(|| {
                OrdoError::InvalidArgument(format!(
                    "buffer size {} does not fit the address space",
                    bytes
                ))
            })?;

        if size > self.limits.max_allocation_bytes {
            return Err(self.refuse(size, "above the configured allocation ceiling"));
        }

        Ok(size.max(1))
    }

    fn refuse(&self, requested: usize, reason: &str) -> OrdoError {
        log::warn!("allocation of {} bytes refused: {}", requested, reason);
        log_event(RawEvent::AllocationFailure {
            requested,
            reason: reason.to_string(),
        });
        if self.limits.stats_enabled {
            BUFFER_STATS.record_failure();
        }
        OrdoError::OutOfResource {
            requested,
            reason: reason.to_string(),
        }
    }

    /// Allocate an uninitialised buffer of `bytes` bytes
    ///
    /// The returned address is non-zero and aligned for any [`ValueKind`](crate::location::ValueKind).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative or unrepresentable size,
    /// `OutOfResource` when the ceiling or the system refuses.
    pub fn allocate(&self, bytes: i64) -> Result<usize> {
        let size = self.checked_size(bytes)?;

        // SAFETY: size is non-zero; malloc has no other precondition
        let address = unsafe { libc::malloc(size) } as usize;
        if address == 0 {
            return Err(self.refuse(size, "system allocator returned null"));
        }

        log_event(RawEvent::BufferAllocated {
            address,
            bytes: size,
        });
        if self.limits.stats_enabled {
            BUFFER_STATS.record_allocation(size);
        }
        Ok(address)
    }

    /// Resize a buffer, possibly moving it
    ///
    /// An `address` of 0 allocates. The first `min(old, new)` bytes are
    /// preserved; anything beyond is uninitialised. On error the original
    /// buffer is untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// `address` is 0 or a live address returned by `allocate`/`resize` that
    /// no other thread is accessing. On success the old address is dead.
    pub unsafe fn resize(&self, address: usize, bytes: i64) -> Result<usize> {
        if address == 0 {
            return self.allocate(bytes);
        }

        let size = self.checked_size(bytes)?;
        let new_address = unsafe { libc::realloc(address as *mut libc::c_void, size) } as usize;
        if new_address == 0 {
            return Err(self.refuse(size, "system allocator returned null"));
        }

        log_event(RawEvent::BufferResized {
            old_address: address,
            new_address,
            bytes: size,
        });
        if self.limits.stats_enabled {
            BUFFER_STATS.record_resize(size);
        }
        Ok(new_address)
    }

    /// Release a buffer; 0 is a no-op
    ///
    /// # Safety
    ///
    /// `address` is 0 or a live address returned by `allocate`/`resize`, not
    /// freed before and not accessed by any thread afterwards.
    pub unsafe fn free(&self, address: usize) {
        if address == 0 {
            return;
        }

        unsafe { libc::free(address as *mut libc::c_void) };

        log_event(RawEvent::BufferFreed { address });
        if self.limits.stats_enabled {
            BUFFER_STATS.record_free();
        }
    }

    /// Set `length` bytes starting at `dst` to `value`
    ///
    /// Bytes are written in the widest unit (8/4/2/1) dividing both the
    /// effective address and `length`.
    ///
    /// # Safety
    ///
    /// The range is valid for writes and not concurrently accessed.
    pub unsafe fn fill(&self, dst: Location, length: usize, value: u8) {
        if length == 0 {
            return;
        }

        let addr = dst.effective_address();
        let unit = Alignment::transfer_unit(&[addr, length]);
        let count = length / unit;
        let pattern = u64::from_ne_bytes([value; 8]);

        unsafe {
            match unit {
                8 => fill_units(addr as *mut u64, count, pattern),
                4 => fill_units(addr as *mut u32, count, pattern as u32),
                2 => fill_units(addr as *mut u16, count, pattern as u16),
                _ => ptr::write_bytes(addr as *mut u8, value, length),
            }
        }
    }

    /// Copy `length` bytes from `src` to `dst`; the ranges may overlap
    ///
    /// Bytes move in the widest unit (8/4/2/1) dividing both effective
    /// addresses and `length`. The result is byte-for-byte a `memmove`.
    ///
    /// # Safety
    ///
    /// `src` is valid for reads and `dst` for writes of `length` bytes, and
    /// neither range is written concurrently.
    pub unsafe fn copy(&self, src: Location, dst: Location, length: usize) {
        if length == 0 {
            return;
        }

        let from = src.effective_address();
        let to = dst.effective_address();
        let unit = Alignment::transfer_unit(&[from, to, length]);
        let count = length / unit;

        unsafe {
            match unit {
                8 => ptr::copy(from as *const u64, to as *mut u64, count),
                4 => ptr::copy(from as *const u32, to as *mut u32, count),
                2 => ptr::copy(from as *const u16, to as *mut u16, count),
                _ => ptr::copy(from as *const u8, to as *mut u8, length),
            }
        }
    }
}

#[inline]
unsafe fn fill_units<T: Copy>(dst: *mut T, count: usize, pattern: T) {
    for i in 0..count {
        unsafe { dst.add(i).write(pattern) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::config::OrdoConfig;
    use crate::location::{OrderingMode, ValueKind};

    #[test]
    fn test_allocate_zero_is_unique_and_non_null() {
        let mem = MemoryAccessor::internal();
        let a = mem.allocate(0).unwrap();
        let b = mem.allocate(0).unwrap();

        assert_ne!(a, 0);
        assert_ne!(a, b);
        unsafe {
            mem.free(a);
            mem.free(b);
        }
    }

    #[test]
    fn test_negative_size_rejected() {
        let mem = MemoryAccessor::internal();
        assert!(matches!(
            mem.allocate(-1),
            Err(OrdoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_ceiling_refuses_without_calling_system() {
        let cap = Capability::internal();
        let config = OrdoConfig {
            max_allocation_bytes: 64,
            ..Default::default()
        };
        let mem = MemoryAccessor::with_config(&cap, &config).unwrap();

        let addr = mem.allocate(64).unwrap();
        unsafe { mem.free(addr) };

        let err = mem.allocate(65).unwrap_err();
        assert!(matches!(err, OrdoError::OutOfResource { requested: 65, .. }));
    }

    #[test]
    fn test_resize_preserves_prefix() {
        let mem = MemoryAccessor::internal();
        unsafe {
            let addr = mem.allocate(4).unwrap();
            mem.put_i32(Location::address(addr, ValueKind::I32), OrderingMode::Plain, 0x0102_0304);

            let grown = mem.resize(addr, 4096).unwrap();
            assert_eq!(
                mem.get_i32(Location::address(grown, ValueKind::I32), OrderingMode::Plain),
                0x0102_0304
            );

            let shrunk = mem.resize(grown, 0).unwrap();
            assert_ne!(shrunk, 0);
            mem.free(shrunk);
        }
    }

    #[test]
    fn test_resize_null_allocates() {
        let mem = MemoryAccessor::internal();
        unsafe {
            let addr = mem.resize(0, 16).unwrap();
            assert_ne!(addr, 0);
            mem.free(addr);
            mem.free(0);
        }
    }

    #[test]
    fn test_fill_odd_length() {
        let mem = MemoryAccessor::internal();
        let mut bytes = [0u8; 13];
        let base = bytes.as_mut_ptr() as usize;

        unsafe { mem.fill(Location::address(base + 1, ValueKind::I8), 11, 0xAB) };

        assert_eq!(bytes[0], 0);
        assert!(bytes[1..12].iter().all(|&b| b == 0xAB));
        assert_eq!(bytes[12], 0);
    }

    #[test]
    fn test_copy_overlapping_forward_and_backward() {
        let mem = MemoryAccessor::internal();
        let mut words: [u64; 6] = [1, 2, 3, 4, 5, 6];
        let base = words.as_mut_ptr() as usize;

        unsafe {
            mem.copy(
                Location::address(base, ValueKind::I64),
                Location::address(base + 8, ValueKind::I64),
                32,
            );
        }
        assert_eq!(words, [1, 1, 2, 3, 4, 6]);

        unsafe {
            mem.copy(
                Location::address(base + 8, ValueKind::I64),
                Location::address(base, ValueKind::I64),
                40,
            );
        }
        assert_eq!(words, [1, 2, 3, 4, 6, 6]);
    }
}
