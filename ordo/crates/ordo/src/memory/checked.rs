//! Checked Accessor - Contract Validation for Debugging
//!
//! Wraps a [`MemoryAccessor`] and reports the contract violations the hot
//! path leaves undefined:
//!
//! - null effective address
//! - misaligned access
//! - access width incompatible with the slot's kind
//! - access outside, or after the release of, a buffer this accessor allocated
//! - double free, or freeing an address it never handed out
//!
//! Every violation is a `ContractViolation` error; nothing is silently
//! accepted. When `debug_checks` is off, location checks are skipped and the
//! wrapper forwards straight to the inner accessor; buffer bookkeeping, and
//! with it double-free detection, stays on.
//!
//! Only buffers obtained through this wrapper are tracked. Addresses it has
//! never seen (object fields, stack slots) pass the lifetime check.

use super::MemoryAccessor;
use crate::config::OrdoConfig;
use crate::error::{OrdoError, Result};
use crate::location::{Location, OrderingMode, ValueKind};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::ops::Bound;

macro_rules! checked_typed_access {
    ($($get:ident, $put:ident => $ty:ty, $kind:expr;)*) => {
        $(
            /// # Safety
            ///
            /// Memory this wrapper does not track must still be live and mapped.
            pub unsafe fn $get(&self, loc: Location, mode: OrderingMode) -> Result<$ty> {
                self.check(stringify!($get), &loc, $kind)?;
                Ok(unsafe { self.inner.$get(loc, mode) })
            }

            /// # Safety
            ///
            /// Memory this wrapper does not track must still be live and mapped.
            pub unsafe fn $put(&self, loc: Location, mode: OrderingMode, value: $ty) -> Result<()> {
                self.check(stringify!($put), &loc, $kind)?;
                unsafe { self.inner.$put(loc, mode, value) };
                Ok(())
            }
        )*
    };
}

macro_rules! checked_cas_access {
    ($($strong:ident, $weak:ident, $swap:ident, $add:ident => $ty:ty, $kind:expr;)*) => {
        $(
            /// # Safety
            ///
            /// Memory this wrapper does not track must still be live and mapped.
            pub unsafe fn $strong(&self, loc: Location, expected: $ty, update: $ty) -> Result<bool> {
                self.check(stringify!($strong), &loc, $kind)?;
                Ok(unsafe { self.inner.$strong(loc, expected, update) })
            }

            /// # Safety
            ///
            /// Memory this wrapper does not track must still be live and mapped.
            pub unsafe fn $weak(&self, loc: Location, expected: $ty, update: $ty) -> Result<bool> {
                self.check(stringify!($weak), &loc, $kind)?;
                Ok(unsafe { self.inner.$weak(loc, expected, update) })
            }

            /// # Safety
            ///
            /// Memory this wrapper does not track must still be live and mapped.
            pub unsafe fn $swap(&self, loc: Location, value: $ty) -> Result<$ty> {
                self.check(stringify!($swap), &loc, $kind)?;
                Ok(unsafe { self.inner.$swap(loc, value) })
            }

            /// # Safety
            ///
            /// Memory this wrapper does not track must still be live and mapped.
            pub unsafe fn $add(&self, loc: Location, delta: $ty) -> Result<$ty> {
                self.check(stringify!($add), &loc, $kind)?;
                Ok(unsafe { self.inner.$add(loc, delta) })
            }
        )*
    };
}

#[derive(Debug, Default)]
struct BufferBook {
    /// start -> size
    live: BTreeMap<usize, usize>,
    /// start -> size, until the system hands the address out again
    freed: BTreeMap<usize, usize>,
}

impl BufferBook {
    fn containing(map: &BTreeMap<usize, usize>, addr: usize) -> Option<(usize, usize)> {
        map.range((Bound::Unbounded, Bound::Included(addr)))
            .next_back()
            .filter(|&(&start, &size)| addr < start + size)
            .map(|(&start, &size)| (start, size))
    }

    fn track(&mut self, address: usize, size: usize) {
        let end = address + size;
        self.freed.retain(|&start, &mut len| start + len <= address || start >= end);
        self.live.insert(address, size);
    }
}

/// Debug-mode wrapper that validates every access
#[derive(Debug)]
pub struct CheckedAccessor<'a, 'c> {
    inner: &'a MemoryAccessor<'c>,
    enabled: bool,
    book: Mutex<BufferBook>,
}

impl<'a, 'c> CheckedAccessor<'a, 'c> {
    /// Wrap `inner`; checks follow [`OrdoConfig::global`]
    pub fn new(inner: &'a MemoryAccessor<'c>) -> Self {
        Self::with_config(inner, OrdoConfig::global())
    }

    pub fn with_config(inner: &'a MemoryAccessor<'c>, config: &OrdoConfig) -> Self {
        Self {
            inner,
            enabled: config.debug_checks,
            book: Mutex::new(BufferBook::default()),
        }
    }

    /// Wrap `inner` with checks forced on
    pub fn enabled(inner: &'a MemoryAccessor<'c>) -> Self {
        Self {
            inner,
            enabled: true,
            book: Mutex::new(BufferBook::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn inner(&self) -> &'a MemoryAccessor<'c> {
        self.inner
    }

    /// Number of tracked buffers not yet freed
    pub fn live_buffers(&self) -> usize {
        self.book.lock().live.len()
    }

    fn check_range(&self, operation: &str, addr: usize, len: usize) -> Result<()> {
        let book = self.book.lock();
        if let Some((start, size)) = BufferBook::containing(&book.live, addr) {
            let fits = matches!(addr.checked_add(len), Some(end) if end <= start + size);
            if !fits {
                return Err(OrdoError::contract(
                    operation,
                    format!(
                        "{} bytes at {:#x} overrun the {}-byte buffer at {:#x}",
                        len, addr, size, start
                    ),
                ));
            }
            return Ok(());
        }
        if let Some((start, _)) = BufferBook::containing(&book.freed, addr) {
            return Err(OrdoError::contract(
                operation,
                format!("{:#x} lies in the freed buffer at {:#x}", addr, start),
            ));
        }
        Ok(())
    }

    fn check(&self, operation: &str, loc: &Location, op: ValueKind) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let addr = loc.effective_address();
        if addr == 0 {
            return Err(OrdoError::contract(operation, "null location"));
        }
        if !loc.kind().accepts(op) {
            return Err(OrdoError::contract(
                operation,
                format!("{:?} slot at {:#x} accessed as {:?}", loc.kind(), addr, op),
            ));
        }
        if addr % op.align() != 0 {
            return Err(OrdoError::contract(
                operation,
                format!("{:#x} is not aligned to {} bytes", addr, op.align()),
            ));
        }
        self.check_range(operation, addr, op.size())
    }

    /// Address-width access accepts a `Reference` slot or any integer slot of
    /// pointer width
    fn check_address(&self, operation: &str, loc: &Location) -> Result<()> {
        let width = ValueKind::Reference.size();
        if self.enabled && loc.kind() != ValueKind::Reference && loc.kind().size() != width {
            return Err(OrdoError::contract(
                operation,
                format!(
                    "{:?} slot at {:#x} is not address-width",
                    loc.kind(),
                    loc.effective_address()
                ),
            ));
        }
        self.check(operation, &loc.with_kind(ValueKind::Reference), ValueKind::Reference)
    }

    fn check_span(&self, operation: &str, loc: &Location, len: usize) -> Result<()> {
        if !self.enabled || len == 0 {
            return Ok(());
        }
        if loc.effective_address() == 0 {
            return Err(OrdoError::contract(operation, "null location"));
        }
        self.check_range(operation, loc.effective_address(), len)
    }

    // === Typed access ===

    checked_typed_access! {
        get_bool, put_bool => bool, ValueKind::Bool;
        get_i8, put_i8 => i8, ValueKind::I8;
        get_i16, put_i16 => i16, ValueKind::I16;
        get_char, put_char => u16, ValueKind::Char;
        get_i32, put_i32 => i32, ValueKind::I32;
        get_i64, put_i64 => i64, ValueKind::I64;
        get_f32, put_f32 => f32, ValueKind::F32;
        get_f64, put_f64 => f64, ValueKind::F64;
    }

    checked_cas_access! {
        compare_and_swap_i32, weak_compare_and_swap_i32, get_and_set_i32, get_and_add_i32 => i32, ValueKind::I32;
        compare_and_swap_i64, weak_compare_and_swap_i64, get_and_set_i64, get_and_add_i64 => i64, ValueKind::I64;
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn get_reference<T>(&self, loc: Location, mode: OrderingMode) -> Result<*mut T> {
        self.check("get_reference", &loc, ValueKind::Reference)?;
        Ok(unsafe { self.inner.get_reference(loc, mode) })
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn put_reference<T>(
        &self,
        loc: Location,
        mode: OrderingMode,
        value: *mut T,
    ) -> Result<()> {
        self.check("put_reference", &loc, ValueKind::Reference)?;
        unsafe { self.inner.put_reference(loc, mode, value) };
        Ok(())
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn compare_and_swap_reference<T>(
        &self,
        loc: Location,
        expected: *mut T,
        update: *mut T,
    ) -> Result<bool> {
        self.check("compare_and_swap_reference", &loc, ValueKind::Reference)?;
        Ok(unsafe { self.inner.compare_and_swap_reference(loc, expected, update) })
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn weak_compare_and_swap_reference<T>(
        &self,
        loc: Location,
        expected: *mut T,
        update: *mut T,
    ) -> Result<bool> {
        self.check("weak_compare_and_swap_reference", &loc, ValueKind::Reference)?;
        Ok(unsafe { self.inner.weak_compare_and_swap_reference(loc, expected, update) })
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn get_and_set_reference<T>(&self, loc: Location, value: *mut T) -> Result<*mut T> {
        self.check("get_and_set_reference", &loc, ValueKind::Reference)?;
        Ok(unsafe { self.inner.get_and_set_reference(loc, value) })
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn get_address(&self, loc: Location, mode: OrderingMode) -> Result<usize> {
        self.check_address("get_address", &loc)?;
        Ok(unsafe { self.inner.get_address(loc, mode) })
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn put_address(&self, loc: Location, mode: OrderingMode, value: usize) -> Result<()> {
        self.check_address("put_address", &loc)?;
        unsafe { self.inner.put_address(loc, mode, value) };
        Ok(())
    }

    // === Buffers ===

    /// Allocate and track a buffer
    pub fn allocate(&self, bytes: i64) -> Result<usize> {
        let address = self.inner.allocate(bytes)?;
        self.book.lock().track(address, bytes.max(1) as usize);
        Ok(address)
    }

    /// Resize a tracked buffer; 0 allocates
    pub fn resize(&self, address: usize, bytes: i64) -> Result<usize> {
        if address != 0 {
            self.expect_live("resize", address)?;
        }
        // SAFETY: address is 0 or a live buffer handed out by this wrapper
        let new_address = unsafe { self.inner.resize(address, bytes) }?;

        let mut book = self.book.lock();
        if let Some(size) = book.live.remove(&address) {
            if new_address != address {
                book.freed.insert(address, size);
            }
        }
        book.track(new_address, bytes.max(1) as usize);
        Ok(new_address)
    }

    /// Free a tracked buffer; 0 is a no-op
    ///
    /// # Errors
    ///
    /// `ContractViolation` for a second free, or for an address this wrapper
    /// never allocated.
    pub fn free(&self, address: usize) -> Result<()> {
        if address == 0 {
            return Ok(());
        }
        self.expect_live("free", address)?;

        let mut book = self.book.lock();
        if let Some(size) = book.live.remove(&address) {
            book.freed.insert(address, size);
        }
        drop(book);

        // SAFETY: address was live in this wrapper and is now retired
        unsafe { self.inner.free(address) };
        Ok(())
    }

    fn expect_live(&self, operation: &str, address: usize) -> Result<()> {
        let book = self.book.lock();
        if book.live.contains_key(&address) {
            return Ok(());
        }
        let detail = if book.freed.contains_key(&address) {
            format!("{:#x} was already freed", address)
        } else {
            format!("{:#x} was not allocated by this accessor", address)
        };
        Err(OrdoError::contract(operation, detail))
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn fill(&self, dst: Location, length: usize, value: u8) -> Result<()> {
        self.check_span("fill", &dst, length)?;
        unsafe { self.inner.fill(dst, length, value) };
        Ok(())
    }

    /// # Safety
    ///
    /// Memory this wrapper does not track must still be live and mapped.
    pub unsafe fn copy(&self, src: Location, dst: Location, length: usize) -> Result<()> {
        self.check_span("copy", &src, length)?;
        self.check_span("copy", &dst, length)?;
        unsafe { self.inner.copy(src, dst, length) };
        Ok(())
    }
}
